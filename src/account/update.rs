/// Account status update with call logging
use crate::{
    config::ActivityConfig,
    crm::{account, task},
    error::{RemoteError, ValidationFailure},
    record_store::{Record, RecordStore},
};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Submitted update form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdateForm {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Time of day as `HH:MM`
    #[serde(default)]
    pub call_time: Option<String>,
    #[serde(default)]
    pub call_result: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn text_or_null(value: &Option<String>) -> Value {
    non_blank(value).map_or(Value::Null, |v| Value::String(v.to_string()))
}

/// Parse an `HH:MM` time of day with seconds zeroed; blank means midnight
///
/// `HH:MM:SS` is also accepted, since some browsers submit seconds.
pub fn normalize_time(input: Option<&str>) -> Result<NaiveTime, ValidationFailure> {
    let Some(raw) = input.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(NaiveTime::MIN);
    };

    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .ok_or(ValidationFailure::InvalidTime)
}

/// Canonical `HH:MM:SS` form sent to the record store
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Result of an update submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Account updated and call logged
    Completed { task_id: String },
    /// Account update failed; nothing was logged
    AccountNotUpdated(RemoteError),
    /// Account updated but the call log entry could not be created
    ActivityNotLogged(RemoteError),
}

/// Update workflow
pub struct UpdateWorkflow {
    store: Arc<dyn RecordStore>,
    activity: ActivityConfig,
}

impl UpdateWorkflow {
    pub fn new(store: Arc<dyn RecordStore>, activity: ActivityConfig) -> Self {
        Self { store, activity }
    }

    /// Update the account, then log the call against it
    ///
    /// The log entry is created only after the update succeeds. Neither
    /// step is retried and a failed log does not undo the update.
    pub async fn submit(
        &self,
        account_id: &str,
        form: &AccountUpdateForm,
        today: NaiveDate,
    ) -> Result<UpdateOutcome, ValidationFailure> {
        let call_time = normalize_time(form.call_time.as_deref())?;

        let mut changes = Record::new();
        changes.insert(account::STATUS.to_string(), text_or_null(&form.status));
        changes.insert(account::NOTE.to_string(), text_or_null(&form.note));
        changes.insert(
            account::CALL_TIME.to_string(),
            Value::String(format_time(call_time)),
        );

        if let Err(e) = self
            .store
            .update(account::OBJECT, account_id, &changes)
            .await
        {
            tracing::warn!("Update of account {} failed: {}", account_id, e);
            return Ok(UpdateOutcome::AccountNotUpdated(e));
        }

        let log = self.activity_record(account_id, form, today);
        match self.store.create(task::OBJECT, &log).await {
            Ok(task_id) => {
                tracing::info!("Account {} updated, call logged as {}", account_id, task_id);
                Ok(UpdateOutcome::Completed { task_id })
            }
            Err(e) => {
                tracing::error!(
                    "Account {} updated but call log failed: {}",
                    account_id,
                    e
                );
                Ok(UpdateOutcome::ActivityNotLogged(e))
            }
        }
    }

    fn activity_record(&self, account_id: &str, form: &AccountUpdateForm, today: NaiveDate) -> Record {
        let mut log = Record::new();
        log.insert(
            task::SUBJECT.to_string(),
            Value::String(self.activity.subject.clone()),
        );
        if let Some(owner) = &self.activity.owner_id {
            log.insert(task::OWNER_ID.to_string(), Value::String(owner.clone()));
        }
        log.insert(
            task::ACTIVITY_DATE.to_string(),
            Value::String(today.format("%Y-%m-%d").to_string()),
        );
        log.insert(
            task::RELATED_TO.to_string(),
            Value::String(account_id.to_string()),
        );
        log.insert(
            task::STATUS.to_string(),
            Value::String(task::STATUS_COMPLETED.to_string()),
        );
        log.insert(
            task::SUBTYPE.to_string(),
            Value::String(task::SUBTYPE_CALL.to_string()),
        );
        log.insert(
            task::TYPE.to_string(),
            Value::String(self.activity.task_type.clone()),
        );
        log.insert(task::CALL_RESULT.to_string(), text_or_null(&form.call_result));
        log.insert(task::DESCRIPTION.to_string(), text_or_null(&form.description));
        log
    }
}
