/// New account intake
use crate::{
    crm::account,
    error::{RemoteError, ValidationFailure},
    record_store::{Record, RecordStore},
    session::Session,
};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;

/// Submitted intake form, as posted by the browser
#[derive(Debug, Clone, Default)]
pub struct AccountIntakeForm {
    fields: HashMap<String, String>,
}

impl AccountIntakeForm {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    /// Trimmed value of a field, `None` when missing or blank
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Required fields left blank, in declaration order
    pub fn missing_required(&self) -> Vec<&'static str> {
        account::REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| self.get(f).is_none())
            .collect()
    }

    /// Build the record to create
    ///
    /// Only known intake fields are copied; owner, creator and company
    /// always come from the session.
    pub fn to_record(&self, session: &Session) -> Record {
        let mut record = Record::new();
        for field in account::INTAKE_FIELDS {
            if let Some(value) = self.get(field) {
                record.insert(field.to_string(), Value::String(value.to_string()));
            }
        }

        let owner = session
            .owner_reference
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty());
        record.insert(
            account::OWNER_ID.to_string(),
            owner.map_or(Value::Null, |o| Value::String(o.to_string())),
        );
        record.insert(
            account::CREATED_BY_AGENT.to_string(),
            Value::String(session.user_id.clone()),
        );
        record.insert(
            account::COMPANY.to_string(),
            Value::String(session.company_name.clone()),
        );
        record
    }
}

/// Why an intake submission produced no account
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreationFailure {
    #[error("No record owner is configured for your login")]
    OwnerNotConfigured,

    #[error("Account creation failed: {0}")]
    Remote(RemoteError),
}

/// Outcome shown on the result view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationResult {
    pub record_name: String,
    pub outcome: Result<String, CreationFailure>,
}

impl CreationResult {
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn message(&self) -> String {
        match &self.outcome {
            Ok(id) => format!("Account created. ID: {}", id),
            Err(failure) => failure.to_string(),
        }
    }
}

/// Intake workflow
pub struct IntakeWorkflow {
    store: Arc<dyn RecordStore>,
}

impl IntakeWorkflow {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Validate the form and create the account
    ///
    /// Missing required fields are an `Err` (the form is shown again);
    /// everything after validation is reported through `CreationResult`.
    /// The create call is made at most once.
    pub async fn submit(
        &self,
        form: &AccountIntakeForm,
        session: &Session,
    ) -> Result<CreationResult, ValidationFailure> {
        let record = form.to_record(session);

        let missing = form.missing_required();
        if !missing.is_empty() {
            tracing::info!(
                "Intake from agent {} rejected, missing {:?}",
                session.user_id,
                missing
            );
            return Err(ValidationFailure::MissingRequiredFields);
        }

        let record_name = form.get(account::NAME).unwrap_or_default().to_string();

        if record.get(account::OWNER_ID).map_or(true, Value::is_null) {
            tracing::warn!("Agent {} has no record owner configured", session.user_id);
            return Ok(CreationResult {
                record_name,
                outcome: Err(CreationFailure::OwnerNotConfigured),
            });
        }

        let outcome = match self.store.create(account::OBJECT, &record).await {
            Ok(id) => {
                tracing::info!("Agent {} created account {}", session.user_id, id);
                Ok(id)
            }
            Err(e) => {
                tracing::warn!("Account create for agent {} failed: {}", session.user_id, e);
                Err(CreationFailure::Remote(e))
            }
        };

        Ok(CreationResult {
            record_name,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_store::{field_str, memory::StoreOp, MemoryStore};
    use chrono::{FixedOffset, TimeZone};

    fn session(owner: Option<&str>) -> Session {
        Session {
            user_id: "a00000000000000001".to_string(),
            display_name: "sato".to_string(),
            external_login_id: Some("P-100".to_string()),
            company_name: "Acme".to_string(),
            owner_reference: owner.map(str::to_string),
            last_activity: FixedOffset::east_opt(9 * 3600)
                .unwrap()
                .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
                .unwrap(),
        }
    }

    fn form(pairs: &[(&str, &str)]) -> AccountIntakeForm {
        AccountIntakeForm::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn complete_form() -> AccountIntakeForm {
        form(&[
            ("Name", "Tanaka Shoten"),
            ("Field72__c", "Referral"),
            ("Field70__c", "Fiber"),
            ("ShippingCity", "Osaka"),
            ("Field35__c", ""),
        ])
    }

    #[tokio::test]
    async fn test_missing_referral_type_makes_no_calls() {
        let store = MemoryStore::new();
        let workflow = IntakeWorkflow::new(Arc::new(store.clone()));

        let result = workflow
            .submit(
                &form(&[("Name", "Tanaka Shoten"), ("Field70__c", "Fiber")]),
                &session(Some("005OWNER")),
            )
            .await;

        assert_eq!(result, Err(ValidationFailure::MissingRequiredFields));
        assert!(store.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_counts_as_missing() {
        let store = MemoryStore::new();
        let workflow = IntakeWorkflow::new(Arc::new(store.clone()));

        let result = workflow
            .submit(
                &form(&[("Name", "   "), ("Field72__c", "Referral"), ("Field70__c", "Fiber")]),
                &session(Some("005OWNER")),
            )
            .await;

        assert_eq!(result, Err(ValidationFailure::MissingRequiredFields));
        assert!(store.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_owner_not_configured_skips_create() {
        let store = MemoryStore::new();
        let workflow = IntakeWorkflow::new(Arc::new(store.clone()));

        for owner in [None, Some(""), Some("  ")] {
            let result = workflow
                .submit(&complete_form(), &session(owner))
                .await
                .unwrap();
            assert!(!result.success());
            assert_eq!(result.outcome, Err(CreationFailure::OwnerNotConfigured));
            assert_eq!(result.record_name, "Tanaka Shoten");
        }
        assert!(store.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_successful_create_carries_system_fields() {
        let store = MemoryStore::new();
        let workflow = IntakeWorkflow::new(Arc::new(store.clone()));

        let mut tampered = complete_form();
        tampered
            .fields
            .insert("OwnerId".to_string(), "005ATTACKER".to_string());
        tampered
            .fields
            .insert("Field75__c".to_string(), "Other Co".to_string());

        let result = workflow
            .submit(&tampered, &session(Some("005OWNER")))
            .await
            .unwrap();
        let id = result.outcome.clone().unwrap();
        assert!(result.message().contains(&id));

        let stored = store.get(account::OBJECT, &id).await.unwrap();
        assert_eq!(field_str(&stored, "OwnerId"), Some("005OWNER"));
        assert_eq!(field_str(&stored, "Field71__c"), Some("a00000000000000001"));
        assert_eq!(field_str(&stored, "Field75__c"), Some("Acme"));
        assert_eq!(field_str(&stored, "ShippingCity"), Some("Osaka"));
        // Blank optional fields are left out entirely
        assert!(stored.get("Field35__c").is_none());
    }

    #[tokio::test]
    async fn test_remote_error_is_surfaced_verbatim() {
        let store = MemoryStore::new();
        store
            .fail_on(
                StoreOp::Create,
                account::OBJECT,
                "DUPLICATES_DETECTED: Use one of these records?",
            )
            .await;
        let workflow = IntakeWorkflow::new(Arc::new(store.clone()));

        let result = workflow
            .submit(&complete_form(), &session(Some("005OWNER")))
            .await
            .unwrap();

        assert!(!result.success());
        assert!(result
            .message()
            .ends_with("DUPLICATES_DETECTED: Use one of these records?"));
        // One attempt, no retry
        assert_eq!(store.calls_of(StoreOp::Create).await.len(), 1);
    }
}
