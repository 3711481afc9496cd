/// The agent's own accounts
use crate::{
    crm::{self, account},
    error::{PortalError, PortalResult, RemoteError},
    record_store::{Direction, Filter, QueryResult, QuerySpec, Record, RecordStore},
};
use serde::Deserialize;
use std::sync::Arc;

/// Worklist search parameters from the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorklistQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl WorklistQuery {
    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Query for accounts created by `user_id`, narrowed by the optional filters
///
/// Absent filters add no clause at all. Name matching case sensitivity is
/// up to the record store.
pub fn build_filter(user_id: &str, keyword: Option<&str>, status: Option<&str>) -> QuerySpec {
    let mut spec = QuerySpec::select(account::OBJECT, account::WORKLIST_FIELDS)
        .filter(Filter::eq(account::CREATED_BY_AGENT, user_id));

    if let Some(keyword) = keyword {
        spec = spec.filter(Filter::contains(account::NAME, keyword));
    }
    if let Some(status) = status {
        spec = spec.filter(Filter::eq(account::STATUS, status));
    }

    spec.order_by(account::CREATED_DATE, Direction::Desc)
}

/// Worklist queries
pub struct Worklist {
    store: Arc<dyn RecordStore>,
    limit: u32,
}

impl Worklist {
    pub fn new(store: Arc<dyn RecordStore>, limit: u32) -> Self {
        Self { store, limit }
    }

    /// Accounts created by `user_id` matching `query`, newest first
    pub async fn list(&self, user_id: &str, query: &WorklistQuery) -> Result<QueryResult, RemoteError> {
        let spec = build_filter(user_id, query.keyword(), query.status()).limit(self.limit);
        self.store.query(&spec).await
    }

    /// One account, provided `user_id` created it
    pub async fn fetch_owned(&self, user_id: &str, account_id: &str) -> PortalResult<Record> {
        if !crm::is_record_id(account_id) {
            return Err(PortalError::NotFound(format!("Account {}", account_id)));
        }

        let spec = QuerySpec::select(account::OBJECT, account::WORKLIST_FIELDS)
            .filter(Filter::eq(account::ID, account_id))
            .filter(Filter::eq(account::CREATED_BY_AGENT, user_id))
            .limit(1);

        self.store
            .query(&spec)
            .await?
            .records
            .into_iter()
            .next()
            .ok_or_else(|| PortalError::NotFound(format!("Account {}", account_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_store::{field_str, soql, MemoryStore};
    use serde_json::json;

    #[test]
    fn test_keyword_only_filter() {
        let spec = build_filter("a00ME", Some("Tanaka"), None);
        assert_eq!(
            spec.filters,
            vec![
                Filter::eq("Field71__c", "a00ME"),
                Filter::contains("Name", "Tanaka"),
            ]
        );
        assert!(!soql::render(&spec).unwrap().contains("Status__c ="));
    }

    #[test]
    fn test_no_optional_filters() {
        let spec = build_filter("a00ME", None, None);
        assert_eq!(spec.filters, vec![Filter::eq("Field71__c", "a00ME")]);
    }

    #[test]
    fn test_all_filters_and_together() {
        let spec = build_filter("a00ME", Some("Tanaka"), Some("Contacted"));
        assert_eq!(spec.filters.len(), 3);
        let rendered = soql::render(&spec).unwrap();
        assert!(rendered.contains(
            "WHERE Field71__c = 'a00ME' AND Name LIKE '%Tanaka%' AND Status__c = 'Contacted'"
        ));
    }

    #[test]
    fn test_blank_query_params_are_absent() {
        let query = WorklistQuery {
            keyword: Some("  ".to_string()),
            status: Some(String::new()),
        };
        assert_eq!(query.keyword(), None);
        assert_eq!(query.status(), None);
    }

    #[tokio::test]
    async fn test_fetch_owned_hides_other_agents_accounts() {
        let store = MemoryStore::new();
        let mine = store
            .insert(
                account::OBJECT,
                json!({"Name": "Mine", "Field71__c": "a00ME"}).as_object().cloned().unwrap(),
            )
            .await;
        let theirs = store
            .insert(
                account::OBJECT,
                json!({"Name": "Theirs", "Field71__c": "a00OTHER"}).as_object().cloned().unwrap(),
            )
            .await;
        let worklist = Worklist::new(Arc::new(store.clone()), 200);

        let record = worklist.fetch_owned("a00ME", &mine).await.unwrap();
        assert_eq!(field_str(&record, "Name"), Some("Mine"));

        assert!(matches!(
            worklist.fetch_owned("a00ME", &theirs).await,
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            worklist.fetch_owned("a00ME", "../etc").await,
            Err(PortalError::NotFound(_))
        ));
    }
}
