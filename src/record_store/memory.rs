/// In-memory record store backend
///
/// Evaluates query specs against records held in process. Seedable from a
/// JSON file for local development; records every call and supports
/// injected failures so workflows can be exercised without a CRM.
use crate::{
    error::{PortalError, PortalResult, RemoteError},
    record_store::{
        models::{field_str, Direction, Filter, ObjectSchema, QueryResult, QuerySpec, Record},
        RecordStore,
    },
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::{cmp::Ordering, collections::HashMap, path::Path, sync::Arc};
use tokio::sync::Mutex;

/// Kind of store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Query,
    Describe,
    Create,
    Update,
}

/// One call observed by the store, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Query { object: String },
    Describe { object: String },
    Create { object: String, fields: Record },
    Update { object: String, id: String, fields: Record },
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::Query { .. } => StoreOp::Query,
            StoreCall::Describe { .. } => StoreOp::Describe,
            StoreCall::Create { .. } => StoreOp::Create,
            StoreCall::Update { .. } => StoreOp::Update,
        }
    }
}

/// Seed file layout: `{"records": {object: [...]}, "schemas": {object: {...}}}`
#[derive(Debug, Default, Deserialize)]
struct Seed {
    #[serde(default)]
    records: HashMap<String, Vec<Record>>,
    #[serde(default)]
    schemas: HashMap<String, ObjectSchema>,
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<String, Vec<Record>>,
    schemas: HashMap<String, ObjectSchema>,
    calls: Vec<StoreCall>,
    failures: HashMap<(StoreOp, String), String>,
    next_id: u64,
}

/// In-memory record store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records and schemas from a JSON seed file
    pub async fn from_seed_file(path: &Path) -> PortalResult<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: Seed = serde_json::from_str(&raw).map_err(|e| {
            PortalError::Config(format!("Invalid seed file {:?}: {}", path, e))
        })?;

        let store = Self::new();
        {
            let mut state = store.state.lock().await;
            for (object, records) in seed.records {
                for record in records {
                    state.insert(&object, record);
                }
            }
            state.schemas = seed.schemas;
        }
        Ok(store)
    }

    /// Insert a record directly, bypassing the call log
    pub async fn insert(&self, object: &str, record: Record) -> String {
        self.state.lock().await.insert(object, record)
    }

    /// Register the describe result for an object
    pub async fn set_schema(&self, schema: ObjectSchema) {
        let mut state = self.state.lock().await;
        state.schemas.insert(schema.name.clone(), schema);
    }

    /// Make every `op` on `object` fail with `message` until cleared
    pub async fn fail_on(&self, op: StoreOp, object: &str, message: &str) {
        let mut state = self.state.lock().await;
        state
            .failures
            .insert((op, object.to_string()), message.to_string());
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Calls received so far
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    /// Calls of one kind received so far
    pub async fn calls_of(&self, op: StoreOp) -> Vec<StoreCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| c.op() == op)
            .collect()
    }

    /// Snapshot of a stored record
    pub async fn get(&self, object: &str, id: &str) -> Option<Record> {
        let state = self.state.lock().await;
        state
            .records
            .get(object)
            .and_then(|records| records.iter().find(|r| field_str(r, "Id") == Some(id)))
            .cloned()
    }
}

impl MemoryState {
    fn insert(&mut self, object: &str, mut record: Record) -> String {
        let id = match field_str(&record, "Id") {
            Some(id) => id.to_string(),
            None => {
                self.next_id += 1;
                let id = format!("{}{:015}", id_prefix(object), self.next_id);
                record.insert("Id".to_string(), Value::String(id.clone()));
                id
            }
        };
        record.entry("CreatedDate".to_string()).or_insert_with(|| {
            Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        });
        self.records.entry(object.to_string()).or_default().push(record);
        id
    }

    fn check_failure(&self, op: StoreOp, object: &str) -> Result<(), RemoteError> {
        match self.failures.get(&(op, object.to_string())) {
            Some(message) => Err(RemoteError::new(message.clone())),
            None => Ok(()),
        }
    }
}

fn id_prefix(object: &str) -> &'static str {
    match object {
        "Account" => "001",
        "Task" => "00T",
        _ => "a00",
    }
}

fn matches(record: &Record, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { field, value } => field_str(record, field) == Some(value.as_str()),
        Filter::Contains { field, value } => field_str(record, field)
            .map(|actual| actual.to_lowercase().contains(&value.to_lowercase()))
            .unwrap_or(false),
        Filter::Includes { field, value } => field_str(record, field)
            .map(|actual| actual.split(';').any(|v| v.trim() == value))
            .unwrap_or(false),
        Filter::Or(filters) => filters.iter().any(|f| matches(record, f)),
    }
}

/// Reject filters the remote backend would refuse to render
fn check_filter(filter: &Filter) -> Result<(), RemoteError> {
    match filter {
        Filter::Includes { value, .. } if value.contains(';') => Err(RemoteError::new(format!(
            "Multi-select option may not contain ';': {:?}",
            value
        ))),
        Filter::Or(filters) => filters.iter().try_for_each(check_filter),
        _ => Ok(()),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryResult, RemoteError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Query {
            object: spec.object.clone(),
        });
        state.check_failure(StoreOp::Query, &spec.object)?;
        spec.filters.iter().try_for_each(check_filter)?;

        let mut hits: Vec<&Record> = state
            .records
            .get(&spec.object)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| spec.filters.iter().all(|f| matches(r, f)))
                    .collect()
            })
            .unwrap_or_default();

        hits.sort_by(|a, b| {
            for key in &spec.order_by {
                let ord = compare_values(a.get(&key.field), b.get(&key.field));
                let ord = match key.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        if let Some(limit) = spec.limit {
            hits.truncate(limit as usize);
        }

        let records: Vec<Record> = hits
            .into_iter()
            .map(|r| {
                spec.fields
                    .iter()
                    .map(|f| (f.clone(), r.get(f).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect();

        Ok(QueryResult {
            total_size: records.len() as u64,
            records,
        })
    }

    async fn describe(&self, object: &str) -> Result<ObjectSchema, RemoteError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Describe {
            object: object.to_string(),
        });
        state.check_failure(StoreOp::Describe, object)?;

        state.schemas.get(object).cloned().ok_or_else(|| {
            RemoteError::new(format!(
                "NOT_FOUND: The requested resource does not exist (sObject type '{}')",
                object
            ))
        })
    }

    async fn create(&self, object: &str, fields: &Record) -> Result<String, RemoteError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Create {
            object: object.to_string(),
            fields: fields.clone(),
        });
        state.check_failure(StoreOp::Create, object)?;

        let mut record = fields.clone();
        record.remove("Id");
        Ok(state.insert(object, record))
    }

    async fn update(&self, object: &str, id: &str, fields: &Record) -> Result<(), RemoteError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Update {
            object: object.to_string(),
            id: id.to_string(),
            fields: fields.clone(),
        });
        state.check_failure(StoreOp::Update, object)?;

        let record = state
            .records
            .get_mut(object)
            .and_then(|records| records.iter_mut().find(|r| field_str(r, "Id") == Some(id)))
            .ok_or_else(|| {
                RemoteError::new(format!(
                    "NOT_FOUND: Provided external ID field does not exist or is not accessible: {}",
                    id
                ))
            })?;

        for (key, value) in fields {
            if key != "Id" {
                record.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_query_applies_filters_and_projection() {
        let store = MemoryStore::new();
        store
            .insert("Account", record(json!({"Name": "Tanaka Shoten", "Field71__c": "u1"})))
            .await;
        store
            .insert("Account", record(json!({"Name": "Suzuki Denki", "Field71__c": "u1"})))
            .await;
        store
            .insert("Account", record(json!({"Name": "tanaka farm", "Field71__c": "u2"})))
            .await;

        let spec = QuerySpec::select("Account", &["Id", "Name"])
            .filter(Filter::eq("Field71__c", "u1"))
            .filter(Filter::contains("Name", "TANAKA"));
        let result = store.query(&spec).await.unwrap();

        assert_eq!(result.total_size, 1);
        assert_eq!(field_str(&result.records[0], "Name"), Some("Tanaka Shoten"));
        assert!(result.records[0].get("Field71__c").is_none());
    }

    #[tokio::test]
    async fn test_includes_matches_multiselect_values() {
        let store = MemoryStore::new();
        store
            .insert("CustomObject3__c", record(json!({"Name": "Fiber", "Field6__c": "Acme;Globex"})))
            .await;
        store
            .insert("CustomObject3__c", record(json!({"Name": "Mobile", "Field6__c": "Globex"})))
            .await;

        let spec = QuerySpec::select("CustomObject3__c", &["Name"])
            .filter(Filter::includes("Field6__c", "Acme"));
        let result = store.query(&spec).await.unwrap();

        assert_eq!(result.total_size, 1);
        assert_eq!(field_str(&result.records[0], "Name"), Some("Fiber"));

        let spec = QuerySpec::select("CustomObject3__c", &["Name"])
            .filter(Filter::includes("Field6__c", "Acme;Globex"));
        assert!(store.query(&spec).await.is_err());
    }

    #[tokio::test]
    async fn test_create_then_update_merges_fields() {
        let store = MemoryStore::new();
        let id = store
            .create("Account", &record(json!({"Name": "Acme", "Status__c": "New"})))
            .await
            .unwrap();
        assert!(id.starts_with("001"));

        store
            .update("Account", &id, &record(json!({"Status__c": "Contacted"})))
            .await
            .unwrap();

        let stored = store.get("Account", &id).await.unwrap();
        assert_eq!(field_str(&stored, "Name"), Some("Acme"));
        assert_eq!(field_str(&stored, "Status__c"), Some("Contacted"));
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails() {
        let store = MemoryStore::new();
        let err = store
            .update("Account", "001missing", &Record::new())
            .await
            .unwrap_err();
        assert!(err.message.starts_with("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded_and_returned() {
        let store = MemoryStore::new();
        store
            .fail_on(StoreOp::Create, "Task", "FIELD_CUSTOM_VALIDATION_EXCEPTION: nope")
            .await;

        let err = store.create("Task", &Record::new()).await.unwrap_err();
        assert_eq!(err.message, "FIELD_CUSTOM_VALIDATION_EXCEPTION: nope");
        assert_eq!(store.calls_of(StoreOp::Create).await.len(), 1);

        store.clear_failures().await;
        assert!(store.create("Task", &Record::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_seed_file_loads_records_and_schemas() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({
                "records": {
                    "CustomObject1__c": [{"Id": "a00U1", "Name": "agent", "Field8__c": "pw"}]
                },
                "schemas": {
                    "Account": {"name": "Account", "fields": []}
                }
            })
        )
        .unwrap();

        let store = MemoryStore::from_seed_file(file.path()).await.unwrap();
        assert!(store.get("CustomObject1__c", "a00U1").await.is_some());
        assert!(store.describe("Account").await.is_ok());
        assert!(store.describe("Contact").await.is_err());
    }

    #[tokio::test]
    async fn test_order_and_limit() {
        let store = MemoryStore::new();
        for (name, created) in [("a", "2024-01-01"), ("b", "2024-03-01"), ("c", "2024-02-01")] {
            store
                .insert("Account", record(json!({"Name": name, "CreatedDate": created})))
                .await;
        }

        let spec = QuerySpec::select("Account", &["Name"])
            .order_by("CreatedDate", Direction::Desc)
            .limit(2);
        let result = store.query(&spec).await.unwrap();
        let names: Vec<_> = result
            .records
            .iter()
            .map(|r| field_str(r, "Name").unwrap())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
