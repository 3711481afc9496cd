/// Record store data models
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A flat CRM record: field API name to value
pub type Record = serde_json::Map<String, Value>;

/// Read a field as a string, treating null and missing alike
pub fn field_str<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// Typed filter predicate
///
/// Values are kept apart from field names so that backends render or
/// evaluate them as literals and never as query syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// `field = value`
    Eq { field: String, value: String },
    /// `field` contains `value` as a substring
    Contains { field: String, value: String },
    /// Multi-select picklist `field` includes the single option `value`
    Includes { field: String, value: String },
    /// Any of the nested filters holds
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: &str) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn contains(field: &str, value: &str) -> Self {
        Filter::Contains {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn includes(field: &str, value: &str) -> Self {
        Filter::Includes {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Structured query over one object type
///
/// Top-level `filters` are combined with AND; an empty list selects every
/// record of the object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub object: String,
    pub fields: Vec<String>,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u32>,
}

impl QuerySpec {
    /// Start a query selecting `fields` from `object`
    pub fn select(object: &str, fields: &[&str]) -> Self {
        Self {
            object: object.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Add an AND-ed predicate
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Query result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub total_size: u64,
    pub records: Vec<Record>,
}

/// Picklist entry from a describe call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicklistValue {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Field metadata from a describe call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub picklist_values: Vec<PicklistValue>,
}

/// Object metadata from a describe call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSchema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl ObjectSchema {
    /// Currently selectable values of a picklist field, in declared order
    pub fn active_picklist_values(&self, field: &str) -> Vec<String> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| {
                f.picklist_values
                    .iter()
                    .filter(|p| p.active)
                    .map(|p| p.value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
