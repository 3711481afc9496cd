/// SOQL rendering for structured queries
///
/// Field and object names come from code, never from users. Every value is
/// emitted as an escaped string literal, so user text can't end the literal
/// or inject clauses.
use super::models::{Direction, Filter, QuerySpec};
use crate::error::{PortalError, PortalResult};

/// Render a query spec as SOQL text
pub fn render(spec: &QuerySpec) -> PortalResult<String> {
    validate_identifier(&spec.object)?;
    if spec.fields.is_empty() {
        return Err(PortalError::Internal(format!(
            "Query on {} selects no fields",
            spec.object
        )));
    }
    for field in &spec.fields {
        validate_identifier(field)?;
    }

    let mut soql = format!("SELECT {} FROM {}", spec.fields.join(", "), spec.object);

    if !spec.filters.is_empty() {
        let clauses = spec
            .filters
            .iter()
            .map(|f| render_filter(f, spec.filters.len() > 1))
            .collect::<PortalResult<Vec<_>>>()?;
        soql.push_str(" WHERE ");
        soql.push_str(&clauses.join(" AND "));
    }

    if !spec.order_by.is_empty() {
        let keys = spec
            .order_by
            .iter()
            .map(|o| {
                validate_identifier(&o.field)?;
                Ok(match o.direction {
                    Direction::Asc => format!("{} ASC", o.field),
                    Direction::Desc => format!("{} DESC", o.field),
                })
            })
            .collect::<PortalResult<Vec<_>>>()?;
        soql.push_str(" ORDER BY ");
        soql.push_str(&keys.join(", "));
    }

    if let Some(limit) = spec.limit {
        soql.push_str(&format!(" LIMIT {}", limit));
    }

    Ok(soql)
}

fn render_filter(filter: &Filter, nested: bool) -> PortalResult<String> {
    match filter {
        Filter::Eq { field, value } => {
            validate_identifier(field)?;
            Ok(format!("{} = '{}'", field, escape_literal(value)))
        }
        Filter::Contains { field, value } => {
            validate_identifier(field)?;
            Ok(format!("{} LIKE '%{}%'", field, escape_like(value)))
        }
        Filter::Includes { field, value } => {
            validate_identifier(field)?;
            // `;` inside an INCLUDES literal means "all of these options"
            if value.contains(';') {
                return Err(PortalError::Internal(format!(
                    "Multi-select option may not contain ';': {:?}",
                    value
                )));
            }
            Ok(format!("{} INCLUDES ('{}')", field, escape_literal(value)))
        }
        Filter::Or(filters) => {
            let parts = filters
                .iter()
                .map(|f| render_filter(f, true))
                .collect::<PortalResult<Vec<_>>>()?;
            let joined = parts.join(" OR ");
            if nested || parts.len() > 1 {
                Ok(format!("({})", joined))
            } else {
                Ok(joined)
            }
        }
    }
}

/// Escape text for use inside a single-quoted SOQL literal
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            other => out.push(other),
        }
    }
    out
}

/// Escape text for a LIKE pattern, where `%` and `_` are wildcards
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in escape_literal(value).chars() {
        match c {
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            other => out.push(other),
        }
    }
    out
}

fn validate_identifier(name: &str) -> PortalResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(PortalError::Internal(format!(
            "Invalid SOQL identifier: {:?}",
            name
        )))
    }
}
