//! Small helpers for building parameterised list queries.

use rusqlite::types::Value;

use crate::{DbError, DbResult};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

/// Conjunction of `WHERE` clauses with `?` placeholders, in bind order.
#[derive(Debug, Default)]
pub struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.clauses.push(format!("{column} = ?"));
        self.params.push(value.into());
        self
    }

    /// `value` if present, otherwise nothing.
    pub fn eq_opt<V: Into<Value>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.eq(column, value);
        }
        self
    }

    /// Raw clause; `params` must match its placeholders.
    pub fn clause(&mut self, sql: impl Into<String>, params: Vec<Value>) -> &mut Self {
        self.clauses.push(sql.into());
        self.params.extend(params);
        self
    }

    /// Case-insensitive substring match over any of `columns`.
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let pattern = like_pattern(term);
        let ors: Vec<String> = columns
            .iter()
            .map(|c| format!("{c} LIKE ? ESCAPE '\\'"))
            .collect();
        let params = columns.iter().map(|_| Value::Text(pattern.clone())).collect();
        self.clause(format!("({})", ors.join(" OR ")), params)
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Translate a `field` / `-field` ordering parameter into an `ORDER BY`
/// clause. `allowed` maps public field names to columns.
pub fn order_by(
    requested: Option<&str>,
    allowed: &[(&str, &str)],
    default: &str,
    tiebreak: &str,
) -> DbResult<String> {
    let requested = requested.map(str::trim).filter(|r| !r.is_empty()).unwrap_or(default);
    let (field, direction) = match requested.strip_prefix('-') {
        Some(field) => (field, "DESC"),
        None => (requested, "ASC"),
    };
    let column = allowed
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, column)| *column)
        .ok_or_else(|| DbError::InvalidArgument(format!("cannot order by '{field}'")))?;
    Ok(format!(" ORDER BY {column} {direction}, {tiebreak} {direction}"))
}

/// Limit/offset window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    pub fn sql(&self) -> String {
        format!(" LIMIT {} OFFSET {}", self.limit, self.offset)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
