//! Typed query builder for note scans
//!
//! Predicates are built from fields, operators and values and compiled to
//! parameterised SQL. User text is always bound as a parameter, never spliced
//! into the statement.
//!
//! ```ignore
//! let query = Query::new()
//!     .filter(Predicate::text_search("crème"))
//!     .order(SortOrder::Ascending)
//!     .limit(50);
//! let notes = store.scan(&query)?;
//! ```

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::storage::schema::{encode_timestamp, FOLD_FUNCTION};

/// Fold text for case- and diacritic-insensitive comparison
///
/// Decomposes to NFD, drops combining marks and lowercases.
pub fn fold_text(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Sort direction for `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    /// Newest first
    #[default]
    Descending,
}

impl SortOrder {
    /// Flip the direction (the list toolbar toggle)
    pub fn toggle(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Text columns a predicate can address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Id,
    Title,
    Content,
}

impl TextField {
    fn column(self) -> &'static str {
        match self {
            TextField::Id => "id",
            TextField::Title => "title",
            TextField::Content => "content",
        }
    }
}

/// A filter over stored notes
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Predicate {
    /// Matches every note
    #[default]
    All,
    /// Case/diacritic-insensitive substring match
    Contains(TextField, String),
    /// Exact match
    Equals(TextField, String),
    /// Exact match against any of the values
    In(TextField, Vec<String>),
    /// `created_at` strictly before the instant
    CreatedBefore(DateTime<Utc>),
    /// `created_at` strictly after the instant
    CreatedAfter(DateTime<Utc>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Substring search over title OR content
    ///
    /// The needle is trimmed; an empty needle matches everything.
    pub fn text_search(needle: &str) -> Self {
        let needle = needle.trim();
        if needle.is_empty() {
            return Predicate::All;
        }
        Predicate::Or(vec![
            Predicate::Contains(TextField::Title, needle.to_string()),
            Predicate::Contains(TextField::Content, needle.to_string()),
        ])
    }

    /// Match by note id
    pub fn id(id: impl Into<String>) -> Self {
        Predicate::Equals(TextField::Id, id.into())
    }

    /// Combine with another predicate using AND
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut parts), p) => {
                parts.push(p);
                Predicate::And(parts)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    fn compile(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Predicate::All => sql.push('1'),
            Predicate::Contains(field, needle) => {
                sql.push_str(&format!(
                    "instr({}({}), ?) > 0",
                    FOLD_FUNCTION,
                    field.column()
                ));
                params.push(Value::Text(fold_text(needle)));
            }
            Predicate::Equals(field, value) => {
                sql.push_str(field.column());
                sql.push_str(" = ?");
                params.push(Value::Text(value.clone()));
            }
            Predicate::In(field, values) => {
                if values.is_empty() {
                    sql.push('0');
                    return;
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!("{} IN ({})", field.column(), placeholders));
                params.extend(values.iter().cloned().map(Value::Text));
            }
            Predicate::CreatedBefore(at) => {
                sql.push_str("created_at < ?");
                params.push(Value::Integer(bound_timestamp(at)));
            }
            Predicate::CreatedAfter(at) => {
                sql.push_str("created_at > ?");
                params.push(Value::Integer(bound_timestamp(at)));
            }
            Predicate::And(parts) => compile_group(parts, " AND ", '1', sql, params),
            Predicate::Or(parts) => compile_group(parts, " OR ", '0', sql, params),
        }
    }
}

/// Stored form of a comparison bound, saturating outside the storable range
fn bound_timestamp(at: &DateTime<Utc>) -> i64 {
    encode_timestamp(at).unwrap_or(if at.timestamp() < 0 { i64::MIN } else { i64::MAX })
}

fn compile_group(
    parts: &[Predicate],
    joiner: &str,
    empty: char,
    sql: &mut String,
    params: &mut Vec<Value>,
) {
    if parts.is_empty() {
        sql.push(empty);
        return;
    }
    sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push_str(joiner);
        }
        part.compile(sql, params);
    }
    sql.push(')');
}

/// A predicate, sort order and optional limit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub predicate: Predicate,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl Query {
    /// Match everything, newest first, no limit
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compile to a SELECT over complete rows
    ///
    /// Incomplete rows are excluded in SQL so they never occupy a LIMIT slot.
    /// Ties on `created_at` are broken by `id` in the same direction.
    pub(crate) fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::from(
            "SELECT id, title, content, created_at FROM notes \
             WHERE title IS NOT NULL AND content IS NOT NULL AND created_at IS NOT NULL AND ",
        );
        let mut params = Vec::new();
        self.predicate.compile(&mut sql, &mut params);

        let dir = self.order.sql();
        sql.push_str(&format!(" ORDER BY created_at {dir}, id {dir}"));

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        (sql, params)
    }
}
