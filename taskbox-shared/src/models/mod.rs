//! Database models
//!
//! One module per table, each pairing a `sqlx::FromRow` struct with its
//! query methods:
//!
//! - `user`: accounts, credentials, refresh-token generation tracking
//! - `task`: tasks with status/priority/due date, search, and statistics
//! - `category`: per-user task categories
//! - `tag`: per-user labels, attached to tasks via `task_tags`

pub mod category;
pub mod tag;
pub mod task;
pub mod user;

/// Sort direction for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parses a query-string value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    /// SQL keyword for the ORDER BY clause
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("asc"), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse("desc"), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse("ASC"), None);
        assert_eq!(SortOrder::parse("sideways"), None);
    }

    #[test]
    fn test_sort_order_sql() {
        assert_eq!(SortOrder::Asc.as_sql(), "ASC");
        assert_eq!(SortOrder::Desc.as_sql(), "DESC");
    }
}
