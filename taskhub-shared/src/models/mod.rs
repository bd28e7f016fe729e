/// Database models
///
/// Each model owns its table: the row struct, its input structs, and the
/// sqlx queries that touch it. Handlers never write SQL themselves.

pub mod session;
pub mod todo;
pub mod user;

use serde::{Deserialize, Serialize};

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parses the wire value (`asc` / `desc`), case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub(crate) fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One page of a filtered listing, with the filter-wide row count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("asc"), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse("DESC"), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse("descending"), None);
        assert_eq!(SortOrder::parse(""), None);
    }

    #[test]
    fn test_sort_order_default_is_ascending() {
        assert_eq!(SortOrder::default(), SortOrder::Asc);
    }
}
