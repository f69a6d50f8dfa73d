use thiserror::Error;

/// Tables a generated query may read from.
pub const RECOGNIZED_TABLES: [&str; 5] =
    ["orders", "products", "inventory", "customers", "line_items"];

/// Keywords that would mutate store data.
pub const MUTATING_KEYWORDS: [&str; 5] = ["drop", "delete", "update", "insert", "alter"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryRejection {
    #[error("query has no FROM clause")]
    MissingFrom,

    #[error("query references none of the tables: {}", RECOGNIZED_TABLES.join(", "))]
    NoRecognizedTable,

    #[error("query contains mutating keyword '{0}'")]
    MutatingKeyword(&'static str),
}

/// Keyword gate for generated ShopifyQL.
///
/// This is a safety check, not a parser: a malformed query that satisfies the
/// keyword rules is accepted. Matching is case-insensitive substring search.
pub struct QueryValidator;

impl QueryValidator {
    /// Applies the rules in order and reports the first one that fails.
    pub fn check(query: &str) -> Result<(), QueryRejection> {
        let lowered = query.to_lowercase();

        if !lowered.contains("from") {
            return Err(QueryRejection::MissingFrom);
        }

        if !RECOGNIZED_TABLES.iter().any(|table| lowered.contains(table)) {
            return Err(QueryRejection::NoRecognizedTable);
        }

        if let Some(keyword) = MUTATING_KEYWORDS
            .iter()
            .find(|keyword| lowered.contains(*keyword))
        {
            return Err(QueryRejection::MutatingKeyword(keyword));
        }

        Ok(())
    }

    pub fn validate(query: &str) -> bool {
        Self::check(query).is_ok()
    }
}

/// Shorthand for [`QueryValidator::validate`].
pub fn validate_query(query: &str) -> bool {
    QueryValidator::validate(query)
}
