//! Heuristic reading of generated ShopifyQL.
//!
//! The query text is tokenized once; filters and post-processing directives
//! are then read from the token stream into explicit structures. Nothing here
//! parses the query grammar.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Threshold used for low-stock filtering when the query does not name one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Lowercased, whitespace-tokenized query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryText {
    raw: String,
    tokens: Vec<String>,
    normalized: String,
}

impl QueryText {
    pub fn new(query: &str) -> Self {
        let tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let normalized = tokens.join(" ");
        Self {
            raw: query.to_string(),
            tokens,
            normalized,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Substring test against the lowercased text with runs of whitespace
    /// collapsed, so phrases match across line breaks.
    pub fn contains(&self, phrase: &str) -> bool {
        self.normalized.contains(phrase)
    }

    /// Token that follows the first token equal to `keyword`.
    pub fn token_after(&self, keyword: &str) -> Option<&str> {
        let idx = self.tokens.iter().position(|t| t == keyword)?;
        self.tokens.get(idx + 1).map(String::as_str)
    }

    /// First whitespace-delimited word after the first occurrence of `marker`
    /// in the original text.
    pub fn word_after(&self, marker: char) -> Option<&str> {
        let (_, rest) = self.raw.split_once(marker)?;
        rest.split_whitespace().next()
    }
}

/// Relative look-back window extracted from phrases like "last 30 days".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    LastDays(i64),
}

impl TimeWindow {
    fn detect(text: &QueryText) -> Option<Self> {
        if !(text.contains("last") && text.contains("day")) {
            return None;
        }

        let days = if text.contains("7 day") || text.contains("week") {
            7
        } else if text.contains("30 day") || text.contains("month") {
            30
        } else if text.contains("90 day") {
            90
        } else {
            7
        };

        Some(TimeWindow::LastDays(days))
    }

    pub fn days(&self) -> i64 {
        match self {
            TimeWindow::LastDays(days) => *days,
        }
    }

    pub fn lower_bound(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

/// Request filters derived from a query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryFilters {
    pub limit: Option<u32>,
    pub window: Option<TimeWindow>,
    /// RFC 3339 lower bound for `created_at`, computed from `window`.
    pub created_at_min: Option<String>,
}

impl QueryFilters {
    pub fn parse(query: &str) -> Self {
        Self::parse_at(query, Utc::now())
    }

    pub fn parse_at(query: &str, now: DateTime<Utc>) -> Self {
        Self::from_text(&QueryText::new(query), now)
    }

    pub fn from_text(text: &QueryText, now: DateTime<Utc>) -> Self {
        // A malformed limit is dropped rather than reported.
        let limit = text
            .token_after("limit")
            .map(|token| token.trim_end_matches(';'))
            .and_then(|token| token.parse::<u32>().ok());

        let window = TimeWindow::detect(text);
        let created_at_min = window.map(|w| {
            w.lower_bound(now)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        });

        Self {
            limit,
            window,
            created_at_min,
        }
    }
}

/// Post-processing directives read from a query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessingPlan {
    /// Aggregate order line items into per-product totals.
    pub group_by_product: bool,
    /// Sort aggregates by quantity, descending.
    pub sort_by_quantity: bool,
    /// Keep inventory levels with `available` strictly below this.
    pub low_stock_threshold: Option<i64>,
    /// Keep customers with more than one order.
    pub repeat_customers: bool,
}

impl ProcessingPlan {
    pub fn parse(query: &str) -> Self {
        Self::from_text(&QueryText::new(query))
    }

    pub fn from_text(text: &QueryText) -> Self {
        let low_stock_threshold = if text.contains("where") && text.contains("quantity") {
            Some(
                text.word_after('<')
                    .map(|word| word.trim_end_matches(';'))
                    .and_then(|word| word.parse::<i64>().ok())
                    .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            )
        } else {
            None
        };

        Self {
            group_by_product: text.contains("group by product") || text.contains("by product"),
            sort_by_quantity: text.contains("order by"),
            low_stock_threshold,
            repeat_customers: text.contains("repeat") || text.contains("orders_count"),
        }
    }
}
