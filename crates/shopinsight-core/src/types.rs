use crate::error::ShopInsightError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Data domains the platform client knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Orders,
    Products,
    Inventory,
    Customers,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Orders,
        Domain::Products,
        Domain::Inventory,
        Domain::Customers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Orders => "orders",
            Domain::Products => "products",
            Domain::Inventory => "inventory",
            Domain::Customers => "customers",
        }
    }

    /// Admin API resource backing this domain. The response body carries an
    /// array under the same name.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Domain::Orders => "orders",
            Domain::Products => "products",
            Domain::Inventory => "inventory_levels",
            Domain::Customers => "customers",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ShopInsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "orders" => Ok(Domain::Orders),
            "products" => Ok(Domain::Products),
            "inventory" | "inventory_levels" => Ok(Domain::Inventory),
            "customers" => Ok(Domain::Customers),
            other => Err(ShopInsightError::UnknownDomain(other.to_string())),
        }
    }
}

/// Structured reading of a natural-language question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub domain: Domain,
    pub metrics: Vec<String>,
    pub time_period: String,
    pub filters: BTreeMap<String, String>,
    #[serde(rename = "intent_summary")]
    pub summary: String,
}

impl Intent {
    pub const FALLBACK_TIME_PERIOD: &'static str = "last_30_days";

    /// Intent used when the classifier output cannot be read.
    pub fn fallback() -> Self {
        Self {
            domain: Domain::Orders,
            metrics: vec!["count".to_string()],
            time_period: Self::FALLBACK_TIME_PERIOD.to_string(),
            filters: BTreeMap::new(),
            summary: String::new(),
        }
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::fallback()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            _ => Err(()),
        }
    }
}

/// Business-readable answer produced from an execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub answer: String,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Explanation {
    /// Explanation used when the completion text is not structured.
    pub fn fallback(raw: impl Into<String>) -> Self {
        Self {
            answer: raw.into(),
            confidence: Confidence::Medium,
            reasoning: None,
        }
    }
}

/// A single platform record.
pub type Record = Map<String, Value>;

/// Rows returned by the platform client or restored from the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    Records(Vec<Record>),
    Aggregate(Value),
}

impl ExecutionResult {
    /// Number of data points reported to the caller: one per record, or one
    /// for a single aggregate value.
    pub fn data_points(&self) -> usize {
        match self {
            ExecutionResult::Records(records) => records.len(),
            ExecutionResult::Aggregate(_) => 1,
        }
    }

    pub fn records(&self) -> Option<&[Record]> {
        match self {
            ExecutionResult::Records(records) => Some(records),
            ExecutionResult::Aggregate(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ExecutionResult::Records(records) => {
                Value::Array(records.iter().cloned().map(Value::Object).collect())
            }
            ExecutionResult::Aggregate(value) => value.clone(),
        }
    }

    /// Rebuilds a result from its serialized form. Arrays of objects become
    /// records; anything else is kept as an aggregate.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) if items.iter().all(Value::is_object) => {
                ExecutionResult::Records(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::Object(map) => Some(map),
                            _ => None,
                        })
                        .collect(),
                )
            }
            other => ExecutionResult::Aggregate(other),
        }
    }
}

impl From<Vec<Record>> for ExecutionResult {
    fn from(records: Vec<Record>) -> Self {
        ExecutionResult::Records(records)
    }
}

/// Final answer returned for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub answer: String,
    pub confidence: Confidence,
    pub query_used: Option<String>,
    pub data_points: usize,
    pub reasoning: Option<String>,
}

/// Cache key for one executed query: `{store_id}:{domain}:{query}`.
///
/// Requires a resolved [`Domain`], so a key never exists for a domain the
/// platform client cannot serve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(store_id: &str, domain: Domain, query: &str) -> Self {
        Self(format!("{}:{}:{}", store_id, domain, query))
    }

    /// Glob matching every cached result for a store.
    pub fn store_pattern(store_id: &str) -> String {
        format!("{}:*", store_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
