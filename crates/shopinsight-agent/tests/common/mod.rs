#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use shopinsight_ai::{CompletionProvider, LLMResult, PromptTemplate, PromptVariables};
use shopinsight_core::{Domain, Record};
use shopinsight_platform::{DataPlatform, PlatformError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const TOP_PRODUCTS_QUERY: &str =
    "FROM orders\nWHERE created_at >= last 7 day\nGROUP BY product_id\nORDER BY SUM(quantity) DESC\nLIMIT 5";

/// Completion stand-in that answers each template with a fixed script.
#[derive(Default)]
pub struct ScriptedCompletion {
    responses: HashMap<&'static str, String>,
    failures: HashMap<&'static str, String>,
    delays: HashMap<&'static str, Duration>,
    calls: Mutex<Vec<(String, PromptVariables)>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, template: &PromptTemplate, text: impl Into<String>) -> Self {
        self.responses.insert(template.name, text.into());
        self
    }

    pub fn fail(mut self, template: &PromptTemplate, message: impl Into<String>) -> Self {
        self.failures.insert(template.name, message.into());
        self
    }

    pub fn delay(mut self, template: &PromptTemplate, delay: Duration) -> Self {
        self.delays.insert(template.name, delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, PromptVariables)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }

    pub fn variables_for(&self, template: &PromptTemplate) -> Option<PromptVariables> {
        self.calls()
            .into_iter()
            .find(|(name, _)| name == template.name)
            .map(|(_, vars)| vars)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables,
    ) -> LLMResult<String> {
        template.render(variables)?;
        self.calls
            .lock()
            .unwrap()
            .push((template.name.to_string(), variables.clone()));

        if let Some(delay) = self.delays.get(template.name) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(template.name) {
            anyhow::bail!("{}", message);
        }

        Ok(self
            .responses
            .get(template.name)
            .cloned()
            .unwrap_or_default())
    }
}

/// Platform stand-in returning canned records per domain.
#[derive(Default)]
pub struct StubPlatform {
    records: HashMap<Domain, Vec<Record>>,
    fail_with: Option<String>,
    calls: AtomicUsize,
    queries: Mutex<Vec<(Domain, String)>>,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, domain: Domain, records: Vec<Value>) -> Self {
        let records = records
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.records.insert(domain, records);
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<(Domain, String)> {
        self.queries.lock().unwrap().clone()
    }

    fn serve(&self, domain: Domain, query: &str) -> Result<Vec<Record>, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((domain, query.to_string()));

        if let Some(reason) = &self.fail_with {
            return Err(PlatformError::Decode {
                domain,
                reason: reason.clone(),
            });
        }
        Ok(self.records.get(&domain).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DataPlatform for StubPlatform {
    async fn query_orders(&self, query: &str) -> Result<Vec<Record>, PlatformError> {
        self.serve(Domain::Orders, query)
    }

    async fn query_products(&self, query: &str) -> Result<Vec<Record>, PlatformError> {
        self.serve(Domain::Products, query)
    }

    async fn query_inventory(&self, query: &str) -> Result<Vec<Record>, PlatformError> {
        self.serve(Domain::Inventory, query)
    }

    async fn query_customers(&self, query: &str) -> Result<Vec<Record>, PlatformError> {
        self.serve(Domain::Customers, query)
    }
}

pub fn orders_intent() -> String {
    json!({
        "domain": "orders",
        "metrics": ["quantity"],
        "time_period": "last_7_days",
        "filters": {},
        "intent_summary": "Top selling products last week"
    })
    .to_string()
}

pub fn explanation(answer: &str) -> String {
    json!({
        "answer": answer,
        "confidence": "high",
        "reasoning": "Based on order line items"
    })
    .to_string()
}

/// Two orders covering five distinct products with quantities
/// 3, 9, 4, 1 and 6 once summed.
pub fn five_product_orders() -> Value {
    json!({
        "orders": [
            {"id": 1001, "line_items": [
                {"product_id": 11, "name": "Linen Shirt", "quantity": 2, "price": "45.00"},
                {"product_id": 12, "name": "Canvas Tote", "quantity": 5, "price": "18.00"},
                {"product_id": 13, "name": "Wool Beanie", "quantity": 4, "price": "22.00"}
            ]},
            {"id": 1002, "line_items": [
                {"product_id": 12, "name": "Canvas Tote", "quantity": 4, "price": "18.00"},
                {"product_id": 14, "name": "Leather Belt", "quantity": 1, "price": "60.00"},
                {"product_id": 15, "name": "Cotton Socks", "quantity": 6, "price": "8.50"},
                {"product_id": 11, "name": "Linen Shirt", "quantity": 1, "price": "45.00"}
            ]}
        ]
    })
}
