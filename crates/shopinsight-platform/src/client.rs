use crate::error::PlatformError;
use crate::processing::{aggregate_by_product, filter_low_stock, filter_repeat_customers, sort_by_quantity};
use crate::query::{ProcessingPlan, QueryFilters, QueryText};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use shopinsight_core::{Domain, ExecutionResult, PlatformConfig, Record};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Read access to a store's commerce data, one method per domain.
///
/// Each method takes the generated query text, derives request filters from
/// it and shapes the returned rows.
#[async_trait]
pub trait DataPlatform: Send + Sync {
    async fn query_orders(&self, query: &str) -> Result<Vec<Record>, PlatformError>;

    async fn query_products(&self, query: &str) -> Result<Vec<Record>, PlatformError>;

    async fn query_inventory(&self, query: &str) -> Result<Vec<Record>, PlatformError>;

    async fn query_customers(&self, query: &str) -> Result<Vec<Record>, PlatformError>;

    async fn query(&self, domain: Domain, query: &str) -> Result<ExecutionResult, PlatformError> {
        let records = match domain {
            Domain::Orders => self.query_orders(query).await?,
            Domain::Products => self.query_products(query).await?,
            Domain::Inventory => self.query_inventory(query).await?,
            Domain::Customers => self.query_customers(query).await?,
        };
        Ok(ExecutionResult::Records(records))
    }
}

/// Connection settings for one store.
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// Store host, e.g. `example.myshopify.com`.
    pub shop_domain: String,
    pub access_token: String,
    pub api_version: String,
    pub timeout: Duration,
    /// Row limit sent when the query names none.
    pub default_limit: u32,
    /// Replaces `https://{shop_domain}/admin/api/{api_version}` when set.
    pub base_url: Option<String>,
}

impl ShopifyConfig {
    pub fn new(shop_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::from_platform_config(shop_domain, access_token, &PlatformConfig::default())
    }

    pub fn from_platform_config(
        shop_domain: impl Into<String>,
        access_token: impl Into<String>,
        platform: &PlatformConfig,
    ) -> Self {
        Self {
            shop_domain: shop_domain.into(),
            access_token: access_token.into(),
            api_version: platform.api_version.clone(),
            timeout: Duration::from_secs(platform.timeout_secs),
            default_limit: platform.default_limit,
            base_url: None,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_base(&self) -> String {
        match &self.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}/admin/api/{}",
                self.shop_domain, self.api_version
            ),
        }
    }

    pub fn endpoint_url(&self, domain: Domain) -> String {
        format!("{}/{}.json", self.api_base(), domain.endpoint())
    }
}

/// Shopify Admin REST API client.
pub struct ShopifyClient {
    config: ShopifyConfig,
    client: Client,
}

impl ShopifyClient {
    pub fn new(config: ShopifyConfig) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlatformError::Client(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ShopifyConfig {
        &self.config
    }

    /// Fetch one page of `domain` records with the given query parameters.
    pub async fn fetch(
        &self,
        domain: Domain,
        params: &[(&str, String)],
    ) -> Result<Vec<Record>, PlatformError> {
        let url = self.config.endpoint_url(domain);
        let start = Instant::now();
        debug!(%domain, %url, ?params, "Fetching from Shopify");

        let response = self
            .client
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, &self.config.access_token)
            .header("Content-Type", "application/json")
            .query(params)
            .send()
            .await
            .map_err(|source| {
                error!(%domain, error = %source, "Shopify request failed");
                PlatformError::Request { domain, source }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(%domain, %status, "Shopify API error");
            return Err(PlatformError::Status {
                domain,
                status,
                body,
            });
        }

        let body: Value = response.json().await.map_err(|e| PlatformError::Decode {
            domain,
            reason: e.to_string(),
        })?;

        let records = extract_records(domain, body)?;
        info!(
            %domain,
            count = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched records"
        );
        Ok(records)
    }

    fn limit(&self, filters: &QueryFilters) -> String {
        filters.limit.unwrap_or(self.config.default_limit).to_string()
    }
}

/// Pulls the array named after the endpoint out of a response body. A body
/// without that key yields no records.
fn extract_records(domain: Domain, body: Value) -> Result<Vec<Record>, PlatformError> {
    let Value::Object(mut body) = body else {
        return Err(PlatformError::Decode {
            domain,
            reason: "response body is not a JSON object".to_string(),
        });
    };

    match body.remove(domain.endpoint()) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        Some(_) => Err(PlatformError::Decode {
            domain,
            reason: format!("`{}` is not an array", domain.endpoint()),
        }),
    }
}

#[async_trait]
impl DataPlatform for ShopifyClient {
    async fn query_orders(&self, query: &str) -> Result<Vec<Record>, PlatformError> {
        let text = QueryText::new(query);
        let filters = QueryFilters::from_text(&text, Utc::now());
        let plan = ProcessingPlan::from_text(&text);

        let mut params = vec![("status", "any".to_string()), ("limit", self.limit(&filters))];
        if let Some(min) = filters.created_at_min.clone() {
            params.push(("created_at_min", min));
        }

        let orders = self.fetch(Domain::Orders, &params).await?;
        if !plan.group_by_product {
            return Ok(orders);
        }

        let mut sales = aggregate_by_product(&orders);
        if plan.sort_by_quantity {
            sort_by_quantity(&mut sales);
        }
        Ok(sales.into_iter().map(|s| s.into_record()).collect())
    }

    async fn query_products(&self, query: &str) -> Result<Vec<Record>, PlatformError> {
        let filters = QueryFilters::parse(query);
        let params = [("limit", self.limit(&filters))];
        self.fetch(Domain::Products, &params).await
    }

    async fn query_inventory(&self, query: &str) -> Result<Vec<Record>, PlatformError> {
        let text = QueryText::new(query);
        let filters = QueryFilters::from_text(&text, Utc::now());
        let plan = ProcessingPlan::from_text(&text);

        let params = [("limit", self.limit(&filters))];
        let levels = self.fetch(Domain::Inventory, &params).await?;

        Ok(match plan.low_stock_threshold {
            Some(threshold) => filter_low_stock(levels, threshold),
            None => levels,
        })
    }

    async fn query_customers(&self, query: &str) -> Result<Vec<Record>, PlatformError> {
        let text = QueryText::new(query);
        let filters = QueryFilters::from_text(&text, Utc::now());
        let plan = ProcessingPlan::from_text(&text);

        let mut params = vec![("limit", self.limit(&filters))];
        if let Some(min) = filters.created_at_min.clone() {
            params.push(("created_at_min", min));
        }

        let customers = self.fetch(Domain::Customers, &params).await?;
        Ok(if plan.repeat_customers {
            filter_repeat_customers(customers)
        } else {
            customers
        })
    }
}
