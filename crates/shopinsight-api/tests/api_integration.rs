use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{json, Value};
use shopinsight_ai::{CompletionProvider, LLMResult, PromptTemplate, PromptVariables};
use shopinsight_api::{create_router, AppState, PlatformFactory, StoreCredentials};
use shopinsight_cache::{InMemoryCache, RedisCache, ResultCache};
use shopinsight_core::{Domain, Record, ShopInsightConfig};
use shopinsight_platform::{DataPlatform, PlatformError};
use std::sync::{Arc, Mutex};

struct FixedCompletion {
    query: &'static str,
}

#[async_trait]
impl CompletionProvider for FixedCompletion {
    async fn complete(
        &self,
        template: &PromptTemplate,
        _variables: &PromptVariables,
    ) -> LLMResult<String> {
        Ok(match template.name {
            "intent_classification" => json!({"domain": "products"}).to_string(),
            "query_generation" => self.query.to_string(),
            _ => json!({
                "answer": "You have 2 active products.",
                "confidence": "high",
                "reasoning": "Counted product records"
            })
            .to_string(),
        })
    }
}

struct StaticPlatform {
    fail: bool,
}

impl StaticPlatform {
    fn records(&self, domain: Domain) -> Result<Vec<Record>, PlatformError> {
        if self.fail {
            return Err(PlatformError::Decode {
                domain,
                reason: "upstream unavailable".to_string(),
            });
        }
        Ok(vec![json!({"id": 1}), json!({"id": 2})]
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }
}

#[async_trait]
impl DataPlatform for StaticPlatform {
    async fn query_orders(&self, _query: &str) -> Result<Vec<Record>, PlatformError> {
        self.records(Domain::Orders)
    }

    async fn query_products(&self, _query: &str) -> Result<Vec<Record>, PlatformError> {
        self.records(Domain::Products)
    }

    async fn query_inventory(&self, _query: &str) -> Result<Vec<Record>, PlatformError> {
        self.records(Domain::Inventory)
    }

    async fn query_customers(&self, _query: &str) -> Result<Vec<Record>, PlatformError> {
        self.records(Domain::Customers)
    }
}

#[derive(Default)]
struct RecordingFactory {
    fail: bool,
    seen: Mutex<Vec<StoreCredentials>>,
}

impl PlatformFactory for RecordingFactory {
    fn create(
        &self,
        credentials: &StoreCredentials,
    ) -> shopinsight_core::Result<Arc<dyn DataPlatform>> {
        self.seen.lock().unwrap().push(credentials.clone());
        Ok(Arc::new(StaticPlatform { fail: self.fail }))
    }
}

fn server_with(
    query: &'static str,
    factory: Arc<RecordingFactory>,
    cache: Arc<dyn ResultCache>,
) -> TestServer {
    let state = AppState::from_parts(
        Arc::new(ShopInsightConfig::default()),
        cache,
        Arc::new(FixedCompletion { query }),
        factory,
    );
    TestServer::new(create_router(state)).unwrap()
}

fn default_server() -> TestServer {
    server_with(
        "FROM products LIMIT 10",
        Arc::new(RecordingFactory::default()),
        Arc::new(InMemoryCache::new()),
    )
}

fn analyze_body() -> Value {
    json!({
        "store_id": "demo.myshopify.com",
        "question": "How many products do I have?",
        "context": {"access_token": "shpat_test", "api_version": "2024-07"}
    })
}

#[tokio::test]
async fn root_reports_service() {
    let server = default_server();

    let resp = server.get("/").await;
    assert_eq!(resp.status_code(), 200);
    let body: Value = resp.json();
    assert_eq!(body["service"], "Shopify AI Analytics Agent");
    assert_eq!(body["status"], "running");
    assert_eq!(body["version"], "1.0.0");
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let server = default_server();

    let resp = server.get("/health").await;
    assert_eq!(resp.status_code(), 200);
    let body: Value = resp.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"], "available");
}

#[tokio::test]
async fn health_reports_degraded_cache() {
    let server = server_with(
        "FROM products",
        Arc::new(RecordingFactory::default()),
        Arc::new(RedisCache::degraded()),
    );

    let body: Value = server.get("/health").await.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"], "degraded");
}

#[tokio::test]
async fn analyze_returns_pipeline_response() {
    let factory = Arc::new(RecordingFactory::default());
    let server = server_with(
        "FROM products LIMIT 10",
        factory.clone(),
        Arc::new(InMemoryCache::new()),
    );

    let resp = server.post("/api/analyze").json(&analyze_body()).await;
    assert_eq!(resp.status_code(), 200);

    let body: Value = resp.json();
    assert_eq!(body["answer"], "You have 2 active products.");
    assert_eq!(body["confidence"], "high");
    assert_eq!(body["query_used"], "FROM products LIMIT 10");
    assert_eq!(body["data_points"], 2);
    assert_eq!(body["reasoning"], "Counted product records");

    let seen = factory.seen.lock().unwrap();
    assert_eq!(seen[0].store_id, "demo.myshopify.com");
    assert_eq!(seen[0].access_token, "shpat_test");
    assert_eq!(seen[0].api_version.as_deref(), Some("2024-07"));
}

#[tokio::test]
async fn analyze_requires_access_token() {
    let server = default_server();

    let resp = server
        .post("/api/analyze")
        .json(&json!({"store_id": "demo.myshopify.com", "question": "Sales?"}))
        .await;

    assert_eq!(resp.status_code(), 400);
    let body: Value = resp.json();
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("access_token"));
}

#[tokio::test]
async fn analyze_rejects_unsafe_generated_query() {
    let server = server_with(
        "DROP TABLE products",
        Arc::new(RecordingFactory::default()),
        Arc::new(InMemoryCache::new()),
    );

    let resp = server.post("/api/analyze").json(&analyze_body()).await;
    assert_eq!(resp.status_code(), 400);
    let body: Value = resp.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Generated invalid ShopifyQL: DROP TABLE products"));
}

#[tokio::test]
async fn analyze_maps_platform_failure_to_bad_gateway() {
    let server = server_with(
        "FROM products",
        Arc::new(RecordingFactory {
            fail: true,
            ..Default::default()
        }),
        Arc::new(InMemoryCache::new()),
    );

    let resp = server.post("/api/analyze").json(&analyze_body()).await;
    assert_eq!(resp.status_code(), 502);
    let body: Value = resp.json();
    assert!(body["error"].as_str().unwrap().contains("products"));
}

#[tokio::test]
async fn validate_query_endpoint() {
    let server = default_server();

    let resp = server
        .post("/api/validate-query")
        .add_query_param("query", "FROM orders SHOW total_sales")
        .await;
    assert_eq!(resp.status_code(), 200);
    let body: Value = resp.json();
    assert_eq!(body["valid"], true);
    assert_eq!(body["query"], "FROM orders SHOW total_sales");
    assert!(body.get("reason").is_none());

    let body: Value = server
        .post("/api/validate-query")
        .add_query_param("query", "UPDATE orders SET total = 0 FROM orders")
        .await
        .json();
    assert_eq!(body["valid"], false);
    assert!(body["reason"].as_str().unwrap().contains("update"));
}
