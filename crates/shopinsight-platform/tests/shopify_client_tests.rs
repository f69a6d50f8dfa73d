use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use shopinsight_core::{Domain, ExecutionResult, ShopInsightError};
use shopinsight_platform::{DataPlatform, PlatformError, ShopifyClient, ShopifyConfig};

fn client_for(server: &ServerGuard) -> ShopifyClient {
    let config = ShopifyConfig::new("demo.myshopify.com", "shpat_test").with_base_url(server.url());
    ShopifyClient::new(config).unwrap()
}

fn orders_body() -> serde_json::Value {
    json!({
        "orders": [
            {"id": 1, "line_items": [
                {"product_id": 1, "name": "A", "quantity": 1, "price": "10.00"},
                {"product_id": 2, "name": "B", "quantity": 5, "price": "4.00"},
                {"product_id": 3, "name": "C", "quantity": 2, "price": "1.00"}
            ]},
            {"id": 2, "line_items": [
                {"product_id": 4, "name": "D", "quantity": 7, "price": "3.00"},
                {"product_id": 5, "name": "E", "quantity": 3, "price": "2.50"},
                {"product_id": 6, "name": "F", "quantity": 1, "price": "9.00"},
                {"product_id": 1, "name": "A", "quantity": 1, "price": "10.00"}
            ]}
        ]
    })
}

#[tokio::test]
async fn test_orders_grouped_and_sorted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/orders.json")
        .match_header("x-shopify-access-token", "shpat_test")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("status".into(), "any".into()),
            Matcher::UrlEncoded("limit".into(), "5".into()),
            Matcher::Regex("created_at_min=".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(orders_body().to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client
        .query(
            Domain::Orders,
            "FROM orders SINCE last 7 day GROUP BY product_id ORDER BY SUM(quantity) DESC LIMIT 5",
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.data_points(), 6);

    let records = result.records().unwrap();
    let quantities: Vec<i64> = records
        .iter()
        .map(|r| r["total_quantity"].as_i64().unwrap())
        .collect();
    assert_eq!(quantities, vec![7, 5, 3, 2, 2, 1]);
    assert_eq!(records[0]["product_name"], json!("D"));
    // Product A was seen first, so it keeps its place ahead of C on a tie.
    assert_eq!(records[3]["product_id"], json!(1));
    assert_eq!(records[3]["total_revenue"], json!(20.0));
}

#[tokio::test]
async fn test_order_limit_bounds_orders_not_products() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/orders.json")
        .match_query(Matcher::UrlEncoded("limit".into(), "2".into()))
        .with_status(200)
        .with_body(
            json!({
                "orders": [
                    {"id": 1, "line_items": [
                        {"product_id": 10, "name": "Mug", "quantity": 2, "price": "8.00"},
                        {"product_id": 11, "name": "Cap", "quantity": 4, "price": "12.00"}
                    ]},
                    {"id": 2, "line_items": [
                        {"product_id": 12, "name": "Tee", "quantity": 1, "price": "20.00"},
                        {"product_id": 10, "name": "Mug", "quantity": 1, "price": "8.00"}
                    ]}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let records = client_for(&server)
        .query_orders("FROM orders GROUP BY product ORDER BY quantity LIMIT 2")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(records.len(), 3);
    let names: Vec<&str> = records
        .iter()
        .map(|r| r["product_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Cap", "Mug", "Tee"]);
}

#[tokio::test]
async fn test_orders_without_grouping_are_raw() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/orders.json")
        .match_query(Matcher::UrlEncoded("limit".into(), "50".into()))
        .with_status(200)
        .with_body(orders_body().to_string())
        .create_async()
        .await;

    let records = client_for(&server)
        .query_orders("FROM orders SHOW count(id)")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(records.len(), 2);
    assert!(records[0].contains_key("line_items"));
}

#[tokio::test]
async fn test_inventory_low_stock_filter() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/inventory_levels.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({
                "inventory_levels": [
                    {"inventory_item_id": 1, "available": 2},
                    {"inventory_item_id": 2, "available": 8},
                    {"inventory_item_id": 3, "available": 40}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let result = client_for(&server)
        .query(Domain::Inventory, "FROM inventory WHERE quantity < 5")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.data_points(), 1);
}

#[tokio::test]
async fn test_customers_repeat_filter() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/customers.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({
                "customers": [
                    {"id": 1, "orders_count": 1},
                    {"id": 2, "orders_count": 3}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let records = client_for(&server)
        .query_customers("FROM customers WHERE orders_count > 1")
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], json!(2));
}

#[tokio::test]
async fn test_products_passthrough() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/products.json")
        .match_query(Matcher::UrlEncoded("limit".into(), "10".into()))
        .with_status(200)
        .with_body(json!({"products": [{"id": 1, "title": "Mug"}]}).to_string())
        .create_async()
        .await;

    let result = client_for(&server)
        .query(Domain::Products, "FROM products SHOW title LIMIT 10")
        .await
        .unwrap();

    assert!(matches!(result, ExecutionResult::Records(ref r) if r.len() == 1));
}

#[tokio::test]
async fn test_non_success_status_is_platform_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/products.json")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"errors":"[API] Invalid API key or access token"}"#)
        .create_async()
        .await;

    let err = client_for(&server)
        .query(Domain::Products, "FROM products")
        .await
        .unwrap_err();

    match &err {
        PlatformError::Status { domain, status, body } => {
            assert_eq!(*domain, Domain::Products);
            assert_eq!(status.as_u16(), 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let converted = ShopInsightError::from(err);
    assert!(converted.is_downstream_error());
}

#[tokio::test]
async fn test_unreachable_host_is_request_error() {
    let config =
        ShopifyConfig::new("demo.myshopify.com", "token").with_base_url("http://127.0.0.1:1");
    let client = ShopifyClient::new(config).unwrap();

    let err = client.query_products("FROM products").await.unwrap_err();
    assert!(matches!(
        err,
        PlatformError::Request {
            domain: Domain::Products,
            ..
        }
    ));
}
