use serde_json::{Map, Value};
use shopinsight_core::Record;
use std::collections::HashMap;

/// Per-product totals computed from order line items.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSales {
    pub product_id: Value,
    pub product_name: Value,
    pub total_quantity: i64,
    pub total_revenue: f64,
}

impl ProductSales {
    pub fn into_record(self) -> Record {
        let mut record = Map::new();
        record.insert("product_id".to_string(), self.product_id);
        record.insert("product_name".to_string(), self.product_name);
        record.insert("total_quantity".to_string(), Value::from(self.total_quantity));
        record.insert("total_revenue".to_string(), Value::from(self.total_revenue));
        record
    }
}

/// Reads a count or amount that the Admin API may encode as either a JSON
/// number or a decimal string.
fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn integer(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

/// Groups every line item across `orders` by `product_id`.
///
/// Groups appear in first-seen order. Revenue is `price * quantity` summed
/// per line; a missing or unreadable price counts as zero.
pub fn aggregate_by_product(orders: &[Record]) -> Vec<ProductSales> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<ProductSales> = Vec::new();

    let line_items = orders
        .iter()
        .filter_map(|order| order.get("line_items").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_object);

    for item in line_items {
        let product_id = item.get("product_id").cloned().unwrap_or(Value::Null);
        let quantity = integer(item.get("quantity"));
        let price = numeric(item.get("price")).unwrap_or(0.0);

        let slot = *index.entry(product_id.to_string()).or_insert_with(|| {
            let product_name = item
                .get("name")
                .or_else(|| item.get("title"))
                .cloned()
                .unwrap_or(Value::Null);
            groups.push(ProductSales {
                product_id: product_id.clone(),
                product_name,
                total_quantity: 0,
                total_revenue: 0.0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.total_quantity += quantity;
        group.total_revenue += price * quantity as f64;
    }

    groups
}

/// Stable sort, largest quantity first.
pub fn sort_by_quantity(sales: &mut [ProductSales]) {
    sales.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));
}

pub fn filter_low_stock(levels: Vec<Record>, threshold: i64) -> Vec<Record> {
    levels
        .into_iter()
        .filter(|level| integer(level.get("available")) < threshold)
        .collect()
}

pub fn filter_repeat_customers(customers: Vec<Record>) -> Vec<Record> {
    customers
        .into_iter()
        .filter(|customer| integer(customer.get("orders_count")) > 1)
        .collect()
}
