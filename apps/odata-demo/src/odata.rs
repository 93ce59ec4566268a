//! Minimal model of the OData v3 JSON `Products` feed.

use serde::Deserialize;

/// Public read-only sample service.
pub const DEFAULT_PRODUCTS_URL: &str = "https://services.odata.org/V3/OData/OData.svc/Products?$format=json";

#[derive(Debug, Deserialize)]
pub struct Feed {
    pub value: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct Product {
    #[serde(rename = "ID", default)]
    pub id: Option<u32>,
    #[serde(rename = "Name")]
    pub name: String,
}

pub fn print_feed(feed: &Feed) {
    for product in &feed.value {
        match product.id {
            Some(id) => println!("{id:>3}  {}", product.name),
            None => println!("     {}", product.name),
        }
    }
}
