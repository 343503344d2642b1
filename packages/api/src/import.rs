//! # Product import from Shopify and WooCommerce
//!
//! [`ProductImporter`] fetches a store's product list over HTTP and maps it
//! into [`Product`] records, ready to be added as `product` links.
//!
//! | Platform | Endpoint | Body |
//! |----------|----------|------|
//! | Shopify | `{shopify_api_url}/products.json` | `{"products": [{id, title, handle, variants: [{price}], images: [{src}]}]}` |
//! | WooCommerce | `{woocommerce_api_url}/products` | `[{id, name, price, permalink, images: [{src}]}]` |
//!
//! Import never fails from the caller's point of view: a network error, a
//! non-success status or a body that does not map yields an empty list and a
//! `warn!` event. A platform whose API URL is empty is skipped.
//!
//! The mapping functions are pure so they can be tested without a server.

use serde::Deserialize;
use serde_json::Value;
use store::models::{Platform, Product};
use thiserror::Error;
use tracing::{debug, warn};

use crate::settings::ImportSettings;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("product {id}: {message}")]
    Product { id: String, message: String },
}

#[derive(Deserialize)]
struct ImageRef {
    src: String,
}

#[derive(Deserialize)]
struct ShopifyVariant {
    price: String,
}

#[derive(Deserialize)]
struct ShopifyProduct {
    id: Value,
    title: String,
    handle: String,
    #[serde(default)]
    variants: Vec<ShopifyVariant>,
    #[serde(default)]
    images: Vec<ImageRef>,
}

#[derive(Deserialize)]
struct ShopifyBody {
    products: Vec<ShopifyProduct>,
}

#[derive(Deserialize)]
struct WooProduct {
    id: Value,
    name: String,
    price: String,
    permalink: String,
    #[serde(default)]
    images: Vec<ImageRef>,
}

/// Numeric or string product id, as text.
fn id_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_price(id: &str, price: &str) -> Result<f64, ImportError> {
    price
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| ImportError::Product {
            id: id.to_string(),
            message: format!("price `{price}` is not a number"),
        })
}

/// Map a Shopify `products.json` body. Product pages live under `store_url`.
pub fn map_shopify_products(body: Value, store_url: &str) -> Result<Vec<Product>, ImportError> {
    let body: ShopifyBody = serde_json::from_value(body)?;
    let store_url = store_url.trim_end_matches('/');
    body.products
        .into_iter()
        .map(|p| {
            let id = id_text(&p.id);
            let variant = p.variants.first().ok_or_else(|| ImportError::Product {
                id: id.clone(),
                message: "no variants".to_string(),
            })?;
            Ok(Product {
                price: parse_price(&id, &variant.price)?,
                id,
                title: p.title,
                image: p.images.into_iter().next().map(|i| i.src),
                platform: Platform::Shopify,
                url: format!("{store_url}/products/{}", p.handle),
            })
        })
        .collect()
}

/// Map a WooCommerce `products` body.
pub fn map_woocommerce_products(body: Value) -> Result<Vec<Product>, ImportError> {
    let body: Vec<WooProduct> = serde_json::from_value(body)?;
    body.into_iter()
        .map(|p| {
            let id = id_text(&p.id);
            Ok(Product {
                price: parse_price(&id, &p.price)?,
                id,
                title: p.name,
                image: p.images.into_iter().next().map(|i| i.src),
                platform: Platform::WooCommerce,
                url: p.permalink,
            })
        })
        .collect()
}

/// Fetches products from the configured platforms.
#[derive(Clone, Debug)]
pub struct ProductImporter {
    client: reqwest::Client,
    settings: ImportSettings,
}

impl ProductImporter {
    pub fn new(settings: ImportSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, ImportError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn fetch_shopify_products(&self) -> Vec<Product> {
        let base = self.settings.shopify_api_url.trim_end_matches('/');
        if base.is_empty() {
            debug!("shopify import not configured");
            return Vec::new();
        }
        let url = format!("{base}/products.json");
        let result = match self.get_json(&url).await {
            Ok(body) => map_shopify_products(body, &self.settings.shopify_store_url),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(%url, error = %e, "shopify import failed");
            Vec::new()
        })
    }

    pub async fn fetch_woocommerce_products(&self) -> Vec<Product> {
        let base = self.settings.woocommerce_api_url.trim_end_matches('/');
        if base.is_empty() {
            debug!("woocommerce import not configured");
            return Vec::new();
        }
        let url = format!("{base}/products");
        let result = match self.get_json(&url).await {
            Ok(body) => map_woocommerce_products(body),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(%url, error = %e, "woocommerce import failed");
            Vec::new()
        })
    }

    /// Products from every configured platform, Shopify first.
    pub async fn fetch_all(&self) -> Vec<Product> {
        let mut products = self.fetch_shopify_products().await;
        products.extend(self.fetch_woocommerce_products().await);
        products
    }
}
