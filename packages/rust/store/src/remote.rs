//! Shopify-backed [`DocumentStore`] implementation.
//!
//! Reads go through the public storefront JSON endpoints
//! (`/collections/{handle}.json`, `/products/{handle}.json`) with an HTML
//! scrape fallback for collection listings; writes go through the admin
//! GraphQL API (`productUpdate`).

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use url::Url;

use linkforge_shared::{Document, LinkForgeError, Result, StoreConfig};

use crate::DocumentStore;

/// User-Agent string for store requests.
const USER_AGENT: &str = concat!("LinkForge/", env!("CARGO_PKG_VERSION"));

/// Admin API version pinned for the GraphQL endpoint.
const ADMIN_API_VERSION: &str = "2024-01";

const PRODUCT_UPDATE_MUTATION: &str = r#"
mutation productUpdate($input: ProductInput!) {
  productUpdate(input: $input) {
    product { id title }
    userErrors { field message }
  }
}
"#;

static PRODUCT_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/products/"]"#).unwrap());

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CollectionEnvelope {
    #[serde(default)]
    collection: CollectionPayload,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionPayload {
    #[serde(default)]
    products: Vec<ProductRef>,
}

#[derive(Debug, Deserialize)]
struct ProductRef {
    #[serde(default)]
    handle: String,
}

#[derive(Debug, Deserialize)]
struct ProductEnvelope {
    #[serde(default)]
    product: ProductPayload,
}

#[derive(Debug, Default, Deserialize)]
struct ProductPayload {
    id: Option<u64>,
    title: Option<String>,
    #[serde(default)]
    body_html: String,
}

// ---------------------------------------------------------------------------
// ShopStore
// ---------------------------------------------------------------------------

/// Shopify-backed document store.
#[derive(Debug)]
pub struct ShopStore {
    client: Client,
    /// Public storefront base URL, no trailing slash.
    base_url: String,
    /// Admin API origin (`https://{shop}.myshopify.com`), when configured.
    admin_url: Option<String>,
    /// Admin access token, read from the configured env var.
    token: Option<String>,
}

impl ShopStore {
    /// Build a store client from configuration. The access token is read
    /// from the configured environment variable; it may be absent for
    /// read-only use (listing, fetching, dry runs).
    pub fn new(config: &StoreConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(LinkForgeError::config("store.base_url is not configured"));
        }
        let base = Url::parse(&config.base_url).map_err(|e| {
            LinkForgeError::config(format!("invalid store.base_url '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LinkForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        let admin_url = normalize_shop(&config.shop).map(|shop| format!("https://{shop}"));
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty());

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            admin_url,
            token,
        })
    }

    /// Point the admin endpoint at a mock server (for integration tests).
    #[cfg(test)]
    fn with_admin_url(mut self, url: &str) -> Self {
        self.admin_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Inject an access token directly (for integration tests).
    #[cfg(test)]
    fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Scrape product handles from the collection's HTML page. Fallback for
    /// shops where the JSON endpoint is disabled or empty.
    async fn scrape_collection(&self, collection: &str) -> Result<Vec<String>> {
        let url = format!("{}/collections/{collection}", self.base_url);
        let body = self.get_text(&url).await?;
        let doc = Html::parse_document(&body);

        let mut seen = HashSet::new();
        let mut handles = Vec::new();
        for el in doc.select(&PRODUCT_LINK_SEL) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            if let Some(handle) = handle_from_product_href(href) {
                if seen.insert(handle.clone()) {
                    handles.push(handle);
                }
            }
        }

        Ok(handles)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LinkForgeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkForgeError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| LinkForgeError::Network(format!("{url}: body read failed: {e}")))
    }
}

#[async_trait]
impl DocumentStore for ShopStore {
    #[instrument(skip(self))]
    async fn list_documents(&self, collection: &str) -> Result<Vec<String>> {
        let url = format!("{}/collections/{collection}.json", self.base_url);

        match self.get_text(&url).await {
            Ok(body) => {
                if let Ok(envelope) = serde_json::from_str::<CollectionEnvelope>(&body) {
                    let handles: Vec<String> = envelope
                        .collection
                        .products
                        .into_iter()
                        .map(|p| p.handle)
                        .filter(|h| !h.is_empty())
                        .collect();
                    if !handles.is_empty() {
                        debug!(count = handles.len(), "collection listed via JSON");
                        return Ok(handles);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "collection JSON endpoint failed, falling back to HTML");
            }
        }

        self.scrape_collection(collection).await
    }

    #[instrument(skip(self))]
    async fn fetch_document(&self, handle: &str) -> Result<Document> {
        let url = format!("{}/products/{handle}.json", self.base_url);
        let body = self.get_text(&url).await?;

        let envelope: ProductEnvelope = serde_json::from_str(&body).map_err(|e| {
            LinkForgeError::parse(format!("product payload for '{handle}': {e}"))
        })?;

        let product = envelope.product;
        Ok(Document {
            handle: handle.to_string(),
            remote_id: product.id.map(|id| format!("gid://shopify/Product/{id}")),
            title: product.title,
            content_hash: compute_hash(&product.body_html),
            html: product.body_html,
            fetched_at: Utc::now(),
        })
    }

    #[instrument(skip(self, html), fields(handle = %document.handle))]
    async fn persist_document(&self, document: &Document, html: &str) -> Result<()> {
        let admin_url = self
            .admin_url
            .as_ref()
            .ok_or_else(|| LinkForgeError::config("store.shop is not configured"))?;
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| LinkForgeError::config("store access token is not set"))?;
        let remote_id = document.remote_id.as_ref().ok_or_else(|| {
            LinkForgeError::validation(format!("document '{}' has no remote id", document.handle))
        })?;

        let url = format!("{admin_url}/admin/api/{ADMIN_API_VERSION}/graphql.json");
        let body = serde_json::json!({
            "query": PRODUCT_UPDATE_MUTATION,
            "variables": { "input": { "id": remote_id, "descriptionHtml": html } },
        });

        let response = self
            .client
            .post(&url)
            .header("X-Shopify-Access-Token", token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LinkForgeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkForgeError::Network(format!("{url}: HTTP {status}")));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LinkForgeError::parse(format!("productUpdate response: {e}")))?;

        if let Some(errors) = result.get("errors") {
            return Err(LinkForgeError::Store(format!("productUpdate: {errors}")));
        }

        let user_errors = &result["data"]["productUpdate"]["userErrors"];
        if user_errors.as_array().is_some_and(|errs| !errs.is_empty()) {
            return Err(LinkForgeError::Store(format!(
                "productUpdate userErrors: {user_errors}"
            )));
        }

        debug!("description persisted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalize a shop name to its `.myshopify.com` host. Empty input → `None`.
fn normalize_shop(shop: &str) -> Option<String> {
    let shop = shop.trim();
    if shop.is_empty() {
        return None;
    }
    if shop.ends_with(".myshopify.com") {
        Some(shop.to_string())
    } else {
        Some(format!("{shop}.myshopify.com"))
    }
}

/// Extract the product handle from an `/products/…` href.
fn handle_from_product_href(href: &str) -> Option<String> {
    let tail = href.split("/products/").nth(1)?;
    let handle = tail
        .split('?')
        .next()
        .unwrap_or("")
        .split('#')
        .next()
        .unwrap_or("")
        .trim_matches('/')
        .trim();
    if handle.is_empty() {
        None
    } else {
        Some(handle.to_string())
    }
}

/// Compute SHA-256 hash of content.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn store_for(server: &MockServer) -> ShopStore {
        let config = StoreConfig {
            base_url: server.uri(),
            shop: String::new(),
            token_env: "LF_TEST_UNSET_TOKEN".into(),
        };
        ShopStore::new(&config).unwrap()
    }

    fn sample_document() -> Document {
        Document {
            handle: "sapphire-ring".into(),
            remote_id: Some("gid://shopify/Product/42".into()),
            title: Some("Sapphire Ring".into()),
            html: "<p>old</p>".into(),
            content_hash: compute_hash("<p>old</p>"),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn shop_normalization() {
        assert_eq!(
            normalize_shop("example-shop"),
            Some("example-shop.myshopify.com".into())
        );
        assert_eq!(
            normalize_shop("example-shop.myshopify.com"),
            Some("example-shop.myshopify.com".into())
        );
        assert_eq!(normalize_shop("  "), None);
    }

    #[test]
    fn product_href_parsing() {
        assert_eq!(
            handle_from_product_href("/products/sapphire-ring?variant=1#top"),
            Some("sapphire-ring".into())
        );
        assert_eq!(
            handle_from_product_href("https://shop.example.com/products/topaz-band/"),
            Some("topaz-band".into())
        );
        assert_eq!(handle_from_product_href("/collections/all"), None);
        assert_eq!(handle_from_product_href("/products/"), None);
    }

    #[test]
    fn missing_base_url_is_config_error() {
        let config = StoreConfig::default();
        let err = ShopStore::new(&config).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[tokio::test]
    async fn list_documents_via_collection_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/rings.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "collection": {
                    "products": [
                        { "handle": "sapphire-ring" },
                        { "handle": "topaz-band" },
                        { "handle": "" },
                    ]
                }
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let handles = store.list_documents("rings").await.unwrap();
        assert_eq!(handles, vec!["sapphire-ring", "topaz-band"]);
    }

    #[tokio::test]
    async fn list_documents_falls_back_to_html_scraping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/rings.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let page = r#"<html><body>
            <a href="/products/sapphire-ring?variant=2">Sapphire</a>
            <a href="/products/topaz-band">Topaz</a>
            <a href="/products/sapphire-ring">Sapphire again</a>
            <a href="/collections/other">Not a product</a>
        </body></html>"#;
        Mock::given(method("GET"))
            .and(path("/collections/rings"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let handles = store.list_documents("rings").await.unwrap();
        // Deduplicated, input order preserved
        assert_eq!(handles, vec!["sapphire-ring", "topaz-band"]);
    }

    #[tokio::test]
    async fn fetch_document_builds_gid_and_hash() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/sapphire-ring.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "product": {
                    "id": 42,
                    "title": "Sapphire Ring",
                    "body_html": "<h2>Product Description</h2><p>Blue.</p>"
                }
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let doc = store.fetch_document("sapphire-ring").await.unwrap();
        assert_eq!(doc.handle, "sapphire-ring");
        assert_eq!(doc.remote_id.as_deref(), Some("gid://shopify/Product/42"));
        assert_eq!(doc.title.as_deref(), Some("Sapphire Ring"));
        assert!(doc.html.contains("Product Description"));
        assert_eq!(doc.content_hash.len(), 64);
    }

    #[tokio::test]
    async fn fetch_missing_document_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/ghost.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let err = store.fetch_document("ghost").await.unwrap_err();
        assert!(matches!(err, LinkForgeError::Network(_)));
    }

    #[tokio::test]
    async fn persist_document_posts_product_update() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/api/2024-01/graphql.json"))
            .and(header("X-Shopify-Access-Token", "test-token"))
            .and(body_partial_json(serde_json::json!({
                "variables": { "input": { "id": "gid://shopify/Product/42" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "productUpdate": {
                        "product": { "id": "gid://shopify/Product/42", "title": "Sapphire Ring" },
                        "userErrors": []
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server)
            .with_admin_url(&server.uri())
            .with_token("test-token");

        store
            .persist_document(&sample_document(), "<p>new</p>")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn persist_surfaces_user_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/api/2024-01/graphql.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "productUpdate": {
                        "product": null,
                        "userErrors": [
                            { "field": ["descriptionHtml"], "message": "is invalid" }
                        ]
                    }
                }
            })))
            .mount(&server)
            .await;

        let store = store_for(&server)
            .with_admin_url(&server.uri())
            .with_token("test-token");

        let err = store
            .persist_document(&sample_document(), "<p>new</p>")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkForgeError::Store(_)));
        assert!(err.to_string().contains("userErrors"));
    }

    #[tokio::test]
    async fn persist_surfaces_top_level_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/api/2024-01/graphql.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errors": [ { "message": "Invalid API key or access token" } ]
            })))
            .mount(&server)
            .await;

        let store = store_for(&server)
            .with_admin_url(&server.uri())
            .with_token("bad-token");

        let err = store
            .persist_document(&sample_document(), "<p>new</p>")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkForgeError::Store(_)));
    }

    #[tokio::test]
    async fn persist_without_token_is_config_error() {
        let server = MockServer::start().await;
        let store = store_for(&server).with_admin_url(&server.uri());

        let err = store
            .persist_document(&sample_document(), "<p>new</p>")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkForgeError::Config { .. }));
    }

    #[tokio::test]
    async fn persist_without_remote_id_is_validation_error() {
        let server = MockServer::start().await;
        let store = store_for(&server)
            .with_admin_url(&server.uri())
            .with_token("test-token");

        let mut doc = sample_document();
        doc.remote_id = None;
        let err = store.persist_document(&doc, "<p>new</p>").await.unwrap_err();
        assert!(matches!(err, LinkForgeError::Validation { .. }));
    }
}
