//! Content-store collaborators for LinkForge.
//!
//! The core consumes the [`DocumentStore`] contract: list the documents of a
//! collection, fetch one document, persist a mutated document. Transport,
//! authentication, and pagination live behind this trait; [`ShopStore`] is
//! the Shopify-backed implementation.

mod remote;

use async_trait::async_trait;

use linkforge_shared::{Document, Result};

pub use remote::ShopStore;

/// External content store the runner drives.
///
/// Implementations own all wire concerns; the core only sees opaque HTML in
/// and HTML out.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ordered document handles for a collection. Pagination, when the
    /// backend needs it, is resolved here — callers consume a flat list.
    async fn list_documents(&self, collection: &str) -> Result<Vec<String>>;

    /// Fetch one document fresh. Every processing pass re-fetches; nothing
    /// is cached across runs.
    async fn fetch_document(&self, handle: &str) -> Result<Document>;

    /// Write the mutated description HTML back to the store.
    async fn persist_document(&self, document: &Document, html: &str) -> Result<()>;
}
