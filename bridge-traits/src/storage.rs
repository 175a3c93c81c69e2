//! Remote Blob Storage Abstraction
//!
//! A remote store that addresses documents by logical path or by opaque id and
//! supports whole-document reads and writes. Writes may be conditioned on the
//! version observed when the document was read.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Location and current version of a remote document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    /// Opaque provider identifier of the document
    pub id: String,
    /// Version tag (e.g. an HTTP entity tag); `None` when the provider does not report one
    pub version: Option<String>,
}

impl BlobHandle {
    pub fn new(id: impl Into<String>, version: Option<String>) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

/// Remote blob store trait
///
/// Every call carries the caller's bearer token; implementations never cache
/// or refresh credentials themselves.
///
/// Error contract:
/// - `Unauthorized` for rejected credentials
/// - `NotFound` when the addressed document does not exist
/// - `AlreadyExists` when `create` loses a race with another creator
/// - `PreconditionFailed` when a conditional `write` observes a newer version
/// - `Timeout` / `Network` / `Unavailable` for transient failures
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::BlobStore;
///
/// async fn overwrite(store: &dyn BlobStore, token: &str) -> Result<()> {
///     let handle = store.lookup("Documents/data.json", token).await?.unwrap();
///     store
///         .write(&handle.id, "[]".into(), handle.version.as_deref(), token)
///         .await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Resolve a document by logical path, returning `None` if it does not exist
    async fn lookup(&self, path: &str, token: &str) -> Result<Option<BlobHandle>>;

    /// Create a document at `path` with `initial` content
    ///
    /// Must not overwrite an existing document.
    async fn create(&self, path: &str, initial: Bytes, token: &str) -> Result<BlobHandle>;

    /// Fetch the current handle (including version) of a document by id
    async fn metadata(&self, id: &str, token: &str) -> Result<BlobHandle>;

    /// Read the full content of a document
    async fn read(&self, id: &str, token: &str) -> Result<Bytes>;

    /// Replace the full content of a document
    ///
    /// When `if_match` is `Some`, the write only succeeds if the document's
    /// current version equals it.
    async fn write(
        &self,
        id: &str,
        content: Bytes,
        if_match: Option<&str>,
        token: &str,
    ) -> Result<BlobHandle>;

    /// Whether `write` honours `if_match`
    fn supports_conditional_writes(&self) -> bool {
        true
    }
}
