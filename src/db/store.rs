//! The document store seam.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::WriteResult;

/// Minimal document database operations.
///
/// Documents are raw JSON objects carrying `_id` and `_rev`. Adapters pass them
/// through untouched; decoding into domain records happens in the repository.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), AppError>;

    /// Create the target collection if it does not exist yet.
    async fn ensure_database(&self) -> Result<(), AppError>;

    /// Fetch a document by id. `None` when it does not exist.
    async fn get(&self, id: &str) -> Result<Option<Value>, AppError>;

    /// Write a document.
    ///
    /// Without `_id` the store assigns one. With `_id` but no `_rev` the
    /// document is created under that id. With both it replaces the current
    /// revision; a stale `_rev` yields [`AppError::Conflict`].
    async fn insert(&self, doc: Value) -> Result<WriteResult, AppError>;

    /// Every document in store order, system documents included.
    async fn list(&self) -> Result<Vec<Value>, AppError>;
}
