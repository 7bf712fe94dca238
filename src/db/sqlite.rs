//! SQLite-backed document store.
//!
//! Keeps each document as a JSON body keyed by id, with CouchDB-style
//! `{generation}-{hex}` revisions so the optimistic concurrency rules match.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::DocumentStore;
use crate::errors::AppError;
use crate::models::WriteResult;

/// Document store living in a single SQLite table.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file and its connection pool.
    pub async fn open(db_path: &Path) -> Result<Self, AppError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    async fn create_document(
        &self,
        id: &str,
        body: &Map<String, Value>,
    ) -> Result<WriteResult, AppError> {
        let rev = next_rev(None);
        let result = sqlx::query(
            "INSERT INTO documents (id, rev, body) VALUES (?, ?, ?) ON CONFLICT(id) DO NOTHING",
        )
        .bind(id)
        .bind(&rev)
        .bind(serde_json::to_string(body)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Document {} already exists",
                id
            )));
        }

        Ok(WriteResult {
            id: id.to_string(),
            rev,
        })
    }

    async fn replace_document(
        &self,
        id: &str,
        current_rev: &str,
        body: &Map<String, Value>,
    ) -> Result<WriteResult, AppError> {
        let rev = next_rev(Some(current_rev));

        // Conditional UPDATE on the revision rejects stale writers
        let result = sqlx::query("UPDATE documents SET rev = ?, body = ? WHERE id = ? AND rev = ?")
            .bind(&rev)
            .bind(serde_json::to_string(body)?)
            .bind(id)
            .bind(current_rev)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Document {} has a newer revision than {}",
                id, current_rev
            )));
        }

        Ok(WriteResult {
            id: id.to_string(),
            rev,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_database(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                rev TEXT NOT NULL,
                body TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Value>, AppError> {
        let row = sqlx::query("SELECT id, rev, body FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn insert(&self, doc: Value) -> Result<WriteResult, AppError> {
        let Value::Object(mut body) = doc else {
            return Err(AppError::BadRequest(
                "Documents must be JSON objects".to_string(),
            ));
        };

        let id = match body.remove("_id") {
            Some(Value::String(id)) => id,
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "Document _id must be a string, got {}",
                    other
                )))
            }
            None => uuid::Uuid::new_v4().simple().to_string(),
        };

        match body.remove("_rev") {
            Some(Value::String(rev)) => self.replace_document(&id, &rev, &body).await,
            _ => self.create_document(&id, &body).await,
        }
    }

    /// Ordered by the raw bytes of the id (SQLite `BINARY` collation), so
    /// `"B" < "_design/x" < "a"`. CouchDB's `_all_docs` uses ICU collation
    /// instead and the two adapters can list mixed-case ids differently.
    async fn list(&self) -> Result<Vec<Value>, AppError> {
        let rows = sqlx::query("SELECT id, rev, body FROM documents ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(document_from_row).collect()
    }
}

/// Next revision token: generation bumped, fresh random suffix.
fn next_rev(current: Option<&str>) -> String {
    let generation = current
        .and_then(|rev| rev.split_once('-'))
        .and_then(|(generation, _)| generation.parse::<u64>().ok())
        .unwrap_or(0);

    format!("{}-{}", generation + 1, uuid::Uuid::new_v4().simple())
}

fn document_from_row(row: &SqliteRow) -> Result<Value, AppError> {
    let body: String = row.get("body");
    let mut doc: Map<String, Value> = serde_json::from_str(&body)?;
    doc.insert("_id".into(), Value::String(row.get("id")));
    doc.insert("_rev".into(), Value::String(row.get("rev")));
    Ok(Value::Object(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = SqliteStore::open(&temp_dir.path().join("docs.sqlite"))
            .await
            .expect("Failed to open store");
        store.ensure_database().await.expect("Failed to migrate");
        (store, temp_dir)
    }

    #[test]
    fn test_next_rev_bumps_generation() {
        assert!(next_rev(None).starts_with("1-"));
        assert!(next_rev(Some("1-abc")).starts_with("2-"));
        assert!(next_rev(Some("41-abc")).starts_with("42-"));
        assert!(next_rev(Some("garbage")).starts_with("1-"));
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_rev() {
        let (store, _dir) = open_store().await;

        let written = store.insert(json!({"setup": "a", "punchline": "b"})).await.unwrap();
        assert!(!written.id.is_empty());
        assert!(written.rev.starts_with("1-"));

        let doc = store.get(&written.id).await.unwrap().unwrap();
        assert_eq!(doc["_id"], written.id.as_str());
        assert_eq!(doc["_rev"], written.rev.as_str());
        assert_eq!(doc["setup"], "a");
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (store, _dir) = open_store().await;
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_requires_current_rev() {
        let (store, _dir) = open_store().await;

        let first = store.insert(json!({"_id": "j1", "setup": "a"})).await.unwrap();
        let second = store
            .insert(json!({"_id": "j1", "_rev": first.rev, "setup": "b"}))
            .await
            .unwrap();
        assert!(second.rev.starts_with("2-"));
        assert_ne!(first.rev, second.rev);

        let stale = store
            .insert(json!({"_id": "j1", "_rev": first.rev, "setup": "c"}))
            .await
            .unwrap_err();
        assert!(matches!(stale, AppError::Conflict(_)));

        let doc = store.get("j1").await.unwrap().unwrap();
        assert_eq!(doc["setup"], "b");
    }

    #[tokio::test]
    async fn test_create_existing_id_conflicts() {
        let (store, _dir) = open_store().await;

        store.insert(json!({"_id": "dup"})).await.unwrap();
        let err = store.insert(json!({"_id": "dup"})).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_in_id_order() {
        let (store, _dir) = open_store().await;

        for id in ["c", "a", "_design/views", "b"] {
            store.insert(json!({ "_id": id })).await.unwrap();
        }

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|doc| doc["_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["_design/views", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_list_orders_by_id_bytes() {
        let (store, _dir) = open_store().await;

        for id in ["b", "a", "B", "_design/views"] {
            store.insert(json!({ "_id": id })).await.unwrap();
        }

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|doc| doc["_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["B", "_design/views", "a", "b"]);
    }
}
