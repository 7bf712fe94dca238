//! CouchDB adapter over its HTTP API.

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use super::DocumentStore;
use crate::errors::AppError;
use crate::models::WriteResult;

/// Document store backed by a CouchDB database.
#[derive(Clone)]
pub struct CouchStore {
    client: Client,
    server: Url,
    db_name: String,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AllDocs {
    #[serde(default)]
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    #[serde(default)]
    doc: Option<Value>,
}

impl CouchStore {
    /// Build an adapter for `db_name` on the server at `url`.
    ///
    /// Credentials embedded in the URL are moved to basic auth.
    pub fn new(url: &str, db_name: &str) -> Result<Self, AppError> {
        let mut server = Url::parse(url)
            .map_err(|e| AppError::Internal(format!("Invalid CouchDB URL: {}", e)))?;

        let username = Some(decode_userinfo(server.username())?).filter(|u| !u.is_empty());
        let password = server.password().map(decode_userinfo).transpose()?;
        // Both setters only fail for URLs that cannot carry credentials at all.
        let _ = server.set_username("");
        let _ = server.set_password(None);

        Ok(Self {
            client: Client::new(),
            server,
            db_name: db_name.to_string(),
            username,
            password,
        })
    }

    #[cfg(test)]
    pub(crate) fn credentials(&self) -> (Option<&str>, Option<&str>) {
        (self.username.as_deref(), self.password.as_deref())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.server.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(format!("CouchDB URL cannot be a base: {}", self.server)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_ref()),
            None => request,
        }
    }

    async fn all_dbs(&self) -> Result<Vec<String>, AppError> {
        let url = self.url(&["_all_dbs"])?;
        let response = self.authed(self.client.get(url)).send().await?;
        Ok(check(response).await?.json().await?)
    }
}

/// URL user info arrives percent-encoded; basic auth wants the raw text.
fn decode_userinfo(raw: &str) -> Result<String, AppError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| AppError::Internal(format!("Invalid CouchDB credentials: {}", e)))
}

async fn check(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

/// Map a CouchDB error status onto the application taxonomy.
fn status_error(status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::CONFLICT => AppError::Conflict(format!("Document update conflict: {}", body)),
        StatusCode::NOT_FOUND => AppError::NotFound(format!("CouchDB: {}", body)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unavailable(format!(
            "CouchDB rejected credentials ({}): {}",
            status, body
        )),
        _ => AppError::Store(format!("CouchDB returned {}: {}", status, body)),
    }
}

#[async_trait]
impl DocumentStore for CouchStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.all_dbs().await.map(|_| ())
    }

    async fn ensure_database(&self) -> Result<(), AppError> {
        if self.all_dbs().await?.contains(&self.db_name) {
            return Ok(());
        }

        tracing::info!("Creating CouchDB database '{}'", self.db_name);
        let url = self.url(&[self.db_name.as_str()])?;
        let response = self.authed(self.client.put(url)).send().await?;

        // Another instance may have created it in the meantime.
        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Ok(());
        }
        check(response).await.map(|_| ())
    }

    async fn get(&self, id: &str) -> Result<Option<Value>, AppError> {
        let url = self.url(&[self.db_name.as_str(), id])?;
        let response = self.authed(self.client.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    async fn insert(&self, doc: Value) -> Result<WriteResult, AppError> {
        let request = match doc.get("_id").and_then(Value::as_str) {
            Some(id) => self.client.put(self.url(&[self.db_name.as_str(), id])?),
            None => self.client.post(self.url(&[self.db_name.as_str()])?),
        };

        let response = self.authed(request).json(&doc).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn list(&self) -> Result<Vec<Value>, AppError> {
        let mut url = self.url(&[self.db_name.as_str(), "_all_docs"])?;
        url.query_pairs_mut().append_pair("include_docs", "true");

        let response = self.authed(self.client.get(url)).send().await?;
        let all: AllDocs = check(response).await?.json().await?;

        Ok(all.rows.into_iter().filter_map(|row| row.doc).collect())
    }
}
