//! Business rules for jokes.
//!
//! Validates input, stamps creation time and turns repository results into the
//! signals the handlers map to status codes.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use crate::db::JokeRepository;
use crate::errors::AppError;
use crate::models::{CreateJokeRequest, Joke, NewJoke, UpdateJokeRequest, UpdateResult, WriteResult};

/// Joke operations exposed to the HTTP layer.
#[derive(Clone)]
pub struct JokeService {
    repo: Arc<JokeRepository>,
}

impl JokeService {
    pub fn new(repo: Arc<JokeRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_jokes(&self) -> Result<Vec<Joke>, AppError> {
        self.repo.list_jokes().await
    }

    pub async fn get_joke(&self, id: &str) -> Result<Option<Joke>, AppError> {
        self.repo.get_joke(id).await
    }

    pub async fn random_joke(&self) -> Result<Option<Joke>, AppError> {
        self.repo.random_joke().await
    }

    /// Validate and store a new joke.
    ///
    /// Both `setup` and `punchline` must be non-empty. Trimming is left to the
    /// caller. `createdAt` defaults to now.
    pub async fn create_joke(&self, request: CreateJokeRequest) -> Result<WriteResult, AppError> {
        if request.setup.is_empty() || request.punchline.is_empty() {
            return Err(AppError::Validation(
                "Setup and punchline are required".to_string(),
            ));
        }

        let created_at = request
            .created_at
            .filter(|ts| !ts.is_empty())
            .unwrap_or_else(now_iso8601);

        let joke = NewJoke {
            setup: request.setup,
            punchline: request.punchline,
            created_at,
        };

        let result = self.repo.create_joke(&joke).await?;
        tracing::info!("Created joke {}", result.id);
        Ok(result)
    }

    /// Apply a partial update. Fields are not validated.
    pub async fn update_joke(
        &self,
        id: &str,
        changes: &UpdateJokeRequest,
    ) -> Result<UpdateResult, AppError> {
        let result = self.repo.update_joke(id, changes).await?;
        tracing::info!("Updated joke {} to revision {}", result.id, result.rev);
        Ok(result.into())
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
