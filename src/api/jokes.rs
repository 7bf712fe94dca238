//! Joke API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::{json_body, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateJokeRequest, Joke, UpdateJokeRequest, UpdateResult, WriteResult};
use crate::AppState;

/// GET /jokes - List all jokes.
pub async fn list_jokes(State(state): State<AppState>) -> ApiResult<Json<Vec<Joke>>> {
    Ok(Json(state.jokes.list_jokes().await?))
}

/// GET /jokes/random - A random joke, not the one returned last time.
pub async fn random_joke(State(state): State<AppState>) -> ApiResult<Json<Joke>> {
    match state.jokes.random_joke().await? {
        Some(joke) => Ok(Json(joke)),
        None => Err(AppError::NotFound("No jokes available".to_string())),
    }
}

/// GET /jokes/:id - Get a single joke.
pub async fn get_joke(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Joke>> {
    match state.jokes.get_joke(&id).await? {
        Some(joke) => Ok(Json(joke)),
        None => Err(AppError::NotFound("Joke not found".to_string())),
    }
}

/// POST /jokes - Create a new joke.
pub async fn create_joke(
    State(state): State<AppState>,
    payload: Result<Json<CreateJokeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WriteResult>)> {
    let request = json_body(payload)?;
    let result = state.jokes.create_joke(request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// PUT /jokes/:id - Update a joke.
pub async fn update_joke(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateJokeRequest>, JsonRejection>,
) -> ApiResult<Json<UpdateResult>> {
    let changes = json_body(payload)?;
    match state.jokes.update_joke(&id, &changes).await {
        Ok(result) => Ok(Json(result)),
        Err(AppError::NotFound(_)) => Err(AppError::NotFound("Joke not found".to_string())),
        Err(e) => Err(e),
    }
}
