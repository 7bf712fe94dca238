//! REST API module.
//!
//! Handlers only translate between HTTP and [`crate::service::JokeService`].

mod jokes;

pub use jokes::*;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::errors::AppError;

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<T, AppError>;

/// Unwrap a JSON body, turning extractor rejections into the common error body.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}
