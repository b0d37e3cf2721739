use crate::error::ApiError;
use axum::{extract::rejection::JsonRejection, Json};
use axum_valid::{Valid, ValidRejection};

pub mod health;
pub mod movies;
pub mod reviews;
pub mod streams;
pub mod users;

/// A validated JSON body whose rejection is held back until the handler has
/// checked permissions. Extract it last and unwrap it with [`accept_body`].
pub type JsonBody<T> = Result<Valid<Json<T>>, ValidRejection<JsonRejection>>;

/// Unwrap a [`JsonBody`], turning a rejection into an [`ApiError`].
pub fn accept_body<T>(body: JsonBody<T>) -> Result<T, ApiError> {
    body.map(|Valid(Json(request))| request)
        .map_err(ApiError::from)
}
