use crate::storage::ImageStore;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Storage for uploaded movie posters
    pub images: ImageStore,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: &str) -> Self {
        Self {
            data,
            message: message.to_string(),
            success: true,
        }
    }
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
    /// Directory uploaded images are written to
    pub media_root: String,
}

struct TokenAuthAddon;

impl Modify for TokenAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "token_auth",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "Token authentication, e.g. `Token 9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b`",
            ))),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::create_user,
        crate::handlers::users::create_token,
        crate::handlers::users::get_me,
        crate::handlers::users::update_me,
        crate::handlers::streams::get_streams,
        crate::handlers::streams::create_stream,
        crate::handlers::streams::get_stream,
        crate::handlers::streams::replace_stream,
        crate::handlers::streams::update_stream,
        crate::handlers::streams::delete_stream,
        crate::handlers::movies::get_movies,
        crate::handlers::movies::create_movie,
        crate::handlers::movies::get_movie,
        crate::handlers::movies::replace_movie,
        crate::handlers::movies::update_movie,
        crate::handlers::movies::delete_movie,
        crate::handlers::movies::upload_movie_image,
        crate::handlers::reviews::create_review,
        crate::handlers::reviews::get_movie_reviews,
        crate::handlers::reviews::get_my_reviews,
        crate::handlers::reviews::get_review,
        crate::handlers::reviews::replace_review,
        crate::handlers::reviews::update_review,
        crate::handlers::reviews::delete_review,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::TokenRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::UserResponse,
            crate::handlers::users::TokenResponse,
            crate::handlers::streams::CreateStreamRequest,
            crate::handlers::streams::UpdateStreamRequest,
            crate::handlers::streams::StreamResponse,
            crate::handlers::movies::CreateMovieRequest,
            crate::handlers::movies::UpdateMovieRequest,
            crate::handlers::movies::MovieResponse,
            crate::handlers::movies::MovieDetailResponse,
            crate::handlers::movies::MovieImageResponse,
            crate::handlers::movies::ImageUploadForm,
            crate::handlers::reviews::CreateReviewRequest,
            crate::handlers::reviews::ReplaceReviewRequest,
            crate::handlers::reviews::UpdateReviewRequest,
            crate::handlers::reviews::ReviewResponse,
        )
    ),
    modifiers(&TokenAuthAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Accounts, tokens and profiles"),
        (name = "streams", description = "Streaming platforms"),
        (name = "movies", description = "Movies and posters"),
        (name = "reviews", description = "Movie reviews and ratings"),
    ),
    info(
        title = "MovieDB API",
        description = "Movie review service: streaming platforms, movies, reviews and running ratings",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
