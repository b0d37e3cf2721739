use crate::handlers::{
    health::health_check,
    movies::{
        create_movie, delete_movie, get_movie, get_movies, replace_movie, update_movie,
        upload_movie_image,
    },
    reviews::{
        create_review, delete_review, get_movie_reviews, get_my_reviews, get_review,
        replace_review, update_review,
    },
    streams::{
        create_stream, delete_stream, get_stream, get_streams, replace_stream, update_stream,
    },
    users::{create_token, create_user, get_me, update_me},
};
use crate::schemas::{ApiDoc, AppState};
use crate::storage::MAX_IMAGE_UPLOAD_BYTES;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Accounts and tokens
        .route("/api/user/create", post(create_user))
        .route("/api/user/token", post(create_token))
        .route("/api/user/me", get(get_me).put(update_me).patch(update_me))
        // Streaming platforms
        .route("/api/movie/streams", get(get_streams).post(create_stream))
        .route(
            "/api/movie/streams/:stream_id",
            get(get_stream)
                .put(replace_stream)
                .patch(update_stream)
                .delete(delete_stream),
        )
        // Movies
        .route("/api/movie/movies", get(get_movies).post(create_movie))
        .route(
            "/api/movie/movies/:movie_id",
            get(get_movie)
                .put(replace_movie)
                .patch(update_movie)
                .delete(delete_movie),
        )
        .route(
            "/api/movie/movies/:movie_id/upload-image",
            post(upload_movie_image).layer(DefaultBodyLimit::max(MAX_IMAGE_UPLOAD_BYTES)),
        )
        // Reviews
        .route("/api/movie/:movie_id/review-create", post(create_review))
        .route("/api/movie/:movie_id/reviews", get(get_movie_reviews))
        .route("/api/movie/reviews", get(get_my_reviews))
        .route(
            "/api/movie/review/:review_id",
            get(get_review)
                .put(replace_review)
                .patch(update_review)
                .delete(delete_review),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
