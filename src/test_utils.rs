use crate::auth::{self, NewUser};
use crate::router::create_router;
use crate::schemas::AppState;
use crate::storage::ImageStore;
use axum::http::HeaderValue;
use axum::Router;
use migration::{Migrator, MigratorTrait};
use model::entities::user;
use sea_orm::{Database, DatabaseConnection};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const TEST_PASSWORD: &str = "testpass123";

/// Create an in-memory SQLite database for testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// A fresh media root below the system temp directory.
pub fn temp_media_root() -> PathBuf {
    std::env::temp_dir().join(format!("moviedb-test-{}", uuid::Uuid::new_v4()))
}

/// Create AppState for testing
pub async fn setup_test_app_state() -> AppState {
    init_test_tracing();
    AppState {
        db: setup_test_db().await,
        images: ImageStore::new(temp_media_root()),
    }
}

/// Initialize tracing for tests with output captured by the test harness.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Only the first
/// call installs the subscriber.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Create axum app for testing
pub fn setup_test_app(state: &AppState) -> Router {
    create_router(state.clone())
}

/// Register a user and issue its token.
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    is_admin: bool,
) -> (user::Model, String) {
    let user_model = auth::register_user(
        db,
        NewUser {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            name: "Test Name".to_string(),
            is_admin,
        },
    )
    .await
    .expect("Failed to create test user");

    let token = auth::get_or_create_token(db, &user_model)
        .await
        .expect("Failed to issue test token");

    (user_model, token)
}

/// `Authorization` header value for `token`.
pub fn token_header(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Token {}", token)).expect("Invalid token header")
}
