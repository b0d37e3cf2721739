use crate::schemas::AppState;
use crate::storage::ImageStore;
use anyhow::{Context, Result};
use sea_orm::Database;
use std::path::PathBuf;

/// Database used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://moviedb.db?mode=rwc";
/// Directory uploads are stored under when `MEDIA_ROOT` is not set.
pub const DEFAULT_MEDIA_ROOT: &str = "./media";

/// Connect to the database and set up image storage under `media_root`
pub async fn initialize_app_state_with_url(
    database_url: &str,
    media_root: impl Into<PathBuf>,
) -> Result<AppState> {
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database at {}", database_url))?;

    let media_root = media_root.into();
    tracing::info!("Storing uploads under {}", media_root.display());

    Ok(AppState {
        db,
        images: ImageStore::new(media_root),
    })
}
