use crate::auth::run_blocking;
use crate::error::ApiError;
use axum::body::Bytes;
use model::entities::movie;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Largest request body accepted by the poster upload route.
pub const MAX_IMAGE_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Writes uploaded movie posters below a media root directory.
#[derive(Clone, Debug)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a stored path such as `uploads/movie/<id>.jpg`.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Validate that `bytes` decode as an image and store them.
    ///
    /// Returns the path relative to the media root. Payloads that are not a
    /// decodable image fail with [`ApiError::Validation`] and nothing is
    /// written. Decoding runs on the blocking pool.
    pub async fn save_movie_image(&self, filename: &str, bytes: Bytes) -> Result<String, ApiError> {
        let payload = bytes.clone();
        let decoded = run_blocking(move || image::load_from_memory(&payload).map(|_| ())).await?;
        if let Err(e) = decoded {
            warn!("Rejected upload '{}': {}", filename, e);
            return Err(ApiError::Validation(
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                    .to_string(),
            ));
        }

        let relative = movie::image_file_path(filename);
        let target = self.resolve(&relative);
        debug!("Writing {} bytes to {}", bytes.len(), target.display());

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to create media directory: {}", e)))?;
        }
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to store image: {}", e)))?;

        info!("Stored image at {}", relative);
        Ok(relative)
    }
}
