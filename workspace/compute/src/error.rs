use thiserror::Error;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The referenced record does not exist
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// The user already reviewed the movie
    #[error("User {user_id} has already reviewed movie {movie_id}")]
    DuplicateReview { user_id: i32, movie_id: i32 },

    /// A field failed validation
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
