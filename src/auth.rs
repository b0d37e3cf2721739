//! Password hashing, token issuance and the authenticated-user extractor.

use crate::error::ApiError;
use crate::schemas::AppState;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use compute::permissions::{is_allowed, Actor, Operation, Resource};
use model::entities::{auth_token, user};
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
};
use tracing::{debug, info, trace, warn};

/// Shortest password accepted for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Scheme expected in the `Authorization` header: `Token <key>`.
pub const TOKEN_SCHEME: &str = "Token";

const TOKEN_BYTES: usize = 20;

/// Hash a password with Argon2id into a PHC string on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, ApiError> {
    let password = password.to_owned();
    run_blocking(move || hash_password_blocking(&password)).await?
}

/// Verify a password against a stored PHC hash on the blocking pool.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, ApiError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    run_blocking(move || verify_password_blocking(&password, &password_hash)).await?
}

fn hash_password_blocking(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password_blocking(password: &str, password_hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| ApiError::Internal(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

/// Run CPU-bound work on tokio's blocking pool, reporting a panicked or
/// cancelled task as an internal error.
pub async fn run_blocking<F, R>(work: F) -> Result<R, ApiError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))
}

/// Generate a new random token key: 40 lowercase hex characters.
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Fields required to register an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Grants staff and superuser flags.
    pub is_admin: bool,
}

/// Validate and insert a new user. The email is normalized and the password
/// hashed before anything is written.
pub async fn register_user<C>(db: &C, new_user: NewUser) -> Result<user::Model, ApiError>
where
    C: ConnectionTrait,
{
    let email = user::normalize_email(&new_user.email);
    if email.is_empty() {
        return Err(ApiError::Validation(
            "User must have an email address".to_string(),
        ));
    }
    if new_user.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        warn!("Registration rejected, email already in use");
        return Err(ApiError::Integrity(
            "User with this email already exists".to_string(),
        ));
    }

    let user_model = user::ActiveModel {
        email: Set(email),
        name: Set(new_user.name),
        password_hash: Set(hash_password(&new_user.password).await?),
        is_active: Set(true),
        is_staff: Set(new_user.is_admin),
        is_superuser: Set(new_user.is_admin),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Registered user with ID {}", user_model.id);
    Ok(user_model)
}

/// Look up an active user by email and check the password.
///
/// Returns `None` when the email is unknown, the account is inactive or the
/// password does not match.
pub async fn authenticate<C>(
    db: &C,
    email: &str,
    password: &str,
) -> Result<Option<user::Model>, ApiError>
where
    C: ConnectionTrait,
{
    let email = user::normalize_email(email);
    let Some(user_model) = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
    else {
        debug!("No user with the given email");
        return Ok(None);
    };

    if !user_model.is_active {
        debug!("User {} is inactive", user_model.id);
        return Ok(None);
    }

    if verify_password(password, &user_model.password_hash).await? {
        Ok(Some(user_model))
    } else {
        debug!("Password mismatch for user {}", user_model.id);
        Ok(None)
    }
}

/// Return the user's token, issuing one on first use.
pub async fn get_or_create_token<C>(db: &C, user_model: &user::Model) -> Result<String, ApiError>
where
    C: ConnectionTrait,
{
    if let Some(token) = user_model
        .find_related(auth_token::Entity)
        .one(db)
        .await?
    {
        trace!("Reusing existing token for user {}", user_model.id);
        return Ok(token.key);
    }

    let token = auth_token::ActiveModel {
        key: Set(generate_token_key()),
        user_id: Set(user_model.id),
        created: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Issued token for user {}", user_model.id);
    Ok(token.key)
}

/// The user behind the request's `Authorization: Token <key>` header.
///
/// Rejects with 401 when the header is missing or malformed, the token is
/// unknown, or its user is inactive.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let key = parse_token_header(header).ok_or_else(|| {
            debug!("Malformed authorization header");
            ApiError::Unauthorized
        })?;

        let found = auth_token::Entity::find()
            .filter(auth_token::Column::Key.eq(key))
            .find_also_related(user::Entity)
            .one(&state.db)
            .await?;

        match found {
            Some((_, Some(user_model))) if user_model.is_active => {
                trace!("Authenticated user {}", user_model.id);
                Ok(AuthUser(user_model))
            }
            _ => {
                debug!("Rejected unknown token or inactive user");
                Err(ApiError::Unauthorized)
            }
        }
    }
}

/// Check the capability table for `user`, failing with [`ApiError::Forbidden`].
pub fn authorize(
    user: &user::Model,
    resource: Resource,
    operation: Operation,
    owner_id: Option<i32>,
) -> Result<(), ApiError> {
    if is_allowed(&Actor::from(user), resource, operation, owner_id) {
        Ok(())
    } else {
        warn!(
            "User {} may not {:?} {:?} (owner {:?})",
            user.id, operation, resource, owner_id
        );
        Err(ApiError::Forbidden)
    }
}

fn parse_token_header(header: &str) -> Option<&str> {
    let (scheme, key) = header.trim().split_once(' ')?;
    let key = key.trim();
    (scheme.eq_ignore_ascii_case(TOKEN_SCHEME) && !key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_password_hash_roundtrip() {
        let hash = hash_password("testpass123").await.unwrap();
        assert_ne!(hash, "testpass123");
        assert!(verify_password("testpass123", &hash).await.unwrap());
        assert!(!verify_password("wrongpass", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_rejects_malformed_hash() {
        let result = verify_password("testpass123", "not-a-phc-string").await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[tokio::test]
    async fn test_run_blocking_reports_panics() {
        let result = run_blocking(|| -> u8 { panic!("worker died") }).await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[test]
    fn test_token_key_format() {
        let key = generate_token_key();
        assert_eq!(key.len(), TOKEN_BYTES * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, generate_token_key());
    }

    #[test]
    fn test_parse_token_header() {
        assert_eq!(parse_token_header("Token abc123"), Some("abc123"));
        assert_eq!(parse_token_header("token abc123"), Some("abc123"));
        assert_eq!(parse_token_header("Bearer abc123"), None);
        assert_eq!(parse_token_header("Token "), None);
        assert_eq!(parse_token_header("abc123"), None);
    }
}
