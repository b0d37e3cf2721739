use crate::auth::{self, AuthUser, NewUser};
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState};
use axum::{extract::State, http::StatusCode, response::Json};
use axum_valid::Valid;
use model::entities::user;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for registering a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Email address, used to log in (must be unique)
    #[validate(email, length(max = 250))]
    pub email: String,
    /// Password, at least 5 characters
    #[validate(length(min = 5))]
    pub password: String,
    /// Display name
    #[serde(default)]
    #[validate(length(max = 250))]
    pub name: String,
}

/// Request body for obtaining an auth token
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TokenRequest {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for updating the authenticated user's profile
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(email, length(max = 250))]
    pub email: Option<String>,
    #[validate(length(min = 5))]
    pub password: Option<String>,
    #[validate(length(max = 250))]
    pub name: Option<String>,
}

/// Public view of a user. The password is never included.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            email: model.email,
            name: model.name,
        }
    }
}

/// Token issued by the token endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/user/create",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(email = %request.email))]
pub async fn create_user(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateUserRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    trace!("Entering create_user function");

    let user_model = auth::register_user(
        &state.db,
        NewUser {
            email: request.email,
            password: request.password,
            name: request.name,
            is_admin: false,
        },
    )
    .await?;

    info!("User created successfully with ID: {}", user_model.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            UserResponse::from(user_model),
            "User created successfully",
        )),
    ))
}

/// Exchange credentials for an auth token
#[utoipa::path(
    post,
    path = "/api/user/token",
    tag = "users",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Unable to authenticate with provided credentials", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(email = %request.email))]
pub async fn create_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    trace!("Entering create_token function");

    if request.email.trim().is_empty() || request.password.is_empty() {
        debug!("Token request with blank credentials");
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let Some(user_model) = auth::authenticate(&state.db, &request.email, &request.password).await?
    else {
        warn!("Token request with invalid credentials");
        return Err(ApiError::Validation(
            "Unable to authenticate with provided credentials".to_string(),
        ));
    };

    let token = auth::get_or_create_token(&state.db, &user_model).await?;
    info!("Token handed out to user {}", user_model.id);
    Ok(Json(ApiResponse::ok(
        TokenResponse { token },
        "Token issued successfully",
    )))
}

/// Retrieve the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/user/me",
    tag = "users",
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_me(
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    debug!("Returning profile");
    Ok(Json(ApiResponse::ok(
        UserResponse::from(user),
        "Profile retrieved successfully",
    )))
}

/// Update the authenticated user's profile
///
/// Serves both PUT and PATCH; only the supplied fields change. A new password
/// is hashed before it is stored.
#[utoipa::path(
    patch,
    path = "/api/user/me",
    tag = "users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Valid(Json(request)): Valid<Json<UpdateUserRequest>>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering update_me function");

    let user_id = user.id;
    let mut user_active: user::ActiveModel = user.into();
    let mut updated_fields = Vec::new();

    if let Some(email) = request.email {
        let email = user::normalize_email(&email);
        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .filter(user::Column::Id.ne(user_id))
            .one(&state.db)
            .await?;
        if taken.is_some() {
            return Err(ApiError::Integrity(
                "User with this email already exists".to_string(),
            ));
        }
        user_active.email = Set(email);
        updated_fields.push("email");
    }
    if let Some(name) = request.name {
        user_active.name = Set(name);
        updated_fields.push("name");
    }
    if let Some(password) = request.password {
        user_active.password_hash = Set(auth::hash_password(&password).await?);
        updated_fields.push("password");
    }

    if updated_fields.is_empty() {
        debug!("No fields to update for user ID: {}", user_id);
    } else {
        debug!("Updating fields: {}", updated_fields.join(", "));
    }

    let updated_user = user_active.update(&state.db).await?;
    info!("User with ID {} updated its profile", user_id);
    Ok(Json(ApiResponse::ok(
        UserResponse::from(updated_user),
        "Profile updated successfully",
    )))
}
