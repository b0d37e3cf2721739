use crate::auth::{authorize, AuthUser};
use crate::error::ApiError;
use crate::handlers::{accept_body, movies::MovieResponse, JsonBody};
use crate::schemas::{ApiResponse, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use compute::permissions::{Operation, Resource};
use model::entities::{movie, stream};
use sea_orm::{ActiveModelTrait, EntityTrait, LoaderTrait, ModelTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating or replacing a stream
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateStreamRequest {
    /// Platform name, e.g. "Netflix"
    #[validate(length(min = 1, max = 250))]
    pub name: String,
    /// Short description of the platform
    #[validate(length(min = 1, max = 250))]
    pub about: String,
    /// Platform website
    #[validate(url, length(max = 250))]
    pub website: String,
}

/// Request body for partially updating a stream
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateStreamRequest {
    #[validate(length(min = 1, max = 250))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 250))]
    pub about: Option<String>,
    #[validate(url, length(max = 250))]
    pub website: Option<String>,
}

impl From<CreateStreamRequest> for UpdateStreamRequest {
    fn from(request: CreateStreamRequest) -> Self {
        Self {
            name: Some(request.name),
            about: Some(request.about),
            website: Some(request.website),
        }
    }
}

/// Stream response model, with the movies available on it
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StreamResponse {
    pub id: i32,
    pub name: String,
    pub about: String,
    pub website: String,
    pub movies: Vec<MovieResponse>,
}

impl StreamResponse {
    fn new(model: stream::Model, movies: Vec<movie::Model>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            about: model.about,
            website: model.website,
            movies: movies.into_iter().map(MovieResponse::from).collect(),
        }
    }
}

async fn find_stream(state: &AppState, stream_id: i32) -> Result<stream::Model, ApiError> {
    stream::Entity::find_by_id(stream_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            warn!("Stream with ID {} not found", stream_id);
            ApiError::not_found("Stream", stream_id)
        })
}

/// Get all streams, ordered by name descending
#[utoipa::path(
    get,
    path = "/api/movie/streams",
    tag = "streams",
    responses(
        (status = 200, description = "Streams retrieved successfully", body = ApiResponse<Vec<StreamResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_streams(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<StreamResponse>>>, ApiError> {
    trace!("Entering get_streams function");

    let streams = stream::Entity::find()
        .order_by_desc(stream::Column::Name)
        .all(&state.db)
        .await?;
    let movies = streams.load_many(movie::Entity, &state.db).await?;
    debug!("Retrieved {} streams from database", streams.len());

    let data: Vec<StreamResponse> = streams
        .into_iter()
        .zip(movies)
        .map(|(stream_model, movies)| StreamResponse::new(stream_model, movies))
        .collect();

    Ok(Json(ApiResponse::ok(data, "Streams retrieved successfully")))
}

/// Create a new stream (admin only)
#[utoipa::path(
    post,
    path = "/api/movie/streams",
    tag = "streams",
    request_body = CreateStreamRequest,
    responses(
        (status = 201, description = "Stream created successfully", body = ApiResponse<StreamResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin privilege required", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_stream(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: JsonBody<CreateStreamRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StreamResponse>>), ApiError> {
    trace!("Entering create_stream function");
    authorize(&user, Resource::Stream, Operation::Create, None)?;
    let request = accept_body(body)?;

    debug!("Creating stream with name: {}", request.name);
    let stream_model = stream::ActiveModel {
        user_id: Set(Some(user.id)),
        name: Set(request.name),
        about: Set(request.about),
        website: Set(request.website),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(
        "Stream created successfully with ID: {}, name: {}",
        stream_model.id, stream_model.name
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            StreamResponse::new(stream_model, Vec::new()),
            "Stream created successfully",
        )),
    ))
}

/// Get a specific stream by ID
#[utoipa::path(
    get,
    path = "/api/movie/streams/{stream_id}",
    tag = "streams",
    params(
        ("stream_id" = i32, Path, description = "Stream ID"),
    ),
    responses(
        (status = 200, description = "Stream retrieved successfully", body = ApiResponse<StreamResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Stream not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_stream(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(stream_id): Path<i32>,
) -> Result<Json<ApiResponse<StreamResponse>>, ApiError> {
    trace!("Entering get_stream function for stream_id: {}", stream_id);

    let stream_model = find_stream(&state, stream_id).await?;
    let movies = stream_model
        .find_related(movie::Entity)
        .order_by_desc(movie::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse::ok(
        StreamResponse::new(stream_model, movies),
        "Stream retrieved successfully",
    )))
}

/// Replace a stream (admin only)
#[utoipa::path(
    put,
    path = "/api/movie/streams/{stream_id}",
    tag = "streams",
    params(
        ("stream_id" = i32, Path, description = "Stream ID"),
    ),
    request_body = CreateStreamRequest,
    responses(
        (status = 200, description = "Stream updated successfully", body = ApiResponse<StreamResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Admin privilege required", body = ErrorResponse),
        (status = 404, description = "Stream not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn replace_stream(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(stream_id): Path<i32>,
    body: JsonBody<CreateStreamRequest>,
) -> Result<Json<ApiResponse<StreamResponse>>, ApiError> {
    trace!("Entering replace_stream function for stream_id: {}", stream_id);
    authorize(&user, Resource::Stream, Operation::Update, None)?;
    let request = accept_body(body)?;
    apply_stream_update(&state, stream_id, request.into()).await
}

/// Partially update a stream (admin only)
#[utoipa::path(
    patch,
    path = "/api/movie/streams/{stream_id}",
    tag = "streams",
    params(
        ("stream_id" = i32, Path, description = "Stream ID"),
    ),
    request_body = UpdateStreamRequest,
    responses(
        (status = 200, description = "Stream updated successfully", body = ApiResponse<StreamResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Admin privilege required", body = ErrorResponse),
        (status = 404, description = "Stream not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn update_stream(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(stream_id): Path<i32>,
    body: JsonBody<UpdateStreamRequest>,
) -> Result<Json<ApiResponse<StreamResponse>>, ApiError> {
    trace!("Entering update_stream function for stream_id: {}", stream_id);
    authorize(&user, Resource::Stream, Operation::Update, None)?;
    let request = accept_body(body)?;
    apply_stream_update(&state, stream_id, request).await
}

async fn apply_stream_update(
    state: &AppState,
    stream_id: i32,
    request: UpdateStreamRequest,
) -> Result<Json<ApiResponse<StreamResponse>>, ApiError> {
    let stream_model = find_stream(state, stream_id).await?;
    let mut stream_active: stream::ActiveModel = stream_model.into();
    let mut updated_fields = Vec::new();

    if let Some(name) = request.name {
        stream_active.name = Set(name);
        updated_fields.push("name");
    }
    if let Some(about) = request.about {
        stream_active.about = Set(about);
        updated_fields.push("about");
    }
    if let Some(website) = request.website {
        stream_active.website = Set(website);
        updated_fields.push("website");
    }
    debug!("Updating stream {} fields: {}", stream_id, updated_fields.join(", "));

    let updated = stream_active.update(&state.db).await?;
    let movies = updated.find_related(movie::Entity).all(&state.db).await?;

    info!("Stream with ID {} updated successfully", stream_id);
    Ok(Json(ApiResponse::ok(
        StreamResponse::new(updated, movies),
        "Stream updated successfully",
    )))
}

/// Delete a stream and its movies (admin only)
#[utoipa::path(
    delete,
    path = "/api/movie/streams/{stream_id}",
    tag = "streams",
    params(
        ("stream_id" = i32, Path, description = "Stream ID"),
    ),
    responses(
        (status = 204, description = "Stream deleted successfully"),
        (status = 403, description = "Admin privilege required", body = ErrorResponse),
        (status = 404, description = "Stream not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_stream(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(stream_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_stream function for stream_id: {}", stream_id);
    authorize(&user, Resource::Stream, Operation::Delete, None)?;

    let result = stream::Entity::delete_by_id(stream_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        warn!("Stream with ID {} not found for deletion", stream_id);
        return Err(ApiError::not_found("Stream", stream_id));
    }

    info!("Stream with ID {} deleted successfully", stream_id);
    Ok(StatusCode::NO_CONTENT)
}
