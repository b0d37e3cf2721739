use crate::auth::{authorize, AuthUser};
use crate::error::ApiError;
use crate::handlers::{accept_body, reviews::ReviewResponse, JsonBody};
use crate::schemas::{ApiResponse, AppState};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use compute::permissions::{Operation, Resource};
use compute::rating::AVG_RATING_SCALE;
use model::entities::{movie, review, stream, user};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Name of the multipart field carrying the poster.
const IMAGE_FIELD: &str = "image";

/// Request body for creating or replacing a movie
///
/// Rating statistics are derived from reviews; `avg_rating` and
/// `number_rating` sent by clients are ignored.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateMovieRequest {
    #[validate(length(min = 1, max = 250))]
    pub title: String,
    #[validate(length(min = 1, max = 250))]
    pub story_line: String,
    /// ID of the stream the movie is available on
    pub platform: Option<i32>,
    /// Whether the movie is listed (default: true)
    pub active: Option<bool>,
}

/// Request body for partially updating a movie
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateMovieRequest {
    #[validate(length(min = 1, max = 250))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 250))]
    pub story_line: Option<String>,
    pub platform: Option<i32>,
    pub active: Option<bool>,
}

impl From<CreateMovieRequest> for UpdateMovieRequest {
    fn from(request: CreateMovieRequest) -> Self {
        Self {
            title: Some(request.title),
            story_line: Some(request.story_line),
            platform: request.platform,
            active: Some(request.active.unwrap_or(true)),
        }
    }
}

/// Movie summary, as returned by list endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovieResponse {
    pub id: i32,
    pub title: String,
    /// Poster path relative to the media root
    pub image: Option<String>,
    /// ID of the stream the movie is available on
    pub platform: Option<i32>,
    pub active: bool,
    pub avg_rating: Decimal,
    pub number_rating: i32,
    pub created: DateTime<Utc>,
}

impl From<movie::Model> for MovieResponse {
    fn from(model: movie::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            image: model.image,
            platform: model.platform_id,
            active: model.active,
            avg_rating: rating_for_display(model.avg_rating),
            number_rating: model.number_rating,
            created: model.created,
        }
    }
}

/// Full movie, including its story line and reviews
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovieDetailResponse {
    pub id: i32,
    pub title: String,
    pub image: Option<String>,
    pub platform: Option<i32>,
    pub active: bool,
    pub avg_rating: Decimal,
    pub number_rating: i32,
    pub created: DateTime<Utc>,
    pub story_line: String,
    pub reviews: Vec<ReviewResponse>,
}

impl MovieDetailResponse {
    fn new(model: movie::Model, reviews: Vec<ReviewResponse>) -> Self {
        Self {
            id: model.id,
            title: model.title,
            image: model.image,
            platform: model.platform_id,
            active: model.active,
            avg_rating: rating_for_display(model.avg_rating),
            number_rating: model.number_rating,
            created: model.created,
            story_line: model.story_line,
            reviews,
        }
    }
}

/// Result of a poster upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovieImageResponse {
    pub id: i32,
    pub image: Option<String>,
}

/// Multipart form accepted by the upload endpoint
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Ratings are always rendered with two decimal places.
fn rating_for_display(mut avg_rating: Decimal) -> Decimal {
    avg_rating.rescale(AVG_RATING_SCALE);
    avg_rating
}

async fn find_movie(state: &AppState, movie_id: i32) -> Result<movie::Model, ApiError> {
    movie::Entity::find_by_id(movie_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            warn!("Movie with ID {} not found", movie_id);
            ApiError::not_found("Movie", movie_id)
        })
}

async fn ensure_platform_exists(state: &AppState, platform_id: i32) -> Result<(), ApiError> {
    if stream::Entity::find_by_id(platform_id)
        .one(&state.db)
        .await?
        .is_none()
    {
        warn!("Movie references missing stream {}", platform_id);
        return Err(ApiError::Integrity(format!(
            "Stream with ID {} does not exist",
            platform_id
        )));
    }
    Ok(())
}

async fn movie_reviews(
    state: &AppState,
    movie_id: i32,
) -> Result<Vec<ReviewResponse>, ApiError> {
    let reviews = review::Entity::find()
        .filter(review::Column::MovieId.eq(movie_id))
        .order_by_desc(review::Column::Id)
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;
    Ok(reviews.into_iter().map(ReviewResponse::from).collect())
}

/// Get all movies, newest first
#[utoipa::path(
    get,
    path = "/api/movie/movies",
    tag = "movies",
    responses(
        (status = 200, description = "Movies retrieved successfully", body = ApiResponse<Vec<MovieResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_movies(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<MovieResponse>>>, ApiError> {
    trace!("Entering get_movies function");

    let movies = movie::Entity::find()
        .order_by_desc(movie::Column::Id)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} movies from database", movies.len());

    let data = movies.into_iter().map(MovieResponse::from).collect();
    Ok(Json(ApiResponse::ok(data, "Movies retrieved successfully")))
}

/// Create a new movie (admin only)
#[utoipa::path(
    post,
    path = "/api/movie/movies",
    tag = "movies",
    request_body = CreateMovieRequest,
    responses(
        (status = 201, description = "Movie created successfully", body = ApiResponse<MovieDetailResponse>),
        (status = 400, description = "Invalid request or unknown platform", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin privilege required", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_movie(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: JsonBody<CreateMovieRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MovieDetailResponse>>), ApiError> {
    trace!("Entering create_movie function");
    authorize(&user, Resource::Movie, Operation::Create, None)?;
    let request = accept_body(body)?;

    if let Some(platform_id) = request.platform {
        ensure_platform_exists(&state, platform_id).await?;
    }

    debug!(
        "Creating movie '{}' on platform {:?}",
        request.title, request.platform
    );
    let movie_model = movie::ActiveModel {
        user_id: Set(Some(user.id)),
        title: Set(request.title),
        image: Set(None),
        story_line: Set(request.story_line),
        platform_id: Set(request.platform),
        active: Set(request.active.unwrap_or(true)),
        avg_rating: Set(Decimal::new(0, AVG_RATING_SCALE)),
        number_rating: Set(0),
        created: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(
        "Movie created successfully with ID: {}, title: {}",
        movie_model.id, movie_model.title
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            MovieDetailResponse::new(movie_model, Vec::new()),
            "Movie created successfully",
        )),
    ))
}

/// Get a movie with its reviews
#[utoipa::path(
    get,
    path = "/api/movie/movies/{movie_id}",
    tag = "movies",
    params(
        ("movie_id" = i32, Path, description = "Movie ID"),
    ),
    responses(
        (status = 200, description = "Movie retrieved successfully", body = ApiResponse<MovieDetailResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_movie(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(movie_id): Path<i32>,
) -> Result<Json<ApiResponse<MovieDetailResponse>>, ApiError> {
    trace!("Entering get_movie function for movie_id: {}", movie_id);

    let movie_model = find_movie(&state, movie_id).await?;
    let reviews = movie_reviews(&state, movie_id).await?;
    debug!("Movie {} has {} reviews", movie_id, reviews.len());

    Ok(Json(ApiResponse::ok(
        MovieDetailResponse::new(movie_model, reviews),
        "Movie retrieved successfully",
    )))
}

/// Replace a movie (admin only)
#[utoipa::path(
    put,
    path = "/api/movie/movies/{movie_id}",
    tag = "movies",
    params(
        ("movie_id" = i32, Path, description = "Movie ID"),
    ),
    request_body = CreateMovieRequest,
    responses(
        (status = 200, description = "Movie updated successfully", body = ApiResponse<MovieDetailResponse>),
        (status = 400, description = "Invalid request or unknown platform", body = ErrorResponse),
        (status = 403, description = "Admin privilege required", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn replace_movie(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(movie_id): Path<i32>,
    body: JsonBody<CreateMovieRequest>,
) -> Result<Json<ApiResponse<MovieDetailResponse>>, ApiError> {
    trace!("Entering replace_movie function for movie_id: {}", movie_id);
    authorize(&user, Resource::Movie, Operation::Update, None)?;
    let request = accept_body(body)?;
    apply_movie_update(&state, movie_id, request.into()).await
}

/// Partially update a movie (admin only)
#[utoipa::path(
    patch,
    path = "/api/movie/movies/{movie_id}",
    tag = "movies",
    params(
        ("movie_id" = i32, Path, description = "Movie ID"),
    ),
    request_body = UpdateMovieRequest,
    responses(
        (status = 200, description = "Movie updated successfully", body = ApiResponse<MovieDetailResponse>),
        (status = 400, description = "Invalid request or unknown platform", body = ErrorResponse),
        (status = 403, description = "Admin privilege required", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn update_movie(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(movie_id): Path<i32>,
    body: JsonBody<UpdateMovieRequest>,
) -> Result<Json<ApiResponse<MovieDetailResponse>>, ApiError> {
    trace!("Entering update_movie function for movie_id: {}", movie_id);
    authorize(&user, Resource::Movie, Operation::Update, None)?;
    let request = accept_body(body)?;
    apply_movie_update(&state, movie_id, request).await
}

async fn apply_movie_update(
    state: &AppState,
    movie_id: i32,
    request: UpdateMovieRequest,
) -> Result<Json<ApiResponse<MovieDetailResponse>>, ApiError> {
    let movie_model = find_movie(state, movie_id).await?;
    let mut movie_active: movie::ActiveModel = movie_model.into();
    let mut updated_fields = Vec::new();

    if let Some(title) = request.title {
        movie_active.title = Set(title);
        updated_fields.push("title");
    }
    if let Some(story_line) = request.story_line {
        movie_active.story_line = Set(story_line);
        updated_fields.push("story_line");
    }
    if let Some(platform_id) = request.platform {
        ensure_platform_exists(state, platform_id).await?;
        movie_active.platform_id = Set(Some(platform_id));
        updated_fields.push("platform");
    }
    if let Some(active) = request.active {
        movie_active.active = Set(active);
        updated_fields.push("active");
    }
    debug!("Updating movie {} fields: {}", movie_id, updated_fields.join(", "));

    let updated = movie_active.update(&state.db).await?;
    let reviews = movie_reviews(state, movie_id).await?;

    info!("Movie with ID {} updated successfully", movie_id);
    Ok(Json(ApiResponse::ok(
        MovieDetailResponse::new(updated, reviews),
        "Movie updated successfully",
    )))
}

/// Delete a movie and its reviews (admin only)
#[utoipa::path(
    delete,
    path = "/api/movie/movies/{movie_id}",
    tag = "movies",
    params(
        ("movie_id" = i32, Path, description = "Movie ID"),
    ),
    responses(
        (status = 204, description = "Movie deleted successfully"),
        (status = 403, description = "Admin privilege required", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_movie(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(movie_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_movie function for movie_id: {}", movie_id);
    authorize(&user, Resource::Movie, Operation::Delete, None)?;

    let result = movie::Entity::delete_by_id(movie_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        warn!("Movie with ID {} not found for deletion", movie_id);
        return Err(ApiError::not_found("Movie", movie_id));
    }

    info!("Movie with ID {} deleted successfully", movie_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Upload a poster for a movie
///
/// Expects a multipart form with the file in the `image` field. The payload
/// must decode as an image; it is stored under a random file name keeping
/// the original extension.
#[utoipa::path(
    post,
    path = "/api/movie/movies/{movie_id}/upload-image",
    tag = "movies",
    params(
        ("movie_id" = i32, Path, description = "Movie ID"),
    ),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image uploaded successfully", body = ApiResponse<MovieImageResponse>),
        (status = 400, description = "Missing or invalid image", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user, multipart), fields(user_id = user.id))]
pub async fn upload_movie_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(movie_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<MovieImageResponse>>, ApiError> {
    trace!("Entering upload_movie_image function for movie_id: {}", movie_id);
    authorize(&user, Resource::Movie, Operation::UploadImage, None)?;

    let movie_model = find_movie(&state, movie_id).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Rejected multipart body: {}", e);
        ApiError::from(e)
    })? {
        if field.name() != Some(IMAGE_FIELD) {
            trace!("Skipping multipart field {:?}", field.name());
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(ApiError::from)?;
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        debug!("Upload request without an '{}' field", IMAGE_FIELD);
        return Err(ApiError::Validation("No file was submitted.".to_string()));
    };
    if bytes.is_empty() {
        return Err(ApiError::Validation("The submitted file is empty.".to_string()));
    }

    let stored_path = state.images.save_movie_image(&filename, bytes).await?;

    let mut movie_active: movie::ActiveModel = movie_model.into();
    movie_active.image = Set(Some(stored_path));
    let updated = movie_active.update(&state.db).await.map_err(|e| {
        error!("Failed to record image for movie {}: {}", movie_id, e);
        ApiError::from(e)
    })?;

    info!("Image uploaded for movie {}: {:?}", movie_id, updated.image);
    Ok(Json(ApiResponse::ok(
        MovieImageResponse {
            id: updated.id,
            image: updated.image,
        },
        "Image uploaded successfully",
    )))
}
