use crate::auth::{authorize, AuthUser};
use crate::error::ApiError;
use crate::handlers::{accept_body, JsonBody};
use crate::schemas::{ApiResponse, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use compute::permissions::{Operation, Resource};
use compute::rating::{self, NewReview};
use model::entities::{review, user};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for reviewing a movie
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateReviewRequest {
    /// Rating from 1 to 5
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 250))]
    pub description: Option<String>,
    /// Whether the review is shown (default: true)
    pub active: Option<bool>,
}

/// Request body for replacing a review
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ReplaceReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 250))]
    pub description: Option<String>,
    pub active: Option<bool>,
}

/// Request body for partially updating a review
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    #[validate(length(max = 250))]
    pub description: Option<String>,
    pub active: Option<bool>,
}

impl From<ReplaceReviewRequest> for UpdateReviewRequest {
    fn from(request: ReplaceReviewRequest) -> Self {
        Self {
            rating: Some(request.rating),
            description: Some(request.description.unwrap_or_default()),
            active: Some(request.active.unwrap_or(true)),
        }
    }
}

/// Review response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub id: i32,
    pub rating: i32,
    pub active: bool,
    pub created: DateTime<Utc>,
    /// Time of the last modification
    pub update: DateTime<Utc>,
    pub description: Option<String>,
    /// Email of the review's author
    pub user: String,
    /// ID of the reviewed movie
    pub movie: i32,
}

impl ReviewResponse {
    pub fn new(model: review::Model, author_email: String) -> Self {
        Self {
            id: model.id,
            rating: model.rating,
            active: model.active,
            created: model.created,
            update: model.updated,
            description: model.description,
            user: author_email,
            movie: model.movie_id,
        }
    }
}

impl From<(review::Model, Option<user::Model>)> for ReviewResponse {
    fn from((model, author): (review::Model, Option<user::Model>)) -> Self {
        let email = author.map(|u| u.email).unwrap_or_default();
        Self::new(model, email)
    }
}

async fn find_review(
    state: &AppState,
    review_id: i32,
) -> Result<(review::Model, Option<user::Model>), ApiError> {
    review::Entity::find_by_id(review_id)
        .find_also_related(user::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            warn!("Review with ID {} not found", review_id);
            ApiError::not_found("Review", review_id)
        })
}

/// Review a movie
///
/// The rating is folded into the movie's running statistics in the same
/// transaction that stores the review. Each user may review a movie once.
#[utoipa::path(
    post,
    path = "/api/movie/{movie_id}/review-create",
    tag = "reviews",
    params(
        ("movie_id" = i32, Path, description = "Movie ID"),
    ),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created successfully", body = ApiResponse<ReviewResponse>),
        (status = 400, description = "Invalid rating or movie already reviewed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(movie_id): Path<i32>,
    body: JsonBody<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), ApiError> {
    trace!("Entering create_review function for movie_id: {}", movie_id);
    authorize(&user, Resource::Review, Operation::Create, None)?;
    let request = accept_body(body)?;

    let (review_model, movie_model) = rating::create_review(
        &state.db,
        user.id,
        movie_id,
        NewReview {
            rating: request.rating,
            description: request.description,
            active: request.active.unwrap_or(true),
        },
    )
    .await?;

    info!(
        "Review {} created, movie {} now rated {} over {} reviews",
        review_model.id, movie_model.id, movie_model.avg_rating, movie_model.number_rating
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ReviewResponse::new(review_model, user.email),
            "Review created successfully",
        )),
    ))
}

/// Get the reviews of a movie, newest first
#[utoipa::path(
    get,
    path = "/api/movie/{movie_id}/reviews",
    tag = "reviews",
    params(
        ("movie_id" = i32, Path, description = "Movie ID"),
    ),
    responses(
        (status = 200, description = "Reviews retrieved successfully", body = ApiResponse<Vec<ReviewResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_movie_reviews(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(movie_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<ReviewResponse>>>, ApiError> {
    trace!("Entering get_movie_reviews function for movie_id: {}", movie_id);

    let reviews = review::Entity::find()
        .filter(review::Column::MovieId.eq(movie_id))
        .order_by_desc(review::Column::Id)
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} reviews for movie {}", reviews.len(), movie_id);

    let data = reviews.into_iter().map(ReviewResponse::from).collect();
    Ok(Json(ApiResponse::ok(data, "Reviews retrieved successfully")))
}

/// Get the reviews written by the authenticated user
#[utoipa::path(
    get,
    path = "/api/movie/reviews",
    tag = "reviews",
    responses(
        (status = 200, description = "Reviews retrieved successfully", body = ApiResponse<Vec<ReviewResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_my_reviews(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<ReviewResponse>>>, ApiError> {
    trace!("Entering get_my_reviews function");

    let reviews = review::Entity::find()
        .filter(review::Column::UserId.eq(user.id))
        .order_by_desc(review::Column::Id)
        .all(&state.db)
        .await?;
    debug!("User {} has {} reviews", user.id, reviews.len());

    let data = reviews
        .into_iter()
        .map(|model| ReviewResponse::new(model, user.email.clone()))
        .collect();
    Ok(Json(ApiResponse::ok(data, "Reviews retrieved successfully")))
}

/// Get a specific review by ID
#[utoipa::path(
    get,
    path = "/api/movie/review/{review_id}",
    tag = "reviews",
    params(
        ("review_id" = i32, Path, description = "Review ID"),
    ),
    responses(
        (status = 200, description = "Review retrieved successfully", body = ApiResponse<ReviewResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<i32>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    trace!("Entering get_review function for review_id: {}", review_id);

    let found = find_review(&state, review_id).await?;
    Ok(Json(ApiResponse::ok(
        ReviewResponse::from(found),
        "Review retrieved successfully",
    )))
}

/// Replace a review (author only)
#[utoipa::path(
    put,
    path = "/api/movie/review/{review_id}",
    tag = "reviews",
    params(
        ("review_id" = i32, Path, description = "Review ID"),
    ),
    request_body = ReplaceReviewRequest,
    responses(
        (status = 200, description = "Review updated successfully", body = ApiResponse<ReviewResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Only the author may change the review", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn replace_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<i32>,
    body: JsonBody<ReplaceReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    trace!("Entering replace_review function for review_id: {}", review_id);
    apply_review_update(&state, &user, review_id, body).await
}

/// Partially update a review (author only)
///
/// Changing the rating does not touch the movie's rating statistics.
#[utoipa::path(
    patch,
    path = "/api/movie/review/{review_id}",
    tag = "reviews",
    params(
        ("review_id" = i32, Path, description = "Review ID"),
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated successfully", body = ApiResponse<ReviewResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Only the author may change the review", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user, body), fields(user_id = user.id))]
pub async fn update_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<i32>,
    body: JsonBody<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    trace!("Entering update_review function for review_id: {}", review_id);
    apply_review_update(&state, &user, review_id, body).await
}

async fn apply_review_update<T>(
    state: &AppState,
    user: &user::Model,
    review_id: i32,
    body: JsonBody<T>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError>
where
    T: Into<UpdateReviewRequest>,
{
    let (review_model, author) = find_review(state, review_id).await?;
    authorize(
        user,
        Resource::Review,
        Operation::Update,
        Some(review_model.user_id),
    )?;
    let request: UpdateReviewRequest = accept_body(body)?.into();

    let mut review_active: review::ActiveModel = review_model.into();
    let mut updated_fields = Vec::new();

    if let Some(rating) = request.rating {
        review_active.rating = Set(rating);
        updated_fields.push("rating");
    }
    if let Some(description) = request.description {
        review_active.description = Set(Some(description));
        updated_fields.push("description");
    }
    if let Some(active) = request.active {
        review_active.active = Set(active);
        updated_fields.push("active");
    }
    review_active.updated = Set(Utc::now());
    debug!("Updating review {} fields: {}", review_id, updated_fields.join(", "));

    let updated = review_active.update(&state.db).await?;

    info!("Review with ID {} updated successfully", review_id);
    Ok(Json(ApiResponse::ok(
        ReviewResponse::from((updated, author)),
        "Review updated successfully",
    )))
}

/// Delete a review (author only)
#[utoipa::path(
    delete,
    path = "/api/movie/review/{review_id}",
    tag = "reviews",
    params(
        ("review_id" = i32, Path, description = "Review ID"),
    ),
    responses(
        (status = 204, description = "Review deleted successfully"),
        (status = 403, description = "Only the author may delete the review", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    security(("token_auth" = []))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_review function for review_id: {}", review_id);

    let (review_model, _) = find_review(&state, review_id).await?;
    authorize(
        &user,
        Resource::Review,
        Operation::Delete,
        Some(review_model.user_id),
    )?;

    review::Entity::delete_by_id(review_id).exec(&state.db).await?;

    info!("Review with ID {} deleted successfully", review_id);
    Ok(StatusCode::NO_CONTENT)
}
