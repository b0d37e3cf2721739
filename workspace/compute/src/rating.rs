//! Running rating statistics kept on each movie.
//!
//! A movie's `avg_rating` and `number_rating` are a fold over the ratings of
//! its reviews, applied one review at a time as reviews are created. The fold
//! is *not* an arithmetic mean: every new rating is averaged with the previous
//! average, so the latest review always carries half of the weight. Existing
//! data was produced with this formula and it is kept as is.

use chrono::Utc;
use model::entities::{movie, review};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{ComputeError, Result};

/// Number of decimal places kept for `avg_rating`.
pub const AVG_RATING_SCALE: u32 = 2;

/// Derived rating statistics of a movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingSummary {
    pub avg_rating: Decimal,
    pub number_rating: i32,
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self {
            avg_rating: Decimal::ZERO,
            number_rating: 0,
        }
    }
}

impl From<&movie::Model> for RatingSummary {
    fn from(movie: &movie::Model) -> Self {
        Self {
            avg_rating: movie.avg_rating,
            number_rating: movie.number_rating,
        }
    }
}

impl RatingSummary {
    /// Returns the statistics after one more review with `rating`.
    pub fn record(self, rating: i32) -> Self {
        let rating = Decimal::from(rating);
        let avg_rating = if self.number_rating == 0 {
            rating
        } else {
            (self.avg_rating + rating) / Decimal::TWO
        };

        Self {
            avg_rating: quantize(avg_rating),
            number_rating: self.number_rating + 1,
        }
    }
}

/// Applies `ratings` in order, starting from a movie without reviews.
pub fn fold_ratings<I>(ratings: I) -> RatingSummary
where
    I: IntoIterator<Item = i32>,
{
    ratings
        .into_iter()
        .fold(RatingSummary::default(), RatingSummary::record)
}

fn quantize(value: Decimal) -> Decimal {
    let mut value =
        value.round_dp_with_strategy(AVG_RATING_SCALE, RoundingStrategy::MidpointNearestEven);
    value.rescale(AVG_RATING_SCALE);
    value
}

/// Fields of a review supplied by its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub rating: i32,
    pub description: Option<String>,
    pub active: bool,
}

/// Creates a review by `user_id` for `movie_id` and folds its rating into the
/// movie's statistics.
///
/// Both writes happen in one transaction; on any error neither is visible.
/// Fails with [`ComputeError::NotFound`] for an unknown movie,
/// [`ComputeError::Validation`] for a rating outside 1..=5 and
/// [`ComputeError::DuplicateReview`] when the user already reviewed the movie.
#[instrument(skip(db, new_review), fields(rating = new_review.rating))]
pub async fn create_review<C>(
    db: &C,
    user_id: i32,
    movie_id: i32,
    new_review: NewReview,
) -> Result<(review::Model, movie::Model)>
where
    C: TransactionTrait,
{
    if !review::is_valid_rating(new_review.rating) {
        warn!("Rejecting rating {} outside of the accepted range", new_review.rating);
        return Err(ComputeError::Validation(format!(
            "rating must be between {} and {}",
            review::MIN_RATING,
            review::MAX_RATING
        )));
    }

    let txn = db.begin().await?;

    let movie = movie::Entity::find_by_id(movie_id)
        .one(&txn)
        .await?
        .ok_or(ComputeError::NotFound {
            entity: "Movie",
            id: movie_id,
        })?;

    let existing = review::Entity::find()
        .filter(review::Column::MovieId.eq(movie_id))
        .filter(review::Column::UserId.eq(user_id))
        .count(&txn)
        .await?;
    if existing > 0 {
        warn!("User {} already reviewed movie {}", user_id, movie_id);
        return Err(ComputeError::DuplicateReview { user_id, movie_id });
    }

    let summary = RatingSummary::from(&movie).record(new_review.rating);
    debug!(
        "Movie {} rating moves from {} ({} reviews) to {} ({} reviews)",
        movie_id, movie.avg_rating, movie.number_rating, summary.avg_rating, summary.number_rating
    );

    let mut movie_active: movie::ActiveModel = movie.into();
    movie_active.avg_rating = Set(summary.avg_rating);
    movie_active.number_rating = Set(summary.number_rating);
    let movie = movie_active.update(&txn).await?;

    let now = Utc::now();
    let review = review::ActiveModel {
        user_id: Set(user_id),
        movie_id: Set(movie_id),
        rating: Set(new_review.rating),
        description: Set(new_review.description),
        active: Set(new_review.active),
        created: Set(now),
        updated: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
        // A concurrent request slipped in between the check and the insert.
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ComputeError::DuplicateReview { user_id, movie_id }
        }
        _ => ComputeError::Database(err),
    })?;

    txn.commit().await?;

    info!(
        "Review {} created by user {} for movie {}",
        review.id, user_id, movie_id
    );
    Ok((review, movie))
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use model::entities::user;
    use sea_orm::{Database, DatabaseConnection};

    fn dec(value: i64, scale: u32) -> Decimal {
        Decimal::new(value, scale)
    }

    #[test]
    fn test_first_rating_becomes_average() {
        for rating in 1..=5 {
            let summary = RatingSummary::default().record(rating);
            assert_eq!(summary.avg_rating, Decimal::from(rating));
            assert_eq!(summary.number_rating, 1);
        }
    }

    #[test]
    fn test_fold_follows_halving_formula_not_mean() {
        // avg = 5; avg = (5 + 4) / 2 = 4.5; avg = (4.5 + 3) / 2 = 3.75
        let summary = fold_ratings([5, 4, 3]);
        assert_eq!(summary.avg_rating, dec(375, 2));
        assert_eq!(summary.number_rating, 3);

        // The arithmetic mean would be 4.
        assert_ne!(summary.avg_rating, Decimal::from(4));
    }

    #[test]
    fn test_fold_matches_iterated_formula() {
        let ratings = [1, 5, 2, 4, 4, 3, 5];
        let mut expected = Decimal::from(ratings[0]);
        for rating in &ratings[1..] {
            expected = quantize((expected + Decimal::from(*rating)) / Decimal::TWO);
        }

        let summary = fold_ratings(ratings);
        assert_eq!(summary.avg_rating, expected);
        assert_eq!(summary.number_rating, ratings.len() as i32);
    }

    #[test]
    fn test_average_is_kept_to_two_decimals() {
        // (3.75 + 4) / 2 = 3.875, rounded half to even
        let summary = fold_ratings([5, 4, 3, 4]);
        assert_eq!(summary.avg_rating, dec(388, 2));
        assert_eq!(summary.avg_rating.scale(), AVG_RATING_SCALE);
    }

    #[test]
    fn test_record_continues_from_existing_statistics() {
        let summary = RatingSummary {
            avg_rating: dec(330, 2),
            number_rating: 4,
        };
        let summary = summary.record(5);
        assert_eq!(summary.avg_rating, dec(415, 2));
        assert_eq!(summary.number_rating, 5);
    }

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        db
    }

    async fn insert_user(db: &DatabaseConnection, email: &str) -> user::Model {
        user::ActiveModel {
            email: Set(email.to_string()),
            name: Set("Reviewer".to_string()),
            password_hash: Set("hash".to_string()),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create user")
    }

    async fn insert_movie(db: &DatabaseConnection) -> movie::Model {
        movie::ActiveModel {
            user_id: Set(None),
            title: Set("X".to_string()),
            image: Set(None),
            story_line: Set("story".to_string()),
            platform_id: Set(None),
            active: Set(true),
            avg_rating: Set(Decimal::ZERO),
            number_rating: Set(0),
            created: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create movie")
    }

    fn new_review(rating: i32) -> NewReview {
        NewReview {
            rating,
            description: Some("sample review".to_string()),
            active: true,
        }
    }

    #[tokio::test]
    async fn test_create_review_updates_movie() {
        let db = setup_db().await;
        let first = insert_user(&db, "first@example.com").await;
        let second = insert_user(&db, "second@example.com").await;
        let movie = insert_movie(&db).await;

        let (review, updated) = create_review(&db, first.id, movie.id, new_review(4))
            .await
            .expect("first review");
        assert_eq!(review.rating, 4);
        assert_eq!(review.user_id, first.id);
        assert_eq!(updated.avg_rating, Decimal::from(4));
        assert_eq!(updated.number_rating, 1);

        let (_, updated) = create_review(&db, second.id, movie.id, new_review(2))
            .await
            .expect("second review");
        assert_eq!(updated.avg_rating, Decimal::from(3));
        assert_eq!(updated.number_rating, 2);

        let stored = movie::Entity::find_by_id(movie.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.avg_rating, Decimal::from(3));
        assert_eq!(stored.number_rating, 2);
    }

    #[tokio::test]
    async fn test_duplicate_review_leaves_movie_untouched() {
        let db = setup_db().await;
        let user = insert_user(&db, "user@example.com").await;
        let movie = insert_movie(&db).await;

        create_review(&db, user.id, movie.id, new_review(5))
            .await
            .expect("first review");
        let err = create_review(&db, user.id, movie.id, new_review(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::DuplicateReview { .. }));

        let stored = movie::Entity::find_by_id(movie.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.avg_rating, Decimal::from(5));
        assert_eq!(stored.number_rating, 1);
        assert_eq!(review::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_rating_is_rejected() {
        let db = setup_db().await;
        let user = insert_user(&db, "user@example.com").await;
        let movie = insert_movie(&db).await;

        for rating in [0, 6] {
            let err = create_review(&db, user.id, movie.id, new_review(rating))
                .await
                .unwrap_err();
            assert!(matches!(err, ComputeError::Validation(_)));
        }

        let stored = movie::Entity::find_by_id(movie.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.number_rating, 0);
        assert_eq!(review::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_review_for_missing_movie() {
        let db = setup_db().await;
        let user = insert_user(&db, "user@example.com").await;

        let err = create_review(&db, user.id, 4242, new_review(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ComputeError::NotFound {
                entity: "Movie",
                id: 4242
            }
        ));
    }
}
