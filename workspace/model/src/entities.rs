//! SeaORM entities for the movie review service: users and their API tokens,
//! streaming platforms, movies and reviews.

pub mod auth_token;
pub mod movie;
pub mod review;
pub mod stream;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::auth_token::Entity as AuthToken;
    pub use super::movie::Entity as Movie;
    pub use super::review::Entity as Review;
    pub use super::stream::Entity as Stream;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn insert_user(db: &DatabaseConnection, email: &str) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            email: Set(email.to_string()),
            name: Set("Test".to_string()),
            password_hash: Set("not-a-real-hash".to_string()),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    async fn insert_movie(
        db: &DatabaseConnection,
        owner: Option<i32>,
        platform: Option<i32>,
    ) -> Result<movie::Model, DbErr> {
        movie::ActiveModel {
            user_id: Set(owner),
            title: Set("Sample".to_string()),
            image: Set(None),
            story_line: Set("A story".to_string()),
            platform_id: Set(platform),
            active: Set(true),
            avg_rating: Set(Decimal::ZERO),
            number_rating: Set(0),
            created: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    async fn insert_review(
        db: &DatabaseConnection,
        user_id: i32,
        movie_id: i32,
        rating: i32,
    ) -> Result<review::Model, DbErr> {
        let now = Utc::now();
        review::ActiveModel {
            user_id: Set(user_id),
            movie_id: Set(movie_id),
            rating: Set(rating),
            description: Set(Some("sample description".to_string())),
            active: Set(true),
            created: Set(now),
            updated: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let owner = insert_user(&db, "owner@example.com").await?;
        let reviewer = insert_user(&db, "reviewer@example.com").await?;

        let netflix = stream::ActiveModel {
            user_id: Set(Some(owner.id)),
            name: Set("Netflix".to_string()),
            about: Set("Streaming platform".to_string()),
            website: Set("https://www.netflix.com".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let movie = insert_movie(&db, Some(owner.id), Some(netflix.id)).await?;
        insert_review(&db, reviewer.id, movie.id, 4).await?;

        let movies = netflix.find_related(Movie).all(&db).await?;
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Sample");

        let reviews = movie.find_related(Review).all(&db).await?;
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].user_id, reviewer.id);
        assert_eq!(reviews[0].rating, 4);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() -> Result<(), DbErr> {
        let db = setup_db().await?;

        insert_user(&db, "user@example.com").await?;
        let duplicate = insert_user(&db, "user@example.com").await;

        assert!(duplicate.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_second_review_for_same_movie_rejected() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let user = insert_user(&db, "user@example.com").await?;
        let movie = insert_movie(&db, None, None).await?;

        insert_review(&db, user.id, movie.id, 3).await?;
        let duplicate = insert_review(&db, user.id, movie.id, 5).await;

        assert!(duplicate.is_err());
        assert_eq!(Review::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_movie_cascades_to_reviews() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let user = insert_user(&db, "user@example.com").await?;
        let movie = insert_movie(&db, None, None).await?;
        insert_review(&db, user.id, movie.id, 2).await?;

        Movie::delete_by_id(movie.id).exec(&db).await?;

        let remaining = Review::find()
            .filter(review::Column::MovieId.eq(movie.id))
            .count(&db)
            .await?;
        assert_eq!(remaining, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_owned_records() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let owner = insert_user(&db, "owner@example.com").await?;
        let other = insert_user(&db, "other@example.com").await?;

        let stream = stream::ActiveModel {
            user_id: Set(Some(owner.id)),
            name: Set("Prime".to_string()),
            about: Set("About".to_string()),
            website: Set("https://www.primevideo.com".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        let owned_movie = insert_movie(&db, Some(owner.id), None).await?;
        let other_movie = insert_movie(&db, Some(other.id), None).await?;
        insert_review(&db, owner.id, other_movie.id, 5).await?;

        auth_token::ActiveModel {
            key: Set("a".repeat(40)),
            user_id: Set(owner.id),
            created: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        User::delete_by_id(owner.id).exec(&db).await?;

        assert!(Stream::find_by_id(stream.id).one(&db).await?.is_none());
        assert!(Movie::find_by_id(owned_movie.id).one(&db).await?.is_none());
        assert!(Movie::find_by_id(other_movie.id).one(&db).await?.is_some());
        assert_eq!(Review::find().count(&db).await?, 0);
        assert_eq!(AuthToken::find().count(&db).await?, 0);
        Ok(())
    }
}
