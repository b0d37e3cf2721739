use sea_orm::entity::prelude::*;
use std::path::Path;
use uuid::Uuid;

/// Directory, relative to the media root, that movie posters are stored under.
pub const IMAGE_UPLOAD_DIR: &str = "uploads/movie";

/// A movie, optionally listed on a streaming platform.
///
/// `avg_rating` and `number_rating` are derived from the movie's reviews and
/// only change when a review is created.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The user who created the movie.
    pub user_id: Option<i32>,
    pub title: String,
    /// Path of the poster relative to the media root.
    pub image: Option<String>,
    pub story_line: String,
    /// The stream the movie is available on.
    pub platform_id: Option<i32>,
    #[sea_orm(default_value = "true")]
    pub active: bool,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub avg_rating: Decimal,
    pub number_rating: i32,
    pub created: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::stream::Entity",
        from = "Column::PlatformId",
        to = "super::stream::Column::Id",
        on_delete = "Cascade"
    )]
    Stream,
    #[sea_orm(has_many = "super::review::Entity")]
    Review,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::stream::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stream.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Generates the storage path for a newly uploaded poster.
///
/// The file is renamed to a random UUID; the extension of `filename`
/// (including the leading dot) is preserved.
pub fn image_file_path(filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    format!("{}/{}{}", IMAGE_UPLOAD_DIR, Uuid::new_v4(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_file_path_keeps_extension() {
        let path = image_file_path("poster.jpg");
        assert!(path.starts_with("uploads/movie/"));
        assert!(path.ends_with(".jpg"));

        let stem = path
            .trim_start_matches("uploads/movie/")
            .trim_end_matches(".jpg");
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_image_file_path_without_extension() {
        let path = image_file_path("poster");
        let stem = path.trim_start_matches("uploads/movie/");
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_image_file_path_is_unique() {
        assert_ne!(image_file_path("a.png"), image_file_path("a.png"));
    }
}
