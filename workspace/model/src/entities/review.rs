use sea_orm::entity::prelude::*;

/// Lowest accepted rating.
pub const MIN_RATING: i32 = 1;
/// Highest accepted rating.
pub const MAX_RATING: i32 = 5;

/// A user's review of a movie. Each user reviews a movie at most once.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub movie_id: i32,
    /// Between [`MIN_RATING`] and [`MAX_RATING`] inclusive.
    pub rating: i32,
    pub description: Option<String>,
    #[sea_orm(default_value = "true")]
    pub active: bool,
    pub created: DateTimeUtc,
    /// Refreshed on every modification.
    pub updated: DateTimeUtc,
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
        belongs_to = "super::movie::Entity",
        from = "Column::MovieId",
        to = "super::movie::Column::Id",
        on_delete = "Cascade"
    )]
    Movie,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::movie::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movie.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Returns true when `rating` lies within the accepted range.
pub fn is_valid_rating(rating: i32) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(!is_valid_rating(0));
        for rating in 1..=5 {
            assert!(is_valid_rating(rating));
        }
        assert!(!is_valid_rating(6));
        assert!(!is_valid_rating(-3));
    }
}
