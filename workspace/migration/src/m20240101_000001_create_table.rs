use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len(Users::Email, 250).unique_key())
                    .col(string_len(Users::Name, 250))
                    .col(string(Users::PasswordHash))
                    .col(boolean(Users::IsActive).default(true))
                    .col(boolean(Users::IsStaff).default(false))
                    .col(boolean(Users::IsSuperuser).default(false))
                    .to_owned(),
            )
            .await?;

        // Create auth_tokens table
        manager
            .create_table(
                Table::create()
                    .table(AuthTokens::Table)
                    .if_not_exists()
                    .col(pk_auto(AuthTokens::Id))
                    .col(string_len(AuthTokens::Key, 40).unique_key())
                    .col(integer(AuthTokens::UserId).unique_key())
                    .col(timestamp_with_time_zone(AuthTokens::Created))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auth_tokens_user")
                            .from(AuthTokens::Table, AuthTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create streams table
        manager
            .create_table(
                Table::create()
                    .table(Streams::Table)
                    .if_not_exists()
                    .col(pk_auto(Streams::Id))
                    .col(integer_null(Streams::UserId))
                    .col(string_len(Streams::Name, 250))
                    .col(string_len(Streams::About, 250))
                    .col(string_len(Streams::Website, 250))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_streams_user")
                            .from(Streams::Table, Streams::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create movies table
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(integer_null(Movies::UserId))
                    .col(string_len(Movies::Title, 250))
                    .col(string_null(Movies::Image))
                    .col(string_len(Movies::StoryLine, 250))
                    .col(integer_null(Movies::PlatformId))
                    .col(boolean(Movies::Active).default(true))
                    .col(decimal(Movies::AvgRating).decimal_len(5, 2).default(0))
                    .col(integer(Movies::NumberRating).default(0))
                    .col(timestamp_with_time_zone(Movies::Created))
                    .check(Expr::col(Movies::NumberRating).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_user")
                            .from(Movies::Table, Movies::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_platform")
                            .from(Movies::Table, Movies::PlatformId)
                            .to(Streams::Table, Streams::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create reviews table
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(pk_auto(Reviews::Id))
                    .col(integer(Reviews::UserId))
                    .col(integer(Reviews::MovieId))
                    .col(integer(Reviews::Rating))
                    .col(string_len_null(Reviews::Description, 250))
                    .col(boolean(Reviews::Active).default(true))
                    .col(timestamp_with_time_zone(Reviews::Created))
                    .col(timestamp_with_time_zone(Reviews::Updated))
                    .check(Expr::col(Reviews::Rating).between(1, 5))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_user")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_movie")
                            .from(Reviews::Table, Reviews::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One review per user and movie
        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_user_movie")
                    .table(Reviews::Table)
                    .col(Reviews::UserId)
                    .col(Reviews::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Movies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Streams::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuthTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Name,
    PasswordHash,
    IsActive,
    IsStaff,
    IsSuperuser,
}

#[derive(DeriveIden)]
enum AuthTokens {
    Table,
    Id,
    Key,
    UserId,
    Created,
}

#[derive(DeriveIden)]
enum Streams {
    Table,
    Id,
    UserId,
    Name,
    About,
    Website,
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    UserId,
    Title,
    Image,
    StoryLine,
    PlatformId,
    Active,
    AvgRating,
    NumberRating,
    Created,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    UserId,
    MovieId,
    Rating,
    Description,
    Active,
    Created,
    Updated,
}
