use sea_orm::entity::prelude::*;

/// An account holder. Users authenticate by email and own the streams,
/// movies and reviews they create.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Stored normalized, see [`normalize_email`].
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    /// Argon2 PHC string. The plaintext password is never persisted.
    pub password_hash: String,
    #[sea_orm(default_value = "true")]
    pub is_active: bool,
    #[sea_orm(default_value = "false")]
    pub is_staff: bool,
    #[sea_orm(default_value = "false")]
    pub is_superuser: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::auth_token::Entity")]
    AuthToken,
    #[sea_orm(has_many = "super::stream::Entity")]
    Stream,
    #[sea_orm(has_many = "super::movie::Entity")]
    Movie,
    #[sea_orm(has_many = "super::review::Entity")]
    Review,
}

impl Related<super::auth_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthToken.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Staff and superusers hold elevated privileges.
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// Lower-cases the domain part of an email address, leaving the local part
/// untouched. Surrounding whitespace is trimmed.
///
/// Addresses without an `@` are returned trimmed but otherwise unchanged.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_lowercases_domain_only() {
        let samples = [
            ("test1@Example.com", "test1@example.com"),
            ("Test2@Example.com", "Test2@example.com"),
            ("TEST3@EXAMPLE.com", "TEST3@example.com"),
            ("test4@example.COM", "test4@example.com"),
        ];

        for (input, expected) in samples {
            assert_eq!(normalize_email(input), expected);
        }
    }

    #[test]
    fn test_normalize_email_trims_and_keeps_unparseable_input() {
        assert_eq!(normalize_email("  user@EXAMPLE.com "), "user@example.com");
        assert_eq!(normalize_email("not-an-email"), "not-an-email");
    }

    #[test]
    fn test_is_admin() {
        let mut user = Model {
            id: 1,
            email: "user@example.com".to_string(),
            name: String::new(),
            password_hash: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        };
        assert!(!user.is_admin());

        user.is_staff = true;
        assert!(user.is_admin());

        user.is_staff = false;
        user.is_superuser = true;
        assert!(user.is_admin());
    }
}
