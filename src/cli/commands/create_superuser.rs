use anyhow::{Context, Result};
use sea_orm::Database;
use tracing::{debug, info, trace};

use crate::auth::{register_user, NewUser};

pub async fn create_superuser(
    database_url: &str,
    email: &str,
    password: &str,
    name: &str,
) -> Result<()> {
    trace!("Entering create_superuser function");
    debug!("Database URL: {}", database_url);

    let db = Database::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    let user = register_user(
        &db,
        NewUser {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            is_admin: true,
        },
    )
    .await
    .with_context(|| format!("Failed to create superuser {}", email))?;

    info!("Superuser {} created with ID {}", user.email, user.id);
    Ok(())
}
