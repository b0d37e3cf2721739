use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing::{debug, error, info, trace};

pub async fn init_database(database_url: &str) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");
    debug!("Database URL: {}", database_url);

    let db: DatabaseConnection = match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            connection
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    apply_migrations(&db).await?;

    info!("Database initialization completed successfully!");
    Ok(())
}

/// Run every pending migration against `db`.
pub async fn apply_migrations(db: &DatabaseConnection) -> Result<()> {
    info!("Running database migrations");
    let pending = Migrator::get_pending_migrations(db).await?;
    debug!("{} pending migrations", pending.len());

    match Migrator::up(db, None).await {
        Ok(()) => {
            info!("Database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Failed to run database migrations: {}", e);
            Err(e.into())
        }
    }
}
