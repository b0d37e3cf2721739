use anyhow::Result;
use tracing::{debug, error, info, trace};

use super::initdb::apply_migrations;
use super::serve::run_server;
use crate::config::initialize_app_state_with_url;

pub async fn migrate_and_serve(
    database_url: &str,
    bind_address: &str,
    media_root: &str,
) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", database_url);

    let state = match initialize_app_state_with_url(database_url, media_root).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    apply_migrations(&state.db).await?;
    run_server(state, bind_address).await
}
