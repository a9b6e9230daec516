use actix_web::{App, HttpServer};
use color_eyre::eyre::{Result, WrapErr};
use poll_server::{
    config::Config,
    db::{self, MemoryStore, PgStore, PollStore},
    log, server,
};
use std::sync::Arc;
use tracing::{info, warn};

async fn open_store(config: &Config) -> Result<Arc<dyn PollStore>> {
    match &config.database_url {
        Some(database_url) => {
            let pool = db::connect(database_url, config)
                .await
                .wrap_err("Failed to connect to the database")?;
            db::migrate(&pool)
                .await
                .wrap_err("Failed to run database migrations")?;
            info!("Using PostgreSQL store");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, polls and votes are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_rt::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    log::init();

    let config = Config::from_env()?;
    let store = server::store_data(open_store(&config).await?);

    info!(address = config.bind_address.as_str(), "Starting HTTP server");
    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .configure(server::configure)
    })
    .bind(&config.bind_address)
    .wrap_err_with(|| format!("Failed to bind {}", config.bind_address))?
    .run()
    .await?;

    info!("HTTP server stopped");
    Ok(())
}
