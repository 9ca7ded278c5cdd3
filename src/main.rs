use std::{env, sync::Arc};

use karatu_collab::{Karatu, PgDatabase, ProgressConfig};
use log::{error, info};
use thiserror::Error;

mod logging;

#[derive(Debug, Error)]
enum StartError {
    #[error("DATABASE_URL must be set to a Postgres connection string")]
    MissingDatabaseUrl,
    #[error("Could not initialize database: {0}")]
    Database(String),
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    if let Err(error) = run().await {
        error!("karatu failed to start!");
        error!("{}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartError> {
    let database_url = env::var("DATABASE_URL").map_err(|_| StartError::MissingDatabaseUrl)?;

    info!("Connecting to database...");

    let database = PgDatabase::new(&database_url)
        .await
        .map_err(|e| StartError::Database(e.to_string()))?;

    let config = ProgressConfig {
        // Re-completing a lesson grants its full reward unless disabled
        repeat_reward: env::var("KARATU_REPEAT_REWARD")
            .map(|x| x != "0" && x.to_lowercase() != "false")
            .unwrap_or(true),
    };

    let karatu = Arc::new(Karatu::new(database, config));

    info!("Initialized successfully.");

    karatu_server::run_server(karatu).await;

    Ok(())
}
