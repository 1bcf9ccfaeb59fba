// src/database.rs

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use url::Url;

use crate::{config::Config, constants::DB_NAME};

/// Full connection string: the configured server URI plus the fixed database name.
pub fn connection_string(database_uri: &str) -> String {
    format!("{}/{}", database_uri.trim_end_matches('/'), DB_NAME)
}

/// Host part of a connection string, for logging. Never exposes credentials.
pub fn resolved_host(connection_string: &str) -> String {
    Url::parse(connection_string)
        .ok()
        .and_then(|url| {
            url.host_str().map(|host| match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            })
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Opens the process-wide connection pool.
///
/// There is no retry: the caller treats an error as fatal to startup.
pub async fn connect_db(config: &Config) -> Result<PgPool, sqlx::Error> {
    let url = connection_string(&config.database_uri);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&url)
        .await?;

    tracing::info!("Database connected. DB HOST: {}", resolved_host(&url));
    Ok(pool)
}
