// src/main.rs

use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use videotube::{
    config::{Config, MediaConfig},
    database::connect_db,
    routes,
    state::AppState,
    store::{PgUserStore, PgVideoStore},
    utils::media::{CloudinaryUploader, LocalMediaStore, MediaUploader},
};

#[tokio::main]
async fn main() {
    // Load configuration from environment (and .env, if present)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // A failed connection is fatal; there is no retry.
    let pool = match connect_db(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database connection FAILED: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Running migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run database migrations: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Migrations applied successfully.");

    if let Err(e) = tokio::fs::create_dir_all(&config.temp_dir).await {
        tracing::error!(
            "Cannot create temp upload dir {}: {}",
            config.temp_dir.display(),
            e
        );
        std::process::exit(1);
    }

    let media: Arc<dyn MediaUploader> = match &config.media {
        MediaConfig::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
        } => match CloudinaryUploader::new(cloud_name.clone(), api_key.clone(), api_secret.clone()) {
            Ok(uploader) => {
                tracing::info!("Media backend: cloudinary ({})", cloud_name);
                Arc::new(uploader)
            }
            Err(e) => {
                tracing::error!("Cannot build media client: {}", e);
                std::process::exit(1);
            }
        },
        MediaConfig::Local { dir, public_url } => {
            tracing::info!("Media backend: local directory {}", dir.display());
            Arc::new(LocalMediaStore::new(dir.clone(), public_url.clone()))
        }
    };

    let state = AppState {
        users: Arc::new(PgUserStore::new(pool.clone())),
        videos: Arc::new(PgVideoStore::new(pool)),
        media,
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Cannot bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Server is running at port: {}", config.port);

    // Start the server
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
