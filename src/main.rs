use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use pelican::config::Config;
use pelican::create_router;
use pelican::storage::{SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pelican=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new(&config.database.url, 5).await?,
    );
    info!("Using SQLite storage: {}", config.database.url);

    storage.init().await?;
    info!("Database initialized");

    tokio::fs::create_dir_all(&config.upload.dir).await?;
    info!("Upload directory ready: {}", config.upload.dir);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = create_router(Arc::clone(&storage), config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - Upload files at http://{}/upload", addr);
    info!("   - Management API at http://{}/urls", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
