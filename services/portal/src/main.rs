use anyhow::{Context, Result};
use common::{
    Workbook,
    database::{init_pool, run_migrations},
    mail::build_mailer,
    workbook::{WorkbookSnapshot, memory::MemoryStore, postgres::PgStore},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use portal::{
    AppState, Settings,
    config::{StoreBackend, StoreConfig},
    create_router,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting portal service");

    let settings = Settings::load().context("Failed to load configuration")?;
    let workbook = open_workbook(&settings).await?;
    seed_workbook(&workbook, &settings.store).await?;

    let mailer = build_mailer(&settings.mail)?;
    let address = settings.server.bind_address();
    let app = create_router(AppState::new(settings, workbook, mailer));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Portal service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_workbook(settings: &Settings) -> Result<Workbook> {
    match settings.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory workbook store");
            Ok(Workbook::new(Arc::new(MemoryStore::new())))
        }
        StoreBackend::Postgres => {
            let pool = init_pool(&settings.database).await?;
            if !common::database::health_check(&pool).await? {
                anyhow::bail!("Failed to connect to database");
            }
            run_migrations(&pool).await?;
            info!("Database connection successful");
            Ok(Workbook::new(Arc::new(PgStore::new(pool))))
        }
    }
}

/// Import the seed snapshot into an empty store
async fn seed_workbook(workbook: &Workbook, store: &StoreConfig) -> Result<()> {
    let Some(path) = &store.seed_path else {
        return Ok(());
    };
    if !workbook.is_empty().await? {
        info!("Workbook already populated, skipping seed {}", path);
        return Ok(());
    }

    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read seed workbook {}", path))?;
    let count = workbook.import(WorkbookSnapshot::from_json(&json)?).await?;
    info!("Imported {} tables from {}", count, path);
    Ok(())
}
