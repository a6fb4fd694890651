//! Amora Inventarios - inventory, sales and exchanges over a spreadsheet

use std::sync::Arc;

use amora_inventarios::{api, clock::SystemClock, config::AppConfig, store::{MemoryStore, SheetsClient, StoreBackend}, workflow::InventoryService};
use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let store = match &config.sheets {
        Some(sheets) => {
            let client = SheetsClient::new(&sheets.api_url, &sheets.spreadsheet_id, &sheets.access_token, sheets.timeout)?;
            tracing::info!(spreadsheet = %sheets.spreadsheet_id, "using Google Sheets store");
            StoreBackend::Sheets(client.connect().await?)
        }
        None => {
            tracing::warn!("GOOGLE_SHEET_ID not set, records are kept in memory only");
            StoreBackend::Memory(MemoryStore::new())
        }
    };

    let service = InventoryService::new(Arc::new(store), SystemClock, config.engine.clone());
    service.ensure_headers().await?;

    let app = api::router(Arc::new(service)).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!("🚀 Amora Inventarios listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
