//! Herbtrace - derived metrics and filtering for herbal supply-chain dashboards.
//!
//! # API Endpoints
//!
//! - `GET /kpis` - Headline dashboard figures
//! - `GET /events` - Collection events filtered by species and status
//! - `GET /events/stats` - Harvest figures over the filtered events
//! - `GET /dashboard` - Full overview payload
//! - `GET /batches/:id` - Batch trace by id
//! - `GET /batches/qr/:code` - Batch trace by QR code
//! - `GET /recalls` - Recall events
//! - `GET /activity` - Recent activity feed
//! - `POST /scans` - Record a consumer QR scan
//! - `GET /health` - Health check

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use herbtrace::api::{AppState, router};
use herbtrace::config::{Config, DataSourceKind};
use herbtrace::dashboard::{Dashboard, DashboardConfig};
use herbtrace::data_sources::SnapshotClient;
use herbtrace::dataset::DatasetSource;
use herbtrace::fixtures;
use herbtrace::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("herbtrace=info".parse()?))
        .init();

    let config = Config::from_env()?;

    info!(port = config.port, source = ?config.data_source, "Starting Herbtrace server");

    let source = match &config.data_source {
        DataSourceKind::Fixtures => DatasetSource::Fixtures {
            recent_scans: config.recent_scans,
        },
        DataSourceKind::Sqlite => {
            let storage = Storage::new(&config.database_url).await?;
            if storage.record_count().await? == 0 {
                let seeded = storage.seed(&fixtures::raw_dataset()).await?;
                info!(records = seeded, "Seeded empty database with sample records");
            }
            info!(db_url = %config.database_url, "Database initialized");
            DatasetSource::Sqlite {
                storage,
                scan_window_days: config.scan_window_days,
            }
        }
        DataSourceKind::Remote { url, token } => {
            info!(url = %url, "Using remote snapshot service");
            DatasetSource::Remote(SnapshotClient::new(url, token.clone()))
        }
    };

    let dashboard = Dashboard::new(
        source,
        DashboardConfig {
            activity_limit: config.activity_limit,
        },
    );

    // Probe the source once so a misconfigured source shows up at startup
    match dashboard.snapshot().await {
        Ok(snapshot) => info!(
            events = snapshot.dataset.collection_events.len(),
            batches = snapshot.dataset.batches.len(),
            skipped = snapshot.dataset.skipped_count(),
            "Initial snapshot loaded"
        ),
        Err(e) => tracing::warn!(error = %e, "Initial snapshot unavailable; serving empty state"),
    }

    let app = router(AppState { dashboard });

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Herbtrace is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
