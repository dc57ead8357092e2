use anyhow::Context;
use cinema_api::{app, AppState};
use cinema_booking::{BookingOperations, BookingService};
use cinema_core::BookingRepository;
use cinema_store::app_config::{Config, StorageBackend};
use cinema_store::{DbClient, EventProducer, HttpSessionProvider, MemoryBookingRepository, PostgresBookingRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinema_api=debug,cinema_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting booking service on port {}", config.server.port);

    let bookings = match config.database.backend {
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            build_service(&config, PostgresBookingRepository::new(db.pool.clone()))?
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory booking store; bookings are lost on restart");
            build_service(&config, MemoryBookingRepository::new())?
        }
    };

    let app = app(AppState::new(bookings));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn build_service<R: BookingRepository>(config: &Config, repo: R) -> anyhow::Result<Arc<dyn BookingOperations>> {
    let producer = EventProducer::new(&config.kafka.brokers, &config.kafka.topic, config.kafka.send_timeout())
        .context("Failed to create Kafka producer")?;
    let sessions = HttpSessionProvider::new(&config.session_provider.url, config.session_provider.timeout())
        .context("Failed to build session provider client")?;

    Ok(Arc::new(BookingService::new(
        Arc::new(repo),
        Arc::new(sessions),
        Arc::new(producer),
        config.business_rules.booking_hold(),
    )))
}
