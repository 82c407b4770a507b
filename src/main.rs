use clap::Parser;
use dotenvy::dotenv;
use marketplace_backend::config::AppConfig;
use marketplace_backend::infrastructure::{database, storage};
use marketplace_backend::services::notify::SmtpNotifier;
use marketplace_backend::services::post_service::PostService;
use marketplace_backend::services::response_service::ResponseService;
use marketplace_backend::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketplace_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Marketplace Backend...");

    let config = AppConfig::from_env();

    let db = database::setup_database().await?;
    let storage_service = storage::setup_storage(&config).await?;
    let notifier = Arc::new(SmtpNotifier::from_config(&config)?);

    let post_service = Arc::new(PostService::new(db.clone(), storage_service.clone()));
    let response_service = Arc::new(ResponseService::new(db.clone(), notifier.clone()));

    let state = AppState {
        db,
        storage: storage_service,
        notifier,
        post_service,
        response_service,
        config,
    };

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("🌐 API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
