use std::net::{IpAddr, SocketAddr};
use tracing::info;
use usuarios_services::{
    config::Config,
    database, routes, telemetry,
    usuarios::MongoUsuarioStorage,
    version::{BUILD_BRANCH, BUILD_COMMIT, BUILD_DATE, BUILD_VERSION},
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside local development
    let dotenv = dotenvy::dotenv();

    let config: Config = Config::init()?;
    telemetry::init_tracing(&config)?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env file"),
        Err(err) => tracing::debug!(error = %err, "No .env file loaded"),
    }

    print_build_info();

    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        mongo_db = %config.mongo_db(),
        "Configuration loaded"
    );

    let db = database::connect(&config).await?;
    let storage = MongoUsuarioStorage::new(&db);
    storage.try_ensure_indexes().await;

    let route = routes(storage, config.clone());

    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

fn print_build_info() {
    info!("===========================================");
    info!("  Usuarios Services");
    info!("===========================================");
    info!("Version:      {}", BUILD_VERSION);
    info!("Build Date:   {}", BUILD_DATE);
    info!("Build Commit: {}", BUILD_COMMIT);
    info!("Build Branch: {}", BUILD_BRANCH);
    info!("===========================================");
}
