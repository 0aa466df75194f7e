use std::net::SocketAddr;
use std::sync::Arc;

use skinforge_core::ids::OptimusEncoder;
use skinforge_core::secrets::SecretCodec;
use skinforge_db::catalog::{Catalog, PgCatalog};
use skinforge_mojang::MojangClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skinforge_api::config::ServerConfig;
use skinforge_api::engine::authenticator::Authenticator;
use skinforge_api::engine::generator::Generator;
use skinforge_api::engine::scheduler::{AccountScheduler, SchedulerConfig};
use skinforge_api::engine::tempfiles::TempRoots;
use skinforge_api::router::build_app_router;
use skinforge_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skinforge_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = skinforge_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    skinforge_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    skinforge_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let catalog: Arc<dyn Catalog> = Arc::new(PgCatalog::new(pool));

    // --- Engine ---
    let scheduler = Arc::new(AccountScheduler::new(
        Arc::clone(&catalog),
        SchedulerConfig {
            server_name: config.server_name.clone(),
            error_threshold: config.error_threshold,
            min_account_delay_secs: config.min_account_delay_secs,
        },
    ));

    let mojang = Arc::new(
        MojangClient::new(config.mojang.clone()).expect("Failed to build upstream client"),
    );
    let codec = SecretCodec::new(config.credential_key);
    let authenticator = Authenticator::new(Arc::clone(&mojang), codec, Arc::clone(&catalog));

    let temp = TempRoots::create(&config.temp_dir).expect("Failed to create temp directories");
    let encoder = OptimusEncoder::new(
        config.optimus_prime,
        config.optimus_inverse,
        config.optimus_random,
    );

    let generator = Arc::new(
        Generator::new(
            Arc::clone(&catalog),
            Arc::clone(&scheduler),
            authenticator,
            mojang,
            temp,
            encoder,
            config.follow_hosts.clone(),
            std::time::Duration::from_secs(config.request_timeout_secs),
        )
        .expect("Failed to build generator"),
    );
    tracing::info!("Generation engine ready");

    // --- Router ---
    let state = AppState {
        catalog,
        scheduler,
        generator,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Serve ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT combination");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
