use chrono::Duration;
use dotenvy::dotenv;
use envconfig::Envconfig;
use tokio::net::TcpListener;

use pharmabid::auth::TokenService;
use pharmabid::config::Config;
use pharmabid::{db, router, AppState};

type Error = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load environment variables from a .env file if present
    dotenv().ok();

    // Initialize the logger with "info" as the default level
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting the pharmacy marketplace API...");

    let config = Config::init_from_env()?;

    let pool = db::init_db(&config.database_url, config.db_max_connections).await?;
    log::info!("Database ready at {}", config.database_url);

    let tokens = TokenService::new(
        &config.jwt_secret(),
        Duration::hours(config.token_ttl_hours),
    );
    let app = router(AppState::new(pool, tokens));

    let listener = TcpListener::bind(&config.bind_addr).await?;
    log::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
    }
}
