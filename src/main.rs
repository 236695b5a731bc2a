use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use medportal::app::build_router;
use medportal::core::auth::{AuthService, TokenIssuer};
use medportal::core::config::Config;
use medportal::core::db::{
    MemorySessionStore, MemoryUserStore, SessionRepository, SessionStore, UserRepository,
    UserStore, create_pool_with_migrations,
};
use tracing_subscriber::EnvFilter;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    // Log config status (without revealing secrets)
    tracing::info!(
        bind_addr = %config.bind_addr,
        database = config.has_database(),
        bcrypt_cost = config.bcrypt_cost,
        issuer = %config.jwt.issuer,
        "Config loaded"
    );

    let (users, sessions): (Arc<dyn UserStore>, Arc<dyn SessionStore>) =
        match config.db_config() {
            Some(db_config) => {
                let pool = create_pool_with_migrations(&db_config).await?;
                let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(pool.clone()));
                let sessions: Arc<dyn SessionStore> = Arc::new(SessionRepository::new(pool));
                (users, sessions)
            }
            None => {
                tracing::warn!(
                    "DATABASE_URL not set, accounts are kept in memory and lost on restart"
                );
                let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
                let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
                (users, sessions)
            }
        };

    spawn_session_cleanup(Arc::clone(&sessions));

    let service = AuthService::new(
        users,
        sessions,
        TokenIssuer::new(config.jwt.clone()),
        config.password_hasher()?,
    );

    let app = build_router(service, Router::new());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Periodically delete expired refresh sessions
fn spawn_session_cleanup(sessions: Arc<dyn SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired sessions removed"),
                Err(err) => tracing::warn!(error = %err, "Session cleanup failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
