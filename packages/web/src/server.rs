use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api::auth::{GoogleOAuth, LocalAuth, OAuthConfig, OAuthProvider, PasswordHasher};
use api::covers::OpenLibraryCovers;
use api::db::{self, PgCredentialStore, PgLibrary};
use api::Settings;
use tokio::signal;
use tower_sessions::cookie::Key;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

use crate::routes;
use crate::state::AppState;

/// How often expired sessions are swept from the database.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Build every service from the environment and serve until Ctrl+C or SIGTERM.
pub async fn launch_server() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("Invalid configuration")?;

    let pool = db::connect(&settings.database_url)
        .await
        .context("Failed to connect to database")?;

    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .context("Failed to create session table")?;
    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(SESSION_SWEEP_INTERVAL),
    );

    let key = Key::try_from(settings.session_secret.as_slice())
        .context("SESSION_SECRET cannot be used as a signing key")?;

    let users = Arc::new(PgCredentialStore::new(pool.clone()));
    let hasher = PasswordHasher::new(settings.password)?;
    let local = LocalAuth::new(users.clone(), hasher)?;

    let google: Option<Arc<dyn OAuthProvider>> = match &settings.google {
        Some(google) => {
            let provider: Arc<dyn OAuthProvider> =
                Arc::new(GoogleOAuth::new(OAuthConfig::google(google)?)?);
            Some(provider)
        }
        None => {
            tracing::warn!("GOOGLE_CLIENT_ID not set, Google login disabled");
            None
        }
    };

    tokio::fs::create_dir_all(&settings.covers_dir)
        .await
        .with_context(|| format!("Failed to create {}", settings.covers_dir.display()))?;
    let covers = Arc::new(OpenLibraryCovers::new(
        settings.covers_dir.clone(),
        settings.cover_timeout,
    )?);
    let library = Arc::new(PgLibrary::new(pool));

    let state = AppState::new(users, local, google, library, covers);
    let app = routes::router(state, session_store, key, settings.session_secure);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    tracing::info!("Server listening on {}", settings.bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    deletion_task.abort();
    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
