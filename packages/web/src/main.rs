use std::sync::Arc;

use anyhow::Context;
use auth::db::{self, PgDirectory};
use auth::{
    AuthState, CurrentUser, ExpiringMemoryStore, FlowSessions, GoogleProvider,
    IdentityProvider, MemoryDirectory, OAuthConfig, SessionConfig, Sessions, UserDirectory,
};
use axum::routing::get;
use axum::Router;
use tokio::time::Duration;
use tower_sessions::cookie::Key;
use tower_sessions::{ExpiredDeletion, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::EnvFilter;

use settings::Settings;

mod settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().context("failed to load settings")?;
    let key = auth::session_key(&settings.session.secret);
    let oauth = OAuthConfig::google(
        &settings.google.client_id,
        &settings.google.client_secret,
        &settings.google.redirect_url,
    )
    .context("invalid OAuth configuration")?;
    let provider = Arc::new(GoogleProvider::new(oauth).context("failed to build HTTP client")?);
    let session_config = SessionConfig {
        secure: settings.session.secure,
        ..SessionConfig::default()
    };

    let router = if settings.persistent() {
        let pool = db::connect(&settings.database.url)
            .await
            .context("failed to connect to database")?;
        db::migrate(&pool).await.context("failed to run migrations")?;

        let store = PostgresStore::new(pool.clone());
        store.migrate().await.context("failed to migrate session store")?;
        let directory = PgDirectory::new(pool).with_default_role(&settings.auth.default_role);
        tracing::info!("using PostgreSQL storage");
        app(store, provider, Arc::new(directory), key, session_config, &settings)
    } else {
        let directory = MemoryDirectory::new(&settings.auth.default_role);
        tracing::warn!("no database configured, users and sessions are kept in memory");
        app(
            ExpiringMemoryStore::new(),
            provider,
            Arc::new(directory),
            key,
            session_config,
            &settings,
        )
    };

    let listener = tokio::net::TcpListener::bind(&settings.server.addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.server.addr))?;
    tracing::info!("Server listening on {}", settings.server.addr);

    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}

/// Build the application on `store`, which also holds the flow records.
/// Expired records are purged every minute.
fn app<St>(
    store: St,
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn UserDirectory>,
    key: Key,
    session_config: SessionConfig,
    settings: &Settings,
) -> Router
where
    St: SessionStore + ExpiredDeletion + Clone,
{
    tokio::task::spawn(
        store
            .clone()
            .continuously_delete_expired(Duration::from_secs(60)),
    );

    let flows = FlowSessions::new(Arc::new(store.clone()), key.clone())
        .with_secure(settings.session.secure);
    let sessions = Sessions::new(Arc::new(store.clone()), key, session_config);
    let state = AuthState::new(provider, directory, flows, sessions.clone())
        .with_privileged_role(&settings.auth.privileged_role);

    let admin = auth::require_privileged(Router::new().route("/admin", get(admin)), &state);
    let routes = Router::new()
        .route("/", get(home))
        .merge(admin)
        .merge(auth::router(state.clone()));
    let routes = auth::with_current_user(routes, &state);
    auth::with_sessions(routes, store, &sessions)
}

async fn home(user: Option<CurrentUser>) -> String {
    match user {
        Some(CurrentUser(user)) => format!("Hello, {}!", user.id),
        None => "Hello, anonymous! Sign in at /login".to_string(),
    }
}

async fn admin(CurrentUser(user): CurrentUser) -> String {
    format!("Welcome to the admin area, {} ({})", user.id, user.role)
}
