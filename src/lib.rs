//! GSGROUPS site backend - library for app logic and testing

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod listing;
pub mod logging;
pub mod routes;
pub mod widgets;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use config::AppConfig;
use db::{MemoryStore, PgStore, Store};
use identity::{HostedIdentity, IdentityProvider, LocalIdentity};

/// Shared handles every handler gets through `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<AppConfig>,
}

/// CORS for the configured frontend origins.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(routes::admin::dashboard))
        .route(
            "/projects",
            get(routes::admin::list_projects).post(routes::admin::create_project),
        )
        .route("/projects/{slug}", patch(routes::admin::update_project))
        .route(
            "/posts",
            get(routes::admin::list_posts).post(routes::admin::create_post),
        )
        .route(
            "/posts/{slug}",
            patch(routes::admin::update_post).delete(routes::admin::delete_post),
        )
        .route("/users", get(routes::admin::list_users))
        .route("/users/{id}", patch(routes::admin::update_user))
        .route("/contacts", get(routes::admin::list_contacts))
        .route("/contacts/{id}", patch(routes::admin::update_contact))
        .route("/categories", post(routes::admin::create_category))
        .route_layer(middleware::from_fn_with_state(
            state,
            routes::admin::require_staff,
        ))
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config);
    let static_dir = state.config.static_dir.clone();

    let router = Router::new()
        // content
        .route("/api/portfolio", get(routes::portfolio::list_projects))
        .route("/api/portfolio/{slug}", get(routes::portfolio::get_project))
        .route("/api/categories", get(routes::portfolio::list_categories))
        .route("/api/blog", get(routes::blog::list_posts))
        .route("/api/blog/{slug}", get(routes::blog::get_post))
        .route("/rss.xml", get(routes::rss::rss_feed))
        // forms
        .route("/api/contact", post(routes::forms::submit_contact))
        .route("/api/newsletter", post(routes::forms::subscribe))
        .route("/api/newsletter/unsubscribe", post(routes::forms::unsubscribe))
        // widgets
        .route("/api/booking/options", get(routes::booking::options))
        .route("/api/booking", post(routes::booking::submit))
        .route(
            "/api/chat",
            get(routes::chat::greeting).post(routes::chat::reply),
        )
        // auth
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/sign-up", post(routes::auth::sign_up))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/session", get(routes::auth::session))
        .route("/api/auth/oauth/{provider}", get(routes::auth::oauth_start))
        .route("/auth/callback", get(routes::auth::oauth_callback))
        .route("/api/profile", patch(routes::auth::update_profile))
        .nest("/api/admin", admin_routes(state.clone()))
        // ops
        .route("/api/logs", post(routes::logs::receive_client_logs))
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
}

/// Picks PostgreSQL when `DATABASE_URL` is set and reachable, else the in-memory store.
async fn build_store() -> Arc<dyn Store> {
    if std::env::var("DATABASE_URL").is_err() {
        tracing::info!("DATABASE_URL not set. Using the in-memory store.");
        return Arc::new(MemoryStore::new());
    }

    match db::init_pool(None).await {
        Ok(pool) => {
            if let Err(e) = db::run_migrations(&pool).await {
                tracing::error!("Failed to run database migrations: {}", e);
            }
            Arc::new(PgStore::new(pool))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Falling back to the in-memory store.",
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

async fn build_identity(
    config: &AppConfig,
    store: Arc<dyn Store>,
) -> Result<Arc<dyn IdentityProvider>, String> {
    if let Some(hosted) = &config.hosted_identity {
        tracing::info!(url = %hosted.url, "using hosted identity provider");
        let provider = HostedIdentity::new(hosted).map_err(|e| e.to_string())?;
        return Ok(Arc::new(provider));
    }

    tracing::info!("using local identity provider");
    let local = LocalIdentity::new(store, config.jwt_secret.clone());

    if let Some(email) = &config.admin_email {
        let hash = match (&config.admin_password_hash, &config.admin_password) {
            (Some(hash), _) => Some(hash.clone()),
            (None, Some(password)) => {
                tracing::warn!("ADMIN_PASSWORD is set in plain text; prefer ADMIN_PASSWORD_HASH");
                let password = password.clone();
                tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
                    .await
                    .map_err(|e| e.to_string())?
                    .map(Some)
                    .map_err(|e| e.to_string())?
            }
            (None, None) => {
                tracing::warn!("ADMIN_EMAIL is set without ADMIN_PASSWORD_HASH; no admin bootstrapped");
                None
            }
        };

        if let Some(hash) = hash {
            local
                .bootstrap_admin(email, &hash)
                .await
                .map_err(|e| e.to_string())?;
        }
    }

    Ok(Arc::new(local))
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Held for the process lifetime; dropping them loses buffered log lines.
    let _log_guards = logging::init(config.environment);

    routes::health::init_start_time();

    let problems = config.startup_problems();
    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!("FATAL: {}", problem);
        }
        panic!("Refusing to start: {}", problems.join("; "));
    }

    let store = build_store().await;
    let identity = match build_identity(&config, store.clone()).await {
        Ok(identity) => identity,
        Err(e) => panic!("Failed to set up identity provider: {}", e),
    };

    let addr: SocketAddr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => panic!("Invalid HOST/PORT configuration: {}", e),
    };

    let state = AppState {
        store,
        identity,
        config: Arc::new(config),
    };
    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => panic!("Failed to bind to {}: {}", addr, e),
    };

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("Server error: {}", e);
    }
}
