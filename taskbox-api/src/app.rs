//! Application state and router builder
//!
//! # Router layout
//!
//! ```text
//! /
//! ├── /health                       # public
//! └── /api/v1/
//!     ├── /auth/                    # public
//!     │   ├── POST /register
//!     │   ├── POST /login
//!     │   └── POST /refresh
//!     ├── /users/                   # bearer token required
//!     │   ├── GET|PUT|DELETE /me
//!     │   ├── GET /                 # admin
//!     │   └── GET|PUT|DELETE /:id   # admin
//!     ├── /tasks/                   # bearer token required
//!     ├── /categories/              # bearer token required
//!     └── /tags/                    # bearer token required
//! ```
//!
//! The authentication layer is attached per-subtree: the auth and health
//! routers never see it, everything else rejects before the handler runs.

use crate::config::Config;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskbox_shared::auth::middleware::{authenticate, AuthError};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned per request via Axum's `State`
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets the JWT signing secret
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Whether admins may act on other users' resources
    pub fn admin_override(&self) -> bool {
        self.config.auth.admin_cross_user_access
    }
}

/// Builds the complete Axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // User routes (self-service + admin management)
    let user_routes = Router::new()
        .route("/me", get(routes::users::get_me))
        .route("/me", put(routes::users::update_me))
        .route("/me", delete(routes::users::delete_me))
        .route("/", get(routes::users::list_users))
        .route("/:id", get(routes::users::get_user))
        .route("/:id", put(routes::users::update_user))
        .route("/:id", delete(routes::users::delete_user));

    // Task routes
    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/", get(routes::tasks::list_tasks))
        .route("/search", get(routes::tasks::search_tasks))
        .route("/stats", get(routes::tasks::task_stats))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id", put(routes::tasks::update_task))
        .route("/:id", delete(routes::tasks::delete_task))
        .route("/:id/tags/:tag_id", post(routes::tasks::attach_tag))
        .route("/:id/tags/:tag_id", delete(routes::tasks::detach_tag));

    // Category routes
    let category_routes = Router::new()
        .route("/", post(routes::categories::create_category))
        .route("/", get(routes::categories::list_categories))
        .route("/stats", get(routes::categories::category_stats))
        .route("/:id", get(routes::categories::get_category))
        .route("/:id", put(routes::categories::update_category))
        .route("/:id", delete(routes::categories::delete_category));

    // Tag routes
    let tag_routes = Router::new()
        .route("/", post(routes::tags::create_tag))
        .route("/", get(routes::tags::list_tags))
        .route("/stats", get(routes::tags::tag_stats))
        .route("/:id", get(routes::tags::get_tag))
        .route("/:id", put(routes::tags::update_tag))
        .route("/:id", delete(routes::tags::delete_tag));

    // Everything except auth requires a valid access token
    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/tasks", task_routes)
        .nest("/categories", category_routes)
        .nest("/tags", tag_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer.
///
/// Delegates to the shared authenticator and injects the resolved
/// `AuthContext` into request extensions. Any failure short-circuits with
/// the uniform 401 from `AuthError`.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_context = authenticate(&req, state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
