/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use contacts_api::{app::{build_router, AppState}, config::Config};
/// use contacts_shared::services::{
///     avatar::CloudinaryImageHost,
///     email::SmtpEmailSender,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = sqlx::PgPool::connect(&config.database.url).await?;
/// let mailer = Arc::new(SmtpEmailSender::new(config.mail.clone())?);
/// let images = Arc::new(CloudinaryImageHost::new(config.cloudinary.clone())?);
///
/// let state = AppState::new(pool, config, mailer, images)?;
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{
        rate_limit::{profile_rate_limit, RateLimiter},
        security::SecurityHeadersLayer,
    },
    routes,
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use contacts_shared::auth::{
    jwt::{JwtKeys, TokenError},
    middleware::authenticate,
};
use contacts_shared::services::{avatar::ImageHost, email::EmailSender};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted request body (avatar uploads included)
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; every field is
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Signing keys derived from `config.jwt`
    pub jwt: JwtKeys,

    pub mailer: Arc<dyn EmailSender>,
    pub images: Arc<dyn ImageHost>,

    /// `None` when no Redis is configured
    pub rate_limiter: Option<RateLimiter>,
}

impl AppState {
    /// Creates application state without rate limiting
    ///
    /// # Errors
    ///
    /// Returns an error if the configured JWT algorithm is not supported.
    pub fn new(
        db: PgPool,
        config: Config,
        mailer: Arc<dyn EmailSender>,
        images: Arc<dyn ImageHost>,
    ) -> Result<Self, TokenError> {
        let jwt = config.jwt_keys()?;

        Ok(Self {
            db,
            config: Arc::new(config),
            jwt,
            mailer,
            images,
            rate_limiter: None,
        })
    }

    /// Enables rate limiting
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Routes
///
/// ```text
/// GET    /                               welcome (public)
/// GET    /health                         database check (public)
/// POST   /auth/register                  (public)
/// POST   /auth/login                     (public)
/// POST   /auth/reset-password-request    (public)
/// POST   /auth/reset-password            (public)
/// POST   /auth/request-email             (public)
/// GET    /auth/confirmed-email/:token    (public)
/// GET    /users/me                       bearer, rate limited
/// PATCH  /users/avatar                   bearer, admin
/// PATCH  /users/:id/role                 bearer, admin
/// GET    /contacts/                      bearer
/// POST   /contacts/                      bearer
/// GET    /contacts/search/?query=        bearer
/// GET    /contacts/birthdays/upcoming    bearer
/// GET    /contacts/:id                   bearer
/// PUT    /contacts/:id                   bearer
/// DELETE /contacts/:id                   bearer
/// ```
///
/// Collection paths answer with and without the trailing slash.
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, then per-route
/// authentication and rate limiting.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route(
            "/auth/reset-password-request",
            post(routes::auth::reset_password_request),
        )
        .route("/auth/reset-password", post(routes::auth::reset_password))
        .route("/auth/request-email", post(routes::auth::request_email))
        .route(
            "/auth/confirmed-email/:token",
            get(routes::auth::confirmed_email),
        );

    // Rate limiting reads AuthContext, so authentication must wrap it
    let profile_routes = Router::new()
        .route("/users/me", get(routes::users::me))
        .route_layer(from_fn_with_state(state.clone(), profile_rate_limit));

    let protected_routes = Router::new()
        .merge(profile_routes)
        .route("/users/avatar", patch(routes::users::update_avatar))
        .route("/users/:id/role", patch(routes::users::update_role))
        .route(
            "/contacts",
            get(routes::contacts::list_contacts).post(routes::contacts::create_contact),
        )
        .route(
            "/contacts/",
            get(routes::contacts::list_contacts).post(routes::contacts::create_contact),
        )
        .route("/contacts/search", get(routes::contacts::search_contacts))
        .route("/contacts/search/", get(routes::contacts::search_contacts))
        .route(
            "/contacts/birthdays/upcoming",
            get(routes::contacts::upcoming_birthdays),
        )
        .route(
            "/contacts/:id",
            get(routes::contacts::get_contact)
                .put(routes::contacts::update_contact)
                .delete(routes::contacts::delete_contact),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.iter().any(|origin| origin == "*") {
        // Wildcard origins cannot be combined with credentials
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    base.allow_origin(origins).allow_credentials(true)
}

/// Bearer authentication middleware
///
/// Resolves the token to a stored user and inserts an
/// [`AuthContext`](contacts_shared::auth::middleware::AuthContext) into
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(&state.db, &state.jwt, req.headers()).await?;

    tracing::debug!(user_id = auth.user_id(), "Request authenticated");
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

