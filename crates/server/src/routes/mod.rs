//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database round trip)
//! GET  /media/*                         - Stored images
//!
//! # Auth
//! POST /auth/signup                     - Create account and log in
//! POST /auth/login                      - Log in
//! POST /auth/logout                     - Log out
//!
//! # Catalog
//! GET  /api/cafes                       - All cafes
//! POST /api/cafes                       - Add a cafe (auth)
//! GET  /api/cafes/search                - Text + tag search
//! GET  /api/cafes/{id}                  - Cafe detail
//! PUT  /api/cafes/{id}                  - Edit a cafe (auth)
//! DELETE /api/cafes/{id}                - Delete a cafe (staff)
//! GET  /api/tags                        - All tags
//!
//! # Visits (auth, owner only)
//! POST /api/cafes/{id}/visits           - Log a visit (multipart)
//! GET  /api/visits/{id}                 - Visit detail
//! PUT  /api/visits/{id}                 - Edit a visit (multipart)
//! DELETE /api/visits/{id}               - Delete a visit
//! GET  /api/favorite-items/{id}         - Favorite item detail
//!
//! # Stickers (auth, owner only)
//! GET  /api/sticker-types               - Sticker catalog
//! POST /api/stickers                    - Place a sticker
//! PUT  /api/stickers/{id}               - Move/scale/rotate
//! DELETE /api/stickers/{id}             - Remove
//!
//! # Wishlist, profile, stats (auth)
//! GET  /api/wishlist                    - Wishlist
//! POST /api/wishlist                    - Add a cafe
//! DELETE /api/wishlist/{cafe_id}        - Remove a cafe
//! GET  /api/profile                     - Profile, visits and wishlist
//! GET  /api/profile/theme               - Current theme
//! POST /api/profile/theme/{theme}       - Switch theme
//! GET  /api/stats                       - Aggregate statistics
//! ```

pub mod auth;
pub mod cafes;
pub mod profile;
pub mod search;
pub mod stats;
pub mod stickers;
pub mod visits;
pub mod wishlist;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, post, put},
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::services::media::MEDIA_URL_PREFIX;
use crate::services::visit_submission::{MAX_FAVORITE_ITEMS, MAX_ITEM_PHOTOS, MAX_VISIT_PHOTOS};
use crate::state::AppState;

/// Multipart overhead allowed on top of the photo bytes of one submission.
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/cafes", get(cafes::index).post(cafes::create))
        .route("/cafes/search", get(search::search))
        .route(
            "/cafes/{id}",
            get(cafes::show).put(cafes::update).delete(cafes::destroy),
        )
        .route("/tags", get(cafes::tags))
        // Visits
        .route("/cafes/{id}/visits", post(visits::create))
        .route(
            "/visits/{id}",
            get(visits::show).put(visits::update).delete(visits::destroy),
        )
        .route("/favorite-items/{id}", get(visits::show_item))
        // Stickers
        .route("/sticker-types", get(stickers::types))
        .route("/stickers", post(stickers::place))
        .route(
            "/stickers/{id}",
            put(stickers::update).delete(stickers::destroy),
        )
        // Wishlist
        .route("/wishlist", get(wishlist::index).post(wishlist::add))
        .route("/wishlist/{cafe_id}", delete(wishlist::remove))
        // Profile
        .route("/profile", get(profile::show))
        .route("/profile/theme", get(profile::current_theme))
        .route("/profile/theme/{theme}", post(profile::set_theme))
        // Stats
        .route("/stats", get(stats::show))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Build the full application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let max_files = MAX_VISIT_PHOTOS + MAX_FAVORITE_ITEMS * MAX_ITEM_PHOTOS;
    let body_limit = config
        .max_upload_bytes
        .saturating_mul(max_files)
        .saturating_add(BODY_OVERHEAD_BYTES);
    let session_layer = create_session_layer(state.pool(), config);
    let media = ServeDir::new(state.media().root());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
        .nest_service(MEDIA_URL_PREFIX, media)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServerConfig;

    /// Router over a pool that never connects; only exercise handlers that
    /// don't reach the database.
    fn offline_app() -> Router {
        let dir = std::env::temp_dir();
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/unused"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            base_url: "http://localhost".to_string(),
            media_root: dir,
            max_upload_bytes: 1024,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        app(AppState::new(config, pool))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = offline_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = offline_app()
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_api_requires_login() {
        let response = offline_app()
            .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_anonymous_theme_is_default() {
        let response = offline_app()
            .oneshot(Request::get("/api/profile/theme").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["theme"], "default");
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let response = offline_app()
            .oneshot(
                Request::post("/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
