//! HTTP Server implementation
//!
//! This module provides the HTTP server using Axum framework with:
//! - Configurable host/port binding
//! - Graceful shutdown handling
//! - Public and token-gated route groups
//! - CORS restricted to the configured origins

use crate::api::handlers::AppState;
use crate::api::middleware::trace_id_middleware;
use crate::api::routes::{build_api_routes, build_public_routes};
use crate::auth::{AuthGate, AuthService, PasswordHasher, TokenService};
use crate::catalog::TmdbClient;
use crate::core::config::{Config, ServerConfig};
use crate::db::{DatabaseManager, UserRepository};
use axum::{
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
}

impl ApiServer {
    /// Wire every component from configuration
    ///
    /// Fails on a missing signing secret or an unusable catalog client, so
    /// misconfiguration stops the process before it accepts connections.
    pub fn new(config: Config, db: Arc<DatabaseManager>) -> anyhow::Result<Self> {
        let server_config = config.server.clone();
        let state = Self::build_state(&config, db)?;
        let router = Self::build_router(state, &config.security.allowed_origins);

        Ok(Self {
            router,
            config: server_config,
        })
    }

    fn build_state(config: &Config, db: Arc<DatabaseManager>) -> anyhow::Result<AppState> {
        let tokens = Arc::new(TokenService::from_config(&config.security)?);
        let hasher = PasswordHasher::new(config.security.bcrypt_cost);
        let store = Arc::new(UserRepository::new(db.clone()));
        let catalog = Arc::new(TmdbClient::new(&config.catalog)?);

        info!(
            token_lifetime = tokens.lifetime_secs(),
            bcrypt_cost = hasher.cost(),
            "Authentication configured"
        );

        Ok(AppState {
            auth: Arc::new(AuthService::new(store, hasher, tokens.clone())),
            gate: AuthGate::new(tokens),
            catalog,
            db,
        })
    }

    /// Build the Axum router with all routes and middleware
    fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
        Router::new()
            .merge(build_public_routes(state.clone()))
            .merge(build_api_routes(state))
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::from_fn(trace_id_middleware))
                    .layer(TraceLayer::new_for_http())
                    .layer(Self::build_cors_layer(allowed_origins)),
            )
    }

    /// Build CORS layer from allowed origins configuration
    fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION]);

        if allowed_origins.iter().any(|o| o == "*") {
            return cors.allow_origin(AllowOrigin::any());
        }

        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        cors.allow_origin(origins)
    }

    /// Start the HTTP server and listen for requests
    ///
    /// This method will block until the server is shut down gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;
        info!(addr = %socket_addr, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server shut down gracefully");

        Ok(())
    }

    /// Get a reference to the router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::TRACE_ID_HEADER;
    use crate::catalog::client::tests::{spawn_upstream, TEST_TOKEN};
    use crate::core::config::test_config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn server_with(config: Config) -> ApiServer {
        let db = Arc::new(DatabaseManager::new_in_memory().unwrap());
        ApiServer::new(config, db).unwrap()
    }

    fn server() -> ApiServer {
        server_with(test_config())
    }

    async fn server_with_upstream() -> ApiServer {
        let mut config = test_config();
        config.catalog.base_url = spawn_upstream().await;
        config.catalog.api_token = TEST_TOKEN.to_string();
        server_with(config)
    }

    async fn send(server: &ApiServer, request: Request<Body>) -> Response {
        server.router().clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn register(server: &ApiServer, email: &str) -> Value {
        let response = send(
            server,
            post_json(
                "/api/auth/register",
                json!({"email": email, "username": "a", "password": "secret123"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[test]
    fn test_missing_secret_fails_startup() {
        let mut config = test_config();
        config.security.jwt_secret = String::new();

        let db = Arc::new(DatabaseManager::new_in_memory().unwrap());
        assert!(ApiServer::new(config, db).is_err());
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = server();
        let response = send(&server, get_with_token("/health", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(TRACE_ID_HEADER));

        let value = body_json(response).await;
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["components"]["database"]["status"], "healthy");
        assert!(value["version"].is_string());
    }

    #[tokio::test]
    async fn test_register_then_use_token() {
        let server = server();

        let registered = register(&server, "a@b.com").await;
        assert_eq!(registered["email"], "a@b.com");
        assert_eq!(registered["username"], "a");
        assert!(registered["id"].is_i64());
        let token = registered["token"].as_str().unwrap().to_string();

        let response = send(&server, get_with_token("/api/me", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let me = body_json(response).await;
        assert_eq!(me["id"], registered["id"]);
        assert!(me.get("password_hash").is_none());

        let response = send(&server, get_with_token("/api/me", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let truncated = &token[..token.len() - 1];
        let response = send(&server, get_with_token("/api/me", Some(truncated))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let trace_id = response.headers()[TRACE_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        let value = body_json(response).await;
        assert_eq!(value["error"], "AuthenticationError");
        assert_eq!(value["message"], "Unauthorized");
        assert_eq!(value["trace_id"], trace_id.as_str());
    }

    #[tokio::test]
    async fn test_register_conflict_and_validation() {
        let server = server();
        register(&server, "a@b.com").await;

        let response = send(
            &server,
            post_json(
                "/api/auth/register",
                json!({"email": "a@b.com", "username": "b", "password": "x"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(
            &server,
            post_json(
                "/api/auth/register",
                json!({"email": "no-at-sign", "username": "b", "password": "x"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &server,
            post_json("/api/auth/register", json!({"email": "c@d.com"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &server,
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login() {
        let server = server();
        let registered = register(&server, "real@x.com").await;

        let response = send(
            &server,
            post_json(
                "/api/auth/login",
                json!({"email": "real@x.com", "password": "secret123"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let session = body_json(response).await;
        assert_eq!(session["id"], registered["id"]);
        assert!(session["token"].is_string());

        let unknown = send(
            &server,
            post_json(
                "/api/auth/login",
                json!({"email": "unknown@x.com", "password": "anything"}),
            ),
        )
        .await;
        let wrong = send(
            &server,
            post_json(
                "/api/auth/login",
                json!({"email": "real@x.com", "password": "wrongpass"}),
            ),
        )
        .await;

        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        let unknown = body_json(unknown).await;
        let wrong = body_json(wrong).await;
        assert_eq!(unknown["error"], wrong["error"]);
        assert_eq!(unknown["message"], wrong["message"]);
    }

    #[tokio::test]
    async fn test_movie_routes_are_gated() {
        let server = server();

        for uri in [
            "/api/movies/trending",
            "/api/movies/popular",
            "/api/movies/search?query=x",
            "/api/movies/discover?genre=28",
            "/api/movies/603",
            "/api/movies/genres/28",
        ] {
            let response = send(&server, get_with_token(uri, None)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_movie_routes_proxy_upstream() {
        let server = server_with_upstream().await;
        let token = register(&server, "m@x.com").await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = send(&server, get_with_token("/api/movies/trending", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(page["page"], 1);
        assert!(page.get("total_results").is_none());
        assert!(page["results"][0].get("popularity").is_none());

        let response = send(&server, get_with_token("/api/movies/popular", Some(&token))).await;
        assert_eq!(body_json(response).await["results"][0]["title"], "popular?page=1");

        let response = send(
            &server,
            get_with_token("/api/movies/genres/35?page=4", Some(&token)),
        )
        .await;
        assert_eq!(
            body_json(response).await["results"][0]["title"],
            "discover?with_genres=35&page=4&sort_by=popularity.desc"
        );

        let response = send(&server, get_with_token("/api/movies/603", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let movie = body_json(response).await;
        assert_eq!(movie["id"], 603);
        assert!(movie.get("budget").is_none());

        let response = send(&server, get_with_token("/api/movies/404", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&server, get_with_token("/api/movies/500", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_movie_parameter_validation() {
        let server = server();
        let token = register(&server, "v@x.com").await["token"]
            .as_str()
            .unwrap()
            .to_string();

        for uri in [
            "/api/movies/search",
            "/api/movies/search?query=",
            "/api/movies/discover",
            "/api/movies/popular?page=abc",
            "/api/movies/not-a-number",
        ] {
            let response = send(&server, get_with_token(uri, Some(&token))).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_cors_restricted_to_configured_origin() {
        let mut config = test_config();
        config.security.allowed_origins = vec!["http://localhost:3000".to_string()];
        let server = server_with(config);

        let preflight = |origin: &str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/api/auth/login")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap()
        };

        let allowed = send(&server, preflight("http://localhost:3000")).await;
        assert_eq!(
            allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );

        let denied = send(&server, preflight("http://evil.example")).await;
        assert!(denied
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
