//! Bearer Gateway
//!
//! Reference host for the `bearer-auth` strategy:
//! 1. Loads strategies and protected routes from TOML
//! 2. Registers one bearer strategy per credentials file
//! 3. Guards each configured route with its strategy list
//! 4. Echoes the resolved credentials back to authenticated callers

mod config;
mod metrics;
mod store;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use bearer_auth::{AuthContext, Strategies, StrategyConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, RouteEntry, StrategyEntry};
use crate::store::TokenStore;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    started_at: Instant,
    strategies: Arc<[String]>,
    prometheus: PrometheusHandle,
}

/// Register one bearer strategy per config entry, each backed by its own
/// credentials file.
fn build_strategies(entries: &[StrategyEntry]) -> Result<Strategies> {
    let mut strategies = Strategies::new();
    for entry in entries {
        let store = TokenStore::load(&entry.credentials_file)
            .with_context(|| format!("failed to load credentials for strategy {}", entry.name))?;
        strategies
            .register(&entry.name, StrategyConfig::new(store).base64(entry.base64))
            .with_context(|| format!("failed to register strategy {}", entry.name))?;
    }
    Ok(strategies)
}

/// Build the axum router: open health/metrics endpoints plus one guarded
/// router per configured route.
///
/// Applies a concurrency limit layer based on `max_connections`.
fn build_router(
    state: AppState,
    strategies: &Strategies,
    routes: &[RouteEntry],
    max_connections: usize,
) -> bearer_auth::Result<Router> {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    for route in routes {
        let guard = strategies.guard(route.strategies.as_slice())?;
        let protected =
            Router::new().route(&route.path, get(whoami_handler).post(whoami_handler));
        app = app.merge(bearer_auth::protect(protected, guard));
    }

    Ok(app
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting bearer-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder()?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        strategies = config.strategies.len(),
        routes = config.routes.len(),
        "configuration loaded"
    );

    let strategies = build_strategies(&config.strategies)?;

    let state = AppState {
        started_at: Instant::now(),
        strategies: config.strategies.iter().map(|s| s.name.clone()).collect(),
        prometheus,
    };

    let app = build_router(
        state,
        &strategies,
        &config.routes,
        config.server.max_connections,
    )
    .context("failed to guard configured routes")?;

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;

    info!(addr = %config.server.listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Liveness endpoint: uptime and the registered strategy names.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "strategies": &*state.strategies,
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Guarded endpoint: reports which strategy admitted the caller and the
/// credentials it resolved.
async fn whoami_handler(ctx: AuthContext) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "strategy": &*ctx.strategy,
        "credentials": ctx.credentials,
    }))
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use tower::ServiceExt;

    const TOKENS: &str = r#"
[[credentials]]
id = "rpaxn39848xrunpaw3489ruxnpa98w4rxn"
[credentials.data]
user = "alice"
"#;

    const PAIRS: &str = r#"
[[credentials]]
id = "werxhqb98"
token = "rpaxn39848xrunpaw3489ruxnpa98w4rxn"
[credentials.data]
user = "bob"
"#;

    /// Create a PrometheusHandle for tests without installing a global recorder.
    fn test_prometheus_handle() -> PrometheusHandle {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        recorder.handle()
    }

    /// Write credentials files and a config into a temp dir, then build the
    /// router exactly as `main` does.
    fn test_app() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tokens.toml"), TOKENS).unwrap();
        std::fs::write(dir.path().join("pairs.toml"), PAIRS).unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
listen_addr = "127.0.0.1:0"

[[strategies]]
name = "bearer"
credentials_file = "tokens.toml"

[[strategies]]
name = "bearer-base64"
base64 = true
credentials_file = "pairs.toml"

[[routes]]
path = "/bearer"
strategies = ["bearer"]

[[routes]]
path = "/bearer-base64"
strategies = ["bearer-base64"]
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        let strategies = build_strategies(&config.strategies).unwrap();
        let state = AppState {
            started_at: Instant::now(),
            strategies: config.strategies.iter().map(|s| s.name.clone()).collect(),
            prometheus: test_prometheus_handle(),
        };
        let app = build_router(state, &strategies, &config.routes, 1000).unwrap();
        (app, dir)
    }

    async fn call(
        app: Router,
        method: &str,
        path: &str,
        auth: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_lists_strategies() {
        let (app, _dir) = test_app();
        let response = call(app, "GET", "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(
            json["strategies"],
            serde_json::json!(["bearer", "bearer-base64"])
        );
    }

    #[tokio::test]
    async fn metrics_endpoint_is_unauthenticated() {
        let (app, _dir) = test_app();
        let response = call(app, "GET", "/metrics", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
    }

    #[tokio::test]
    async fn plain_route_echoes_credentials() {
        let (app, _dir) = test_app();
        let response = call(
            app,
            "POST",
            "/bearer",
            Some("Bearer rpaxn39848xrunpaw3489ruxnpa98w4rxn"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["strategy"], "bearer");
        assert_eq!(json["credentials"]["user"], "alice");
    }

    #[tokio::test]
    async fn base64_route_echoes_credentials() {
        let (app, _dir) = test_app();
        let header = format!(
            "Bearer {}",
            STANDARD.encode("werxhqb98:rpaxn39848xrunpaw3489ruxnpa98w4rxn")
        );
        let response = call(app, "GET", "/bearer-base64", Some(&header)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["strategy"], "bearer-base64");
        assert_eq!(json["credentials"]["user"], "bob");
    }

    #[tokio::test]
    async fn guarded_route_without_header_challenges() {
        let (app, _dir) = test_app();
        let response = call(app, "POST", "/bearer", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
        let json = body_json(response).await;
        assert_eq!(json["message"], "Missing authentication");
    }

    #[tokio::test]
    async fn wrong_pair_token_is_invalid() {
        let (app, _dir) = test_app();
        let header = format!("Bearer {}", STANDARD.encode("werxhqb98:guess"));
        let response = call(app, "POST", "/bearer-base64", Some(&header)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Invalid token");
    }

    #[tokio::test]
    async fn base64_token_on_plain_route_is_invalid() {
        let (app, _dir) = test_app();
        let header = format!(
            "Bearer {}",
            STANDARD.encode("werxhqb98:rpaxn39848xrunpaw3489ruxnpa98w4rxn")
        );
        let response = call(app, "POST", "/bearer", Some(&header)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn missing_credentials_file_fails_startup() {
        let entries = vec![StrategyEntry {
            name: "bearer".into(),
            base64: false,
            credentials_file: "/nonexistent/tokens.toml".into(),
        }];
        let err = build_strategies(&entries).err().unwrap();
        assert!(
            format!("{err:#}").contains("strategy bearer"),
            "startup error should name the strategy, got: {err:#}"
        );
    }

    #[test]
    fn bundled_example_config_builds() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("config")
            .join("bearer-gateway.toml");
        let config = Config::load(&path).unwrap();
        let strategies = build_strategies(&config.strategies).unwrap();
        assert_eq!(strategies.len(), 2);

        let state = AppState {
            started_at: Instant::now(),
            strategies: config.strategies.iter().map(|s| s.name.clone()).collect(),
            prometheus: test_prometheus_handle(),
        };
        assert!(build_router(state, &strategies, &config.routes, 1000).is_ok());
    }
}
