use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fintrace_core::tools::{InvokeError, ToolDescriptor, Toolbox};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fintrace_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let toolbox = match Toolbox::from_settings(&settings) {
        Ok(toolbox) => toolbox,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "failed to build tool providers");
            return Err(e);
        }
    };
    if settings.finnhub_api_key.is_none() {
        tracing::warn!("FINNHUB_API_KEY missing; news tool will report errors until it is set");
    }

    let state = AppState {
        toolbox: Arc::new(toolbox),
    };
    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "tool host listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/tools", get(list_tools))
        .route("/tools/:name", post(call_tool))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    toolbox: Arc<Toolbox>,
}

async fn list_tools() -> Json<Vec<ToolDescriptor>> {
    Json(Toolbox::descriptors())
}

async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    match state.toolbox.invoke(&name, &args).await {
        Ok(value) => Ok(Json(value)),
        Err(err @ InvokeError::UnknownTool(_)) => Err((StatusCode::NOT_FOUND, err.to_string())),
        Err(err @ InvokeError::MissingTicker) => Err((StatusCode::BAD_REQUEST, err.to_string())),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &fintrace_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
