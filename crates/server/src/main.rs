use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use report_core::ReportContext;
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let shared_storage = Arc::new(storage.clone());
    let reports = ReportContext::new(shared_storage.clone(), shared_storage)
        .with_policy(settings.validation_policy())
        .with_photo_settings(settings.photo_settings());
    let state = AppState {
        reports,
        storage,
        history_limit: settings.history_limit,
        max_body_bytes: settings.max_body_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.max_body_bytes;
    Router::new()
        .route("/healthz", get(api::healthz))
        .route("/session", get(api::current_session))
        .route("/sectors", get(api::list_sectors))
        .route("/reports", post(api::create_report))
        .route("/reports/mine", get(api::my_reports))
        .route(
            "/reports/:report_id",
            get(api::get_own_report).put(api::modify_report),
        )
        .route("/admin/reports", get(api::admin_table))
        .route("/admin/reports/table", get(api::admin_table_html))
        .route("/admin/reports/:report_id", get(api::admin_report_detail))
        .route(
            "/admin/reports/:report_id/triage",
            post(api::triage_report),
        )
        .route("/photos/*photo_ref", get(api::download_photo))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
