use axum::{
    extract::{FromRef, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::CalendarError;
use crate::loader::HtmlFetcher;
use crate::metrics::{FetchMetrics, MetricsCollector};
use crate::query::{self, OutputFormat};
use crate::service::CalendarService;

pub const EXAMPLE_URL: &str = "https://liquipedia.net/rocketleague/Liquipedia:Matches";

pub struct AppState<F: HtmlFetcher> {
    pub service: Arc<CalendarService<F>>,
    pub metrics: MetricsCollector,
    pub allowed_url_prefix: String,
    pub home_url: String,
}

impl<F: HtmlFetcher> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            metrics: self.metrics.clone(),
            allowed_url_prefix: self.allowed_url_prefix.clone(),
            home_url: self.home_url.clone(),
        }
    }
}

impl<F: HtmlFetcher> FromRef<AppState<F>> for MetricsCollector {
    fn from_ref(state: &AppState<F>) -> Self {
        state.metrics.clone()
    }
}

fn ics_response(body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=calendar.ics"),
        ],
        body,
    )
        .into_response()
}

fn error_response(err: CalendarError) -> Response {
    match err {
        CalendarError::InvalidRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
        CalendarError::FetchFailed { url, .. } => (
            StatusCode::BAD_REQUEST,
            format!(
                "Could not retrieve matches for '{}', most probably because the URL is not a Liquipedia match page. Example valid URL: {}",
                url, EXAMPLE_URL
            ),
        )
            .into_response(),
        CalendarError::UnknownPreset(_) => (StatusCode::NOT_FOUND, "Preset not found").into_response(),
        other => {
            error!("Request failed: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not retrieve matches").into_response()
        }
    }
}

pub async fn matches_handler<F: HtmlFetcher + 'static>(
    State(state): State<AppState<F>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let jobs = match query::jobs_from_query(&params, &state.allowed_url_prefix) {
        Ok(jobs) => jobs,
        Err(e) => return error_response(e),
    };

    match state.service.fetch_many(&jobs).await {
        Ok(events) => match OutputFormat::from_query(&params) {
            OutputFormat::Ics => ics_response(state.service.build_calendar(&events)),
            OutputFormat::Json => Json(events).into_response(),
        },
        Err(e) => error_response(e),
    }
}

pub async fn preset_handler<F: HtmlFetcher + 'static>(
    State(state): State<AppState<F>>,
    Path(name): Path<String>,
) -> Response {
    match state.service.preset_calendar(&name).await {
        Ok(ics) => ics_response(ics),
        Err(e) => error_response(e),
    }
}

#[axum::debug_handler]
pub async fn stats_handler(State(metrics): State<MetricsCollector>) -> Json<FetchMetrics> {
    Json(metrics.get_metrics())
}

pub async fn index_handler<F: HtmlFetcher + 'static>(State(state): State<AppState<F>>) -> Redirect {
    Redirect::temporary(&state.home_url)
}

async fn allow_any_origin(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for name in [
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::ACCESS_CONTROL_ALLOW_METHODS,
        header::ACCESS_CONTROL_ALLOW_HEADERS,
    ] {
        headers.insert(name, HeaderValue::from_static("*"));
    }
    response
}

pub fn router<F: HtmlFetcher + 'static>(state: AppState<F>) -> Router {
    Router::new()
        .route("/", get(index_handler::<F>))
        .route("/matches.ics", get(matches_handler::<F>))
        .route("/preset/{name}", get(preset_handler::<F>))
        .route("/stats", get(stats_handler))
        .layer(middleware::map_response(allow_any_origin))
        .with_state(state)
}

pub async fn serve<F: HtmlFetcher + 'static>(state: AppState<F>, server: &ServerConfig) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port)).await?;
    info!("Calendar service listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
