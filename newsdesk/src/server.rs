use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, post, routes, Build, Rocket, State};
use serde::Serialize;

use common::{Category, Config};

use crate::processing::RunReport;
use crate::storage::{ArticleId, ArticleStore};
use crate::templates;
use crate::worker::WorkerControl;

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub config: Arc<Config>,
    pub store: ArticleStore,
    pub control: WorkerControl,
}

impl AppState {
    pub fn new(config: Arc<Config>, control: WorkerControl) -> Self {
        let store = ArticleStore::new(&config.storage.articles_dir);
        Self {
            started_at: Utc::now(),
            config,
            store,
            control,
        }
    }
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    article_count: usize,
    categories: Vec<Category>,
    interval_minutes: u64,
    last_run: Option<RunReport>,
}

/// Listing of every stored article. A malformed stored file fails the whole page.
#[get("/")]
async fn index(state: &State<AppState>) -> Result<RawHtml<String>, Status> {
    let articles = state.store.list().await.map_err(|e| {
        tracing::error!("failed to list articles: {:#}", e);
        Status::InternalServerError
    })?;
    Ok(RawHtml(templates::render_index(&articles)))
}

/// Stored document verbatim. Ids that are not plain hex never reach the filesystem.
#[get("/article/<id>")]
async fn article(state: &State<AppState>, id: &str) -> Result<RawHtml<String>, Status> {
    let raw = id.strip_suffix(".html").unwrap_or(id);
    let Some(id) = ArticleId::parse(raw) else {
        tracing::debug!(id = raw, "rejecting malformed article id");
        return Err(Status::NotFound);
    };

    match state.store.read(&id).await {
        Ok(Some(html)) => Ok(RawHtml(html)),
        Ok(None) => Err(Status::NotFound),
        Err(e) => {
            tracing::error!(%id, "failed to read article: {:#}", e);
            Err(Status::InternalServerError)
        }
    }
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning simple JSON with uptime and the last pipeline run.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Result<Json<StatusResponse>, Status> {
    let article_count = state
        .store
        .list()
        .await
        .map(|a| a.len())
        .map_err(|e| {
            tracing::error!("failed to list articles: {:#}", e);
            Status::InternalServerError
        })?;

    Ok(Json(StatusResponse {
        status: "ok",
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        article_count,
        categories: state.config.news.categories.clone(),
        interval_minutes: state.config.scheduler.interval_minutes,
        last_run: state.control.last_run().await,
    }))
}

/// Ask the background worker to run the pipeline now.
#[post("/api/v1/refresh")]
async fn refresh(state: &State<AppState>) -> Status {
    tracing::info!("refresh requested over HTTP");
    state.control.request_refresh();
    Status::Accepted
}

#[catch(404)]
fn not_found() -> RawHtml<&'static str> {
    RawHtml("<!DOCTYPE html><html><head><title>Not found</title></head><body><h1>Article not found</h1><p><a href=\"/\">Back to the index</a></p></body></html>")
}

/// Build the Rocket instance with managed state and mounted routes.
pub fn build_rocket(state: AppState, figment: rocket::figment::Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![index, article, health, status, refresh])
        .register("/", catchers![not_found])
}

/// Build and launch a Rocket server bound to `[server] bind/port`.
///
/// This function blocks until the Rocket server shuts down (it awaits `rocket.launch().await`)
/// and returns an error if Rocket fails to start.
pub async fn launch_rocket(state: AppState) -> Result<()> {
    let fig = rocket::Config::figment()
        .merge(("address", state.config.server.bind.clone()))
        .merge(("port", state.config.server.port));

    tracing::info!(
        bind = %state.config.server.bind,
        port = state.config.server.port,
        "Starting Rocket HTTP server"
    );
    build_rocket(state, fig)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
