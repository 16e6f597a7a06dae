mod api;
mod error;
mod recipe;
mod session;
mod spoonacular;
mod templates;
mod web;

use error::*;
use recipe::*;
use session::*;
use spoonacular::*;
use templates::*;

extern crate log;
extern crate mime;

use axum::{
    self,
    extract::{Form, Json, Path, Query, State},
    http::{self, HeaderMap, StatusCode},
    response::{self, IntoResponse},
    routing,
};
use chrono::TimeDelta;
use clap::Parser;
use serde::Deserialize;
use tokio::{net, signal, sync::RwLock, time::Duration};
use tower_http::{services, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::sync::Arc;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1")]
    ip: String,
    #[arg(short, long, default_value = "3000")]
    port: u16,
    /// Spoonacular API key.
    #[arg(long = "api-key", env = "SPOONACULAR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long = "api-base", env = "SPOONACULAR_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,
    /// Recipes returned per search.
    #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=100))]
    results: u32,
    /// Idle sessions are forgotten after this many hours.
    #[arg(long = "session-ttl-hours", default_value = "24", value_parser = clap::value_parser!(i64).range(1..=8760))]
    session_ttl_hours: i64,
    #[arg(long, default_value = "assets/static")]
    assets: std::path::PathBuf,
}

struct AppState {
    source: Arc<dyn RecipeSource>,
    sessions: Arc<dyn SessionStore>,
}

type SharedAppState = Arc<AppState>;

fn require_api_key(api_key: Option<&str>) -> Result<&str, RecipeError> {
    match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(RecipeError::MissingApiKey),
    }
}

async fn handler_404() -> response::Response {
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}

fn app(state: SharedAppState, assets: &std::path::Path) -> axum::Router {
    let trace_layer = trace::TraceLayer::new_for_http()
        .make_span_with(trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
        .on_response(trace::DefaultOnResponse::new().level(tracing::Level::INFO));

    axum::Router::new()
        .route("/", routing::get(web::index).post(web::post_search))
        .route("/recipe/{id}", routing::get(web::get_recipe))
        .route("/recipe-json/{id}", routing::get(api::get_recipe))
        .route("/add_to_favorites/{id}", routing::get(web::add_favorite))
        .route("/remove_from_favorites/{id}", routing::get(web::remove_favorite))
        .route("/favorites", routing::get(web::favorites))
        .route(
            "/shopping-list",
            routing::get(web::shopping_list).post(web::add_item),
        )
        .route("/shopping-list/remove/{index}", routing::post(web::remove_item))
        .route("/shopping-list/recipe/{id}", routing::post(web::add_recipe_items))
        .route_service(
            "/manifest.json",
            services::ServeFile::new_with_mime(assets.join("manifest.json"), &mime::APPLICATION_JSON),
        )
        .nest_service("/static", services::ServeDir::new(assets))
        .fallback(handler_404)
        .layer(trace_layer)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("cannot listen for Ctrl+C: {}", e);
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
                tracing::error!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C (SIGINT) signal.");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal.");
        },
    }

    tracing::info!("Shutting down, letting in-flight requests finish...");
}

/// Log filter from `RUST_LOG`, falling back to debug for this crate.
fn log_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recipe_finder=debug,tower_http=info".into())
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG may come from .env
    let dotenv = dotenv::dotenv();
    let tsf = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry().with(tsf).with(log_filter()).init();

    if let Err(e) = dotenv {
        log::debug!("no .env file loaded: {}", e);
    }
    let args = Args::parse();

    let api_key = require_api_key(args.api_key.as_deref())?;
    let source = Spoonacular::new(&args.api_base, api_key.to_string(), args.results)?;
    let sessions = MemorySessionStore::new(TimeDelta::hours(args.session_ttl_hours));
    let state = Arc::new(AppState {
        source: Arc::new(source),
        sessions: Arc::new(sessions),
    });

    log::info!("Starting against {}...", args.api_base);
    let app = app(state, &args.assets);

    let endpoint = format!("{}:{}", args.ip, args.port);
    let listener = net::TcpListener::bind(&endpoint).await?;
    log::info!("started: listening on {}", endpoint);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = serve().await {
        eprintln!("recipe-finder: error: {}", err);
        std::process::exit(1);
    }
}
