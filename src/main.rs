//! Jokes Backend
//!
//! REST backend for the joke catalog, persisted in a CouchDB-style document store.

mod api;
mod config;
mod db;
mod errors;
mod maintenance;
mod models;
mod service;

use std::sync::Arc;

use axum::{
    response::Redirect,
    routing::get,
    Json, Router,
};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::JokeRepository;
use service::JokeService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub jokes: JokeService,
}

/// Joke catalog backend.
#[derive(Parser)]
#[command(name = "jokes-backend")]
#[command(about = "REST backend for the joke catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Insert the sample joke if it is missing.
    Seed,
    /// Convert legacy single-field jokes to setup/punchline documents.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Store: {:?}, database '{}'", config.store, config.db_name);

    let store = match db::init_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to initialize document store: {}", e);
            return Err(e.into());
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let repo = Arc::new(JokeRepository::new(store));
            let state = AppState {
                jokes: JokeService::new(repo),
            };

            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
            tracing::info!("Server listening on {}", config.bind_addr);

            axum::serve(listener, app).await?;
        }
        Command::Seed => {
            let outcome = maintenance::seed_sample(store.as_ref()).await?;
            println!("Seed: {:?}", outcome);
        }
        Command::Migrate => {
            let report = maintenance::migrate_legacy(store.as_ref()).await?;
            println!(
                "Migration complete: {} converted, {} skipped, {} failed",
                report.converted, report.skipped, report.failed
            );
        }
    }

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // The browser front end calls the API cross-origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { Redirect::temporary("/health") }))
        .route("/health", get(health_check))
        .route("/jokes", get(api::list_jokes).post(api::create_joke))
        .route("/jokes/random", get(api::random_joke))
        .route("/jokes/{id}", get(api::get_joke).put(api::update_joke))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "ok": true }))
}
