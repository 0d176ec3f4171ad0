//! The hello-world web skeleton.
//!
//! One route, `GET /`. On startup the configured database is opened and the
//! `people (name, age)` table is created if it does not exist.

use crate::config::Config;
use crate::error::Result;
use crate::schema::Schema;
use crate::store::{SqliteConfig, SqliteStore};
use crate::tutorial;
use axum::{response::Html, routing::get, Router};
use std::sync::Arc;

pub const HELLO_WORLD: &str = "<p> Hello, world. <p>";

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: SqliteStore,
}

impl AppState {
    /// Open the configured database and prepare the startup table.
    pub fn open(config: Config) -> Result<Self> {
        let store = SqliteStore::open(
            SqliteConfig::new(config.database_path()?, Schema::new()).with_echo(config.echo),
        )?;
        tutorial::create_people_text_table(&store)?;
        Ok(Self {
            config: Arc::new(config),
            store,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello_world))
        .with_state(state)
}

async fn hello_world() -> Html<&'static str> {
    Html(HELLO_WORLD)
}

/// Serve until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.bind_addr;
    if config.uses_default_secret() {
        tracing::warn!("SECRET_KEY is unset, using the development default");
    }
    let state = AppState::open(config)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
    }
}
