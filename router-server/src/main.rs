//! Agent router HTTP service.
//!
//! Accepts coding tasks over HTTP, drives them through the model pipeline,
//! and serves dashboard views over the run workspace.

mod html;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use router::config::RouterConfig;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "router-server")]
#[command(about = "HTTP router for model-backed coding tasks")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on (overrides ROUTER_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Workspace root holding the status directories (overrides WORKSPACE_DIR)
    #[arg(long)]
    workspace_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("router_server=info".parse()?)
                .add_directive("router=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = RouterConfig::from_env().context("load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.workspace_dir {
        config.workspace_dir = dir;
    }
    let port = config.port;

    let state = AppState::new(config);
    state
        .store
        .ensure_layout()
        .context("create workspace layout")?;
    info!(workspace = %state.store.root().display(), "workspace ready");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::app_router().layer(cors).with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, port)
        .parse()
        .context("parse bind address")?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;
    axum::serve(listener, app).await.context("serve")?;

    Ok(())
}
