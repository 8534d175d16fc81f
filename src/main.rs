use std::env;
use std::path::Path;
use std::sync::Arc;

use log_region_mcp::bootstrap::{seed_if_empty, BootstrapLoader};
use log_region_mcp::config::{Config, ServerMode};
use log_region_mcp::error::Result;
use log_region_mcp::http::{bind_listener, serve_http};
use log_region_mcp::mcp::run_stdio;
use log_region_mcp::service::QueryService;
use log_region_mcp::store::LogStore;
use log_region_mcp::tools::ToolFacade;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the stdio transport, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match env::args().nth(1) {
        Some(path) => Config::load_from_path(Path::new(&path))?,
        None => Config::default(),
    };
    config.apply_env()?;
    info!(mode = ?config.server.mode, "starting");

    let tools = Arc::new(ToolFacade::new(&config.tools)?);

    match config.server.mode {
        ServerMode::Stdio => run_stdio(tools).await?,
        ServerMode::Http => {
            let service = init_service(&config).await?;
            let listener = bind_listener(&config.server.bind_addr()).await?;
            serve_http(listener, service, tools).await?;
        }
        ServerMode::Both => {
            let service = init_service(&config).await?;
            let listener = bind_listener(&config.server.bind_addr()).await?;
            // First failure on either side ends the process.
            tokio::try_join!(serve_http(listener, service, tools.clone()), run_stdio(tools))?;
        }
    }

    Ok(())
}

/// Open the store and seed demo data before any request is accepted.
async fn init_service(config: &Config) -> Result<Arc<QueryService>> {
    let store = LogStore::open(&config.store)?;
    let loader = BootstrapLoader::from_config(&config.store);
    seed_if_empty(&store, &loader).await?;
    Ok(Arc::new(QueryService::new(store)))
}
