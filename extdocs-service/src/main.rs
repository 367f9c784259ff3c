mod error;
mod routes;
mod state;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use extdocs_core::config::DEFAULT_CONFIG;
use extdocs_core::{
    BlockStore, Config, ContentRouter, GraphClient, ItemStore, MemoryItemStore, MemoryStore,
};
use state::{AppState, SharedState};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "extdocs-service",
    about = "Serve rendered extension documentation"
)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// TOML config file (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bearer token for the graph query API
    #[arg(
        long,
        env = "ROAM_API_TOKEN",
        hide_env_values = true,
        default_value = ""
    )]
    graph_token: String,

    /// Rewrite public site links to the development origin
    #[arg(long, env = "EXTDOCS_DEVELOPMENT")]
    development: bool,

    /// Serve blocks from a JSON export of pulled pages instead of the graph API
    #[arg(long)]
    graph_export: Option<PathBuf>,

    /// JSON array of extension metadata records
    #[arg(long)]
    items: Option<PathBuf>,
}

fn build_state(args: &Args) -> extdocs_core::Result<AppState> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_toml(DEFAULT_CONFIG)?,
    };
    config.graph.token = args.graph_token.clone();
    if args.development {
        config.site.development = true;
    }

    let (blocks, source) = match &args.graph_export {
        Some(path) => {
            let store = MemoryStore::load(path)?;
            tracing::info!(
                pages = store.page_count(),
                path = %path.display(),
                "loaded graph export"
            );
            (
                Arc::new(store) as Arc<dyn BlockStore>,
                format!("export:{}", path.display()),
            )
        }
        None => (
            Arc::new(GraphClient::new(&config)?) as Arc<dyn BlockStore>,
            format!("graph:{}", config.graph.name),
        ),
    };

    let items: Arc<dyn ItemStore> = match &args.items {
        Some(path) => Arc::new(MemoryItemStore::load(path)?),
        None => {
            tracing::warn!("no --items file given, every extension id will be unknown");
            Arc::new(MemoryItemStore::default())
        }
    };

    let router = ContentRouter::new(config, blocks, items)?;
    Ok(AppState::new(router, source))
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let state: SharedState = match build_state(&args) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            tracing::error!(error = %err, "failed to start");
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    let app = Router::new()
        .route("/request-path", get(routes::request_path))
        .route("/status", get(routes::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", args.bind, args.port);
    tracing::info!("extdocs-service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
