use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use url::Url;

use agent_md::negotiate::{Negotiator, markdown_middleware};
use agent_md::options::NegotiationOptions;

/// Serve a static site, answering Markdown to agents that ask for it.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Directory of rendered HTML to serve.
    #[arg(long)]
    root: PathBuf,

    /// YAML negotiation options.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL for the self-fetch (overrides the config file).
    #[arg(long)]
    origin: Option<Url>,

    /// Pre-built Markdown directory (overrides the config file).
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    agent_md::logging::init("info,tower_http=debug")?;

    let args = ServeArgs::parse();
    tracing::info!(?args, "starting agent-md-serve");

    if !args.root.is_dir() {
        anyhow::bail!("site root is not a directory: {}", args.root.display());
    }

    let mut options = match &args.config {
        Some(path) => agent_md::options::load(path)?,
        None => NegotiationOptions::default(),
    };
    if let Some(origin) = args.origin {
        options.origin = Some(origin);
    }
    if let Some(dir) = args.artifacts_dir {
        options.artifacts_dir = Some(dir);
    }
    tracing::debug!(?options, "negotiation options");

    let negotiator = Arc::new(Negotiator::new(options).context("build negotiator")?);

    let app = Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .fallback_service(ServeDir::new(&args.root))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(
                    negotiator,
                    markdown_middleware,
                )),
        );

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, root = %args.root.display(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
