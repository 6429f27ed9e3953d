//! devgate - local API gateway and CDN emulator
//!
//! Runs an app's API handlers in sandboxes behind a local HTTP port, with
//! static assets served from a directory or proxied to a dev server.

use clap::{ArgGroup, Parser};
use devgate::{build_state, create_router, AssetsProxy, AssetsSource, Config};
use devgate_lambda::ExecutorMode;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "devgate")]
#[command(about = "Local API gateway and CDN emulator for serverless apps", long_about = None)]
#[command(group(
    ArgGroup::new("assets")
        .required(true)
        .args(["proxy_assets_url", "assets_pathname"]),
))]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "DEVGATE_PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "DEVGATE_HOST")]
    host: String,

    /// Deployment stage whose stack backs the proxy
    #[arg(short, long, default_value = "dev", env = "DEVGATE_STAGE")]
    stage: String,

    /// Configuration file
    #[arg(short, long, default_value = "devgate.toml", env = "DEVGATE_CONFIG")]
    config: PathBuf,

    /// Forward asset requests to this URL
    #[arg(long, env = "DEVGATE_PROXY_ASSETS_URL")]
    proxy_assets_url: Option<String>,

    /// Serve asset requests from this directory
    #[arg(long, env = "DEVGATE_ASSETS_PATHNAME")]
    assets_pathname: Option<PathBuf>,

    /// Sandbox executor: docker or subprocess (overrides the config file)
    #[arg(long, env = "DEVGATE_EXECUTOR")]
    executor: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "DEVGATE_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "devgate={level},devgate_apigateway={level},devgate_lambda={level},\
                     devgate_iam={level},devgate_cloudformation={level},tower_http=debug",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load(&args.config)?;

    if let Some(executor) = &args.executor {
        match executor.parse::<ExecutorMode>() {
            Ok(mode) => config.sandbox.executor = mode,
            Err(e) => warn!(
                "{}, keeping the configured executor ({:?})",
                e, config.sandbox.executor
            ),
        }
    }

    let assets = match (&args.proxy_assets_url, &args.assets_pathname) {
        (Some(url), _) => AssetsSource::Proxy(AssetsProxy::new(url)?),
        (None, Some(dir)) => AssetsSource::Directory(std::env::current_dir()?.join(dir)),
        (None, None) => {
            anyhow::bail!("You must specify either --proxy-assets-url or --assets-pathname")
        }
    };

    info!("Starting devgate...");
    info!("  App: {} (stage: {})", config.app_name, args.stage);
    info!("  Stack: {}", config.stack_name(&args.stage));
    info!(
        "  Sandbox: {:?} (image: {})",
        config.sandbox.executor,
        config.sandbox.image()
    );
    match &assets {
        AssetsSource::Proxy(proxy) => info!("  Assets: proxied to {}", proxy.target()),
        AssetsSource::Directory(dir) => info!("  Assets: served from {}", dir.display()),
    }

    let state = build_state(&config, &args.stage, assets).await?;

    // Create router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Development proxy listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
