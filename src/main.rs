use anyhow::Context;
use clap::Parser;
use edge_image_optimizer::config::Config;
use edge_image_optimizer::image_optimizer::ImageEngine;
use edge_image_optimizer::proxy::ImageProxy;
use edge_image_optimizer::s3::S3Store;
use edge_image_optimizer::service::ImageService;
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use std::path::PathBuf;
use std::sync::Arc;

/// On-demand image transformation service built on Cloudflare's Pingora
#[derive(Parser, Debug)]
#[command(name = "edge-image-optimizer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (environment variables are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let config = match &args.config {
        Some(path) => Config::from_file(path).map_err(anyhow::Error::msg),
        None => Config::from_env().map_err(anyhow::Error::msg),
    }
    .context("Failed to load configuration")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    edge_image_optimizer::logging::init_subscriber()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging subsystem")?;

    let args = Args::parse();
    let config = load_config(&args)?;

    tracing::info!(
        config_file = ?args.config,
        server_address = %config.server.address,
        server_port = config.server.port,
        mode = ?config.transform.mode,
        max_output_bytes = config.transform.max_output_bytes,
        edge_normalization = config.edge.enabled,
        "Configuration loaded successfully"
    );

    if args.test {
        println!("Configuration OK");
        return Ok(());
    }

    // The AWS SDK loader is async; build the store on a short-lived runtime
    let store = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime for S3 client setup")?
        .block_on(S3Store::from_config(&config.store));

    let service = Arc::new(ImageService::new(
        Arc::new(config.transform.clone()),
        Arc::new(store),
        Arc::new(ImageEngine::default()),
    ));

    let opt = Opt {
        daemon: args.daemon,
        ..Default::default()
    };

    let mut server = Server::new(Some(opt)).context("Failed to create Pingora server")?;
    if let Some(conf) = Arc::get_mut(&mut server.configuration) {
        conf.threads = config.server.threads;
    }
    server.bootstrap();

    let proxy = ImageProxy::new(service, config.edge.clone());
    let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);

    let listen_addr = config.server.listen_address();
    proxy_service.add_tcp(&listen_addr);

    tracing::info!(address = %listen_addr, "Starting edge image optimizer");

    server.add_service(proxy_service);
    server.run_forever();
}
