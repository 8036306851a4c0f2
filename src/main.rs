//! # Case Search Server Main Driver
//!
//! ## Purpose
//! Entry point for the case search service. Loads configuration, initializes
//! logging, and dispatches between serving, offline indexing, and health
//! checking.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment
//! - **Output**: Running API server, or a completed indexing/health run
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Build the Elasticsearch gateway and load the ID-mapping artifact
//! 4. Serve, index the corpus, or run health checks
//! 5. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use case_search::{
    api::ApiServer, config::Config, elastic::ElasticGateway, errors::Result, indexer,
    mappings::IdMappings, AppState, SearchError,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("case-search-server")
        .version("0.1.0")
        .author("Legal Search Team")
        .about("Legal-case search service backed by Elasticsearch")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("index-corpus")
                .long("index-corpus")
                .value_name("DIR")
                .help("Rebuild the index from the corpus directory and exit")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Ping Elasticsearch and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let config_file_found = std::path::Path::new(config_path).exists();
    let mut config = Config::load(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let config = Arc::new(config);
    init_logging(&config)?;

    info!("Starting case search service v0.1.0");
    if config_file_found {
        info!("Configuration loaded from: {}", config_path);
    } else {
        warn!("Config file {} not found, using defaults", config_path);
    }

    let gateway = Arc::new(ElasticGateway::new(config.elasticsearch.clone())?);

    if matches.get_flag("check-health") {
        return run_health_check(&gateway).await;
    }

    if let Some(corpus_dir) = matches.get_one::<PathBuf>("index-corpus") {
        let indexed = indexer::index_corpus(&gateway, corpus_dir, &config.indexing).await?;
        info!("Indexed {} documents from {:?}", indexed, corpus_dir);
        return Ok(());
    }

    serve(config, gateway).await
}

/// Run the API server until shutdown
async fn serve(config: Arc<Config>, gateway: Arc<ElasticGateway>) -> Result<()> {
    // Startup ping is informational only; the gateway reconnects lazily
    match gateway.ping().await {
        Ok(()) => info!("Elasticsearch reachable at {}", config.elasticsearch.url),
        Err(e) => warn!("Elasticsearch not reachable at startup: {}", e),
    }

    // A missing mapping file degrades ajId lookups, it never blocks startup
    let mappings = Arc::new(IdMappings::load(&config.indexing.mappings_path)?);

    let app_state = AppState {
        config: config.clone(),
        gateway,
        mappings,
    };

    let server = ApiServer::new(app_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    info!(
        "Case search service started on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = server_handle => {
            warn!("Server stopped unexpectedly");
        }
    }

    info!("Case search service shut down");
    Ok(())
}

/// Ping the search engine and report
async fn run_health_check(gateway: &ElasticGateway) -> Result<()> {
    gateway.ping().await?;
    info!("Elasticsearch is healthy");
    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level =
        config
            .logging
            .level
            .parse()
            .map_err(|_| SearchError::Config {
                message: format!("Invalid log level: {}", config.logging.level),
            })?;
    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(fmt_layer.json().with_filter(filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt_layer.with_filter(filter))
            .init();
    }

    info!("Logging initialized with level: {}", config.logging.level);
    Ok(())
}
