use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use url_feature_api::api::config::ApiConfig;
use url_feature_api::api::start_server;
use url_feature_api::features::FeatureExtractor;
use url_feature_api::utils::logger::init_logger;

#[derive(Parser)]
#[command(name = "url_feature_api")]
#[command(about = "Extracts lexical, content, WHOIS and TLS features from URLs", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Directory for log files
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    /// Extract features for a single URL, print them as JSON and exit
    #[arg(long, value_name = "URL")]
    url: Option<String>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ApiConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = log_dir;
    }

    init_logger(&config.log_dir)?;
    info!("Loaded configuration: {:?}", config);

    let extractor = FeatureExtractor::new(&config.extractor_config())
        .context("Failed to build feature extractor")?;

    if let Some(url) = cli.url {
        let record = extractor.extract(&url).await;
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    start_server(config, Arc::new(extractor)).await
}
