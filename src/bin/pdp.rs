//! PDP binary.
//!
//! Evaluates a gateway custom-authorizer event and prints the resulting
//! policy, the same way the authorizer function answers the gateway.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pdp::{Authorizer, AuthorizerRequest, KeyCache, PdpConfig};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log filter directives, e.g. "pdp=debug"
    #[arg(long, env = "RUST_LOG", default_value = "pdp=info", global = true)]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authorize a gateway event and print the policy
    Authorize {
        #[command(flatten)]
        source: ConfigSource,

        /// Event file; stdin when omitted
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Load and validate configuration
    CheckConfig {
        #[command(flatten)]
        source: ConfigSource,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct ConfigSource {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read configuration from API_KEY, TOKEN_ISSUER, JWKS_URI, AUDIENCE
    #[arg(long)]
    env: bool,
}

impl ConfigSource {
    fn load(&self) -> anyhow::Result<PdpConfig> {
        let config = match &self.config {
            Some(path) => PdpConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => PdpConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }
}

async fn read_event(path: Option<&PathBuf>) -> anyhow::Result<AuthorizerRequest> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            raw
        }
    };
    serde_json::from_str(&raw).context("parsing authorizer event")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_filter))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    match cli.command {
        Commands::Authorize { source, event } => {
            let config = source.load()?;
            let request = read_event(event.as_ref()).await?;
            let authorizer = Authorizer::new(&config, KeyCache::new())?;
            let policy = authorizer.authorize_policy(&request).await?;
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
        Commands::CheckConfig { source } => {
            let config = source.load()?;
            tracing::info!(
                api_key = config.api_key.is_some(),
                oauth = config.oauth.is_some(),
                read_scopes = ?config.scopes.read,
                write_scopes = ?config.scopes.write,
                "Configuration is valid"
            );
        }
    }

    Ok(())
}
