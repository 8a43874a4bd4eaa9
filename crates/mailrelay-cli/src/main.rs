//! Mailrelay - Mailgun to Slack relay
//!
//! Receives Mailgun webhooks, verifies their signature and posts a summary of
//! delivery failures to a Slack channel.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mailrelay_api::RelayServer;
use mailrelay_auth::sign_webhook;
use mailrelay_core::config::{LoggingConfig, RelayConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "mailrelay")]
#[command(author = "Mailrelay Team")]
#[command(version = mailrelay_core::VERSION)]
#[command(about = "Relay Mailgun delivery failures to Slack", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "MAILRELAY_CONFIG")]
    config: Option<String>,

    /// Bind address
    #[arg(long, global = true, env = "MAILRELAY_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, global = true, env = "MAILRELAY_PORT")]
    port: Option<u16>,

    /// Mailgun webhook signing key
    #[arg(long, global = true, env = "MAILRELAY_SIGNING_KEY", hide_env_values = true)]
    signing_key: Option<String>,

    /// Slack incoming webhook URL
    #[arg(
        long,
        global = true,
        env = "MAILRELAY_SLACK_WEBHOOK_URL",
        hide_env_values = true
    )]
    slack_webhook_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "MAILRELAY_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay server
    Server,

    /// Validate the configuration and exit
    CheckConfig,

    /// Print the signature block Mailgun would send, for testing a deployment
    Sign {
        #[arg(long)]
        timestamp: String,

        #[arg(long)]
        token: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_logging(&config.logging);

    match cli.command.unwrap_or(Commands::Server) {
        Commands::Server => {
            info!("Starting mailrelay {}", mailrelay_core::VERSION);
            RelayServer::new(config).run().await?;
        }
        Commands::CheckConfig => {
            config.validate()?;
            println!("Configuration OK");
            println!("{:#?}", config);
        }
        Commands::Sign { timestamp, token } => {
            if config.mailgun.signing_key.is_empty() {
                bail!("no signing key configured (use --signing-key or MAILRELAY_SIGNING_KEY)");
            }
            let signature = sign_webhook(config.mailgun.signing_key.as_bytes(), &timestamp, &token);
            println!(
                "{}",
                serde_json::json!({
                    "timestamp": timestamp,
                    "token": token,
                    "signature": signature,
                })
            );
        }
        Commands::Version => {
            println!("mailrelay {}", mailrelay_core::VERSION);
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<RelayConfig> {
    load_config_with(cli, |key| std::env::var(key).ok())
}

/// Defaults, then the config file, then `MAILRELAY_*` variables, then flags.
fn load_config_with<F>(cli: &Cli, lookup: F) -> anyhow::Result<RelayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config {
        Some(config_path) => RelayConfig::from_file(config_path)
            .with_context(|| format!("loading configuration from {}", config_path))?,
        None => RelayConfig::default(),
    };
    config.apply_env(lookup);

    // Override with CLI args
    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(key) = &cli.signing_key {
        config.mailgun.signing_key = key.clone();
    }
    if let Some(url) = &cli.slack_webhook_url {
        config.slack.webhook_url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    Ok(config)
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
