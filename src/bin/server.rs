//! Placement driver binary

use clap::{Parser, Subcommand};
use minipd::{Config, Coordinator};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minipd-server")]
#[command(about = "minipd placement driver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the placement driver
    Serve {
        /// Config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Instance name
        #[arg(long)]
        name: Option<String>,

        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<String>,

        /// Data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            name,
            bind,
            data_dir,
        } => {
            // File and env first, CLI flags on top
            let mut config = Config::load(config.as_deref())?;
            if let Some(name) = name {
                config.server.name = name;
            }
            if let Some(bind) = bind {
                config.server.bind_addr = bind.parse()?;
            }
            if let Some(data_dir) = data_dir {
                config.server.data_dir = data_dir;
            }

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.server.log_level.as_str().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            Coordinator::new(config).serve().await?;
        }
    }

    Ok(())
}
