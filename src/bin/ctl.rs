//! Admin CLI for the placement driver

use clap::{Args, Parser, Subcommand};
use minipd::ops::{set_config, set_replicate_config, show_all_config, show_config};

#[derive(Parser)]
#[command(name = "minipd-ctl")]
#[command(about = "minipd placement driver admin CLI")]
#[command(version)]
struct Cli {
    /// Placement driver URL
    #[arg(long, short = 'u', default_value = "http://127.0.0.1:2379")]
    pd: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tune placement driver configs
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the schedule config
    Show {
        #[command(subcommand)]
        command: Option<ShowCommand>,
    },

    /// Set the option with value
    Set(SetArgs),
}

#[derive(Subcommand)]
enum ShowCommand {
    /// Show the whole config
    All,
}

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
struct SetArgs {
    #[command(subcommand)]
    command: Option<SetCommand>,

    /// Schedule option, e.g. leader-schedule-limit
    option: Option<String>,

    value: Option<String>,
}

#[derive(Subcommand)]
enum SetCommand {
    /// Set the replication option with value
    Replicate { option: String, value: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommand::Show { command: None } => match show_config(&cli.pd).await {
                Ok(body) => println!("{}", body),
                Err(e) => println!("Failed to get config: {}", e),
            },
            ConfigCommand::Show {
                command: Some(ShowCommand::All),
            } => match show_all_config(&cli.pd).await {
                Ok(body) => println!("{}", body),
                Err(e) => println!("Failed to get config: {}", e),
            },
            ConfigCommand::Set(SetArgs {
                command: Some(SetCommand::Replicate { option, value }),
                ..
            }) => match set_replicate_config(&cli.pd, &option, &value).await {
                Ok(()) => println!("Success!"),
                Err(e) => println!("Failed to set replication config: {}", e),
            },
            ConfigCommand::Set(SetArgs {
                command: None,
                option: Some(option),
                value: Some(value),
            }) => match set_config(&cli.pd, &option, &value).await {
                Ok(()) => println!("Success!"),
                Err(e) => println!("Failed to set config: {}", e),
            },
            ConfigCommand::Set(_) => {
                anyhow::bail!("usage: minipd-ctl config set <option> <value>");
            }
        },
    }

    Ok(())
}
