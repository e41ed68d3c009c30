mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, run::RunArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "smsblast",
    about = "Resumable bulk SMS campaigns: send to every pending number, remember who got it",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./smsblast.yaml if present)
    #[arg(long, global = true, env = "SMSBLAST_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the campaign message to every pending number in the state file
    Run(RunArgs),

    /// Show delivery counts and pending numbers
    Status {
        /// State file (overrides `state_file` in the config)
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Inspect and validate the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = settings::Settings::load(cli.config.as_deref()).and_then(|settings| {
        match cli.command {
            Commands::Run(args) => cmd::run::run(&settings, args, cli.json),
            Commands::Status { state } => cmd::status::run(&settings, state.as_deref(), cli.json),
            Commands::Config { subcommand } => cmd::config::run(&settings, subcommand, cli.json),
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
