//! `llm-bootstrap`: first-run setup for a local LLM backend.

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use colored::Colorize;
use lb_core::config::{store, WizardSettings};
use lb_core::workflow::{AbortReason, WorkflowOutcome};
use lb_protocol::{ModelRole, SetupConfig};
use lb_tui::{run_setup, SetupOptions};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter, e.g. `lb_core=debug`.
const LOG_ENV: &str = "LLM_BOOTSTRAP_LOG";

#[derive(Parser)]
#[command(
    name = "llm-bootstrap",
    version,
    about = "Choose or download local models and write the backend configuration"
)]
struct Cli {
    /// Configuration file to write or read.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Wizard settings file (defaults, discovery and download commands).
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// More log output: -v info, -vv debug, -vvv trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the setup wizard (the default).
    Setup(SetupArgs),

    /// Print the saved configuration.
    Show {
        /// Print as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print where the configuration is stored.
    Path,
}

#[derive(Args, Default)]
struct SetupArgs {
    /// Run even if a configuration already exists.
    #[arg(long)]
    force: bool,

    /// Host offered as the default answer.
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => store::default_config_path()?,
    };

    match cli.command.unwrap_or(Command::Setup(SetupArgs::default())) {
        Command::Setup(args) => setup(config_path, cli.settings, args).await,
        Command::Show { json } => show(&config_path, json),
        Command::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn setup(config_path: PathBuf, settings_path: Option<PathBuf>, args: SetupArgs) -> Result<()> {
    let settings_path = match settings_path {
        Some(path) => path,
        None => store::default_settings_path()?,
    };
    let mut settings = WizardSettings::load(&settings_path)
        .wrap_err_with(|| format!("Failed to load settings from {}", settings_path.display()))?;
    if let Some(host) = args.host {
        settings.default_host = host;
    }

    let options = SetupOptions {
        config_path: config_path.clone(),
        settings,
        force: args.force,
    };
    let outcome = run_setup(options).await.map_err(|e| eyre!("{e:#}"))?;

    match outcome {
        WorkflowOutcome::Completed {
            config,
            start_index,
        } => {
            debug!(start_index, "setup completed");
            println!("{} Setup complete", "✓".green().bold());
            print_config(&config);
            println!("Saved to {}", config_path.display());
            Ok(())
        }
        WorkflowOutcome::AlreadyConfigured(path) => {
            println!(
                "Already configured at {}. Run `llm-bootstrap setup --force` to start over.",
                path.display()
            );
            Ok(())
        }
        WorkflowOutcome::Aborted(AbortReason::Declined) => {
            println!(
                "{} Setup cancelled, no configuration written.",
                "!".yellow().bold()
            );
            Ok(())
        }
        WorkflowOutcome::Aborted(AbortReason::DiscoveryFailed(message)) => {
            Err(eyre!("Could not list the models on the host: {message}"))
        }
    }
}

fn show(config_path: &Path, json: bool) -> Result<()> {
    let config = store::load(config_path)
        .wrap_err_with(|| format!("No usable configuration at {}", config_path.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print_config(&config);
    }
    Ok(())
}

fn print_config(config: &SetupConfig) {
    println!("  {} {}", "host:".bold(), config.host);
    for role in ModelRole::ALL {
        println!(
            "  {} {}",
            format!("{role} model:").bold(),
            config.model(role)
        );
    }
}
