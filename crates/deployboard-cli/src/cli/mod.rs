//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use deployboard_core::{config, logging};

mod commands;
mod context;

#[derive(Parser)]
#[command(name = "deployboard")]
#[command(version)]
#[command(about = "Sign in and watch asset-deployment jobs from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in through the identity provider's hosted page
    Login,
    /// Complete sign-in from a redirect URL
    Callback {
        /// The full URL the identity provider redirected to
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List, inspect, watch and create deployment jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },
    /// Run individual asset operations
    Assets {
        #[command(subcommand)]
        command: AssetsCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum JobsCommands {
    /// Lists jobs
    List,
    /// Shows one job with its steps
    Show {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
    /// Refreshes the job list, or one job, until Ctrl+C
    Watch {
        /// Watch this job instead of the whole list
        #[arg(value_name = "JOB_ID")]
        id: Option<String>,
    },
    /// Creates a deployment job
    Create(commands::jobs::CreateArgs),
}

#[derive(clap::Subcommand)]
enum AssetsCommands {
    /// Starts an export
    Export {
        /// JSON payload file
        #[arg(long, value_name = "FILE")]
        payload: PathBuf,
    },
    /// Shows the status of an export
    ExportStatus {
        #[arg(value_name = "EXPORT_JOB_ID")]
        id: String,
        /// JSON payload file (defaults to an empty object)
        #[arg(long, value_name = "FILE")]
        payload: Option<PathBuf>,
    },
    /// Uploads exported assets
    Upload {
        /// JSON payload file
        #[arg(long, value_name = "FILE")]
        payload: PathBuf,
    },
    /// Imports uploaded assets
    Import {
        /// JSON payload file
        #[arg(long, value_name = "FILE")]
        payload: PathBuf,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init(if cli.verbose { "debug" } else { "warn" })
        .context("initialize logging")?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    // Config commands must work without a readable config file.
    let app = || -> Result<context::App> {
        let config = config::Config::load().context("load config")?;
        Ok(context::App::new(config))
    };

    match cli.command {
        Commands::Login => commands::auth::login(&app()?).await,
        Commands::Callback { url } => commands::auth::callback(&app()?, &url).await,
        Commands::Logout => commands::auth::logout(&app()?),
        Commands::Whoami => {
            commands::auth::whoami(&app()?);
            Ok(())
        }

        Commands::Jobs { command } => {
            let app = app()?;
            match command {
                JobsCommands::List => commands::jobs::list(&app).await,
                JobsCommands::Show { id } => commands::jobs::show(&app, &id).await,
                JobsCommands::Watch { id } => commands::jobs::watch(&app, id.as_deref()).await,
                JobsCommands::Create(args) => commands::jobs::create(&app, &args).await,
            }
        }

        Commands::Assets { command } => {
            let app = app()?;
            match command {
                AssetsCommands::Export { payload } => {
                    commands::assets::export(&app, &payload).await
                }
                AssetsCommands::ExportStatus { id, payload } => {
                    commands::assets::export_status(&app, &id, payload.as_deref()).await
                }
                AssetsCommands::Upload { payload } => {
                    commands::assets::upload(&app, &payload).await
                }
                AssetsCommands::Import { payload } => {
                    commands::assets::import(&app, &payload).await
                }
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
