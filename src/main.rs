//! scylla-configure - first boot configuration of a scylla machine image
//!
//! Runs once per boot from the service manager:
//! - `configure` (default) before scylla starts
//! - `post-start` after scylla has started

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use scylla_configure::datasources::{cloud_instance, detect_cloud_instance};
use scylla_configure::settings::{LOG_DIR, SCYLLA_YAML};
use scylla_configure::stages::post_start;
use scylla_configure::{CloudInstance, CloudProvider, Configurator, RunReport, Settings};

const LOG_FILE: &str = "ami.log";

#[derive(Parser)]
#[command(name = "scylla-configure")]
#[command(author, version, about = "First boot configuration of a scylla machine image", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file to reconcile
    #[arg(long, env = "SCYLLA_YAML", default_value = SCYLLA_YAML)]
    scylla_yaml: PathBuf,

    /// Directory for ami.log
    #[arg(long, env = "SCYLLA_CONFIGURE_LOG_DIR", default_value = LOG_DIR)]
    log_dir: PathBuf,

    /// Cloud to use instead of detecting it
    #[arg(long, env = "SCYLLA_CLOUD", value_enum)]
    cloud: Option<Cloud>,

    /// Exit non-zero when writing the configuration fails
    #[arg(long, env = "SCYLLA_CONFIGURE_STRICT")]
    strict: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile scylla.yaml and provision the node (default)
    Configure,
    /// Run the post-start script from user-data
    PostStart,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Cloud {
    Aws,
    Gcp,
    Azure,
}

impl From<Cloud> for CloudProvider {
    fn from(cloud: Cloud) -> Self {
        match cloud {
            Cloud::Aws => CloudProvider::Aws,
            Cloud::Gcp => CloudProvider::Gcp,
            Cloud::Azure => CloudProvider::Azure,
        }
    }
}

fn init_logging(verbosity: u8, log_dir: &Path) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_file = std::fs::create_dir_all(log_dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join(LOG_FILE))
    });

    let (writer, ansi, file_error) = match log_file {
        Ok(file) => (
            BoxMakeWriter::new(std::io::stdout.and(Arc::new(file))),
            false,
            None,
        ),
        Err(e) => (BoxMakeWriter::new(std::io::stdout), true, Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to set tracing subscriber")?;

    if let Some(e) = file_error {
        warn!(
            "Cannot open {}: {}, logging to stdout only",
            log_dir.join(LOG_FILE).display(),
            e
        );
    }

    Ok(())
}

/// Select the cloud instance, `None` when there is none to talk to
async fn select_instance(cloud: Option<Cloud>) -> Option<Box<dyn CloudInstance>> {
    let instance = match cloud {
        Some(cloud) => {
            let provider = CloudProvider::from(cloud);
            info!("Using cloud {}", provider);
            cloud_instance(provider)
        }
        None => detect_cloud_instance().await,
    };

    match instance {
        Ok(instance) => Some(instance),
        Err(e) => {
            warn!("{}. Will use defaults!", e);
            None
        }
    }
}

/// Process exit status after a configure run
///
/// Step failures never change it. A fatal abort does only with `strict`.
fn configure_exit_status(report: &RunReport, strict: bool) -> u8 {
    if report.aborted && strict { 1 } else { 0 }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, &cli.log_dir)?;

    let settings = Settings::new().with_scylla_yaml(&cli.scylla_yaml);
    let instance = select_instance(cli.cloud).await;

    match cli.command.unwrap_or(Commands::Configure) {
        Commands::Configure => {
            let report = Configurator::new(settings).run(instance.as_deref()).await;
            let status = configure_exit_status(&report, cli.strict);
            if status != 0 {
                return Ok(ExitCode::from(status));
            }
        }
        Commands::PostStart => {
            if let Err(e) = post_start::run(&settings, instance.as_deref()).await {
                error!("Post-start script failed: {}", e);
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
