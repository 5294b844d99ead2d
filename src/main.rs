//! bob - a declarative, file-driven cron task scheduler.
//!
//! Usage:
//!   bob [-c <tasks-dir>] [-o <output-dir>] [-s <shell>] [-p <port>] [--no-health-check]

use bob::api::{self, ApiState};
use bob::{
    CronEngine, DirectoryWatcher, Metrics, OverlapPolicy, Reconciler, SchedulerConfig, TaskRunner,
    YamlLoader, watch_and_reconcile,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// bob - run shell commands on cron schedules declared in a directory of YAML files
#[derive(Parser)]
#[command(name = "bob")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing task descriptor files
    #[arg(short = 'c', long = "tasks", value_name = "DIR")]
    tasks: Option<PathBuf>,

    /// Directory task output is written under
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output: Option<PathBuf>,

    /// Shell used to run task commands
    #[arg(short = 's', long)]
    shell: Option<String>,

    /// Port for the health check and metrics endpoints
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Do not serve the health check and metrics endpoints
    #[arg(long)]
    no_health_check: bool,

    /// Log at debug level
    #[arg(short = 'v', long)]
    verbose: bool,

    /// What to do when a task comes due while it is still running
    #[arg(long, value_name = "allow|skip|queue")]
    overlap: Option<OverlapPolicy>,

    /// Timezone cron expressions are evaluated in (e.g. Europe/Berlin)
    #[arg(long)]
    timezone: Option<String>,

    /// Fail commands that run longer than this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Optional YAML file with global settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Defaults, then the global config file, then flags.
    fn into_config(self) -> Result<SchedulerConfig, Box<dyn std::error::Error>> {
        let mut config = SchedulerConfig::default();

        if let Some(path) = &self.config {
            config.apply_global(YamlLoader::load_global_config(path)?);
        }

        if let Some(tasks) = self.tasks {
            config.task_directory = tasks;
        }
        if let Some(output) = self.output {
            config.output_directory = output;
        }
        if let Some(shell) = self.shell {
            config.shell = shell;
        }
        if let Some(port) = self.port {
            config.health_check_port = port;
        }
        if self.no_health_check {
            config.health_check_enabled = false;
        }
        if let Some(policy) = self.overlap {
            config.overlap_policy = policy;
        }
        if let Some(timezone) = self.timezone {
            config.timezone = timezone;
        }
        if let Some(secs) = self.timeout {
            config.command_timeout = Some(Duration::from_secs(secs));
        }
        config.verbose = self.verbose;

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = Arc::new(cli.into_config()?);
    info!(
        tasks = %config.task_directory.display(),
        output = %config.output_directory.display(),
        shell = %config.shell,
        overlap = %config.overlap_policy,
        timezone = %config.timezone,
        "Starting scheduler"
    );

    let metrics = Metrics::new()?;
    let runner = Arc::new(TaskRunner::from_config(&config));

    let (handle, engine_task) = CronEngine::new()
        .with_timezone(config.timezone.clone())
        .start();

    // Arm the watch before the first pass so no write is missed in between.
    let watcher = DirectoryWatcher::new(&config.task_directory)?;
    let reconciler = Arc::new(Reconciler::for_directory(
        &config.task_directory,
        handle.clone(),
        Arc::clone(&runner),
        metrics.clone(),
    ));

    let server = if config.health_check_enabled {
        let state = ApiState {
            handle: handle.clone(),
            runner: Arc::clone(&runner),
            metrics: metrics.clone(),
        };
        Some(api::start_server(config.health_check_addr(), state).await?)
    } else {
        info!("Health check disabled");
        None
    };

    let watch_loop = tokio::spawn(watch_and_reconcile(
        watcher,
        reconciler,
        config.watch_debounce,
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
        _ = watch_loop => {
            info!("Directory watch stopped");
        }
        _ = engine_task => {
            info!("Cron engine stopped");
        }
    }

    let _ = handle.shutdown().await;
    if let Some(server) = server {
        server.abort();
    }

    info!("Goodbye!");
    Ok(())
}
