//! hostrun - run declared tasks across SSH hosts.
//!
//! Usage:
//!   hostrun run <config>       Run tasks on the configured hosts
//!   hostrun validate <config>  Validate a task file without connecting
//!   hostrun list <config>      List hosts and tasks

use clap::{Args, Parser, Subcommand};
use hostrun::{
    ConfigLoader, ConsolePrompter, FileWriter, LogSink, LogWriter, MIN_CONFIG_VERSION,
    SshConnector, TaskRunner, TracingWriter, select_hosts, select_tasks,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Lines the log sink can hold before new ones are dropped.
const SINK_CAPACITY: usize = 4096;

/// hostrun - run declared tasks across SSH hosts
#[derive(Parser)]
#[command(name = "hostrun")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks on hosts
    Run(RunArgs),

    /// Validate a task file without connecting to any host
    Validate {
        /// Path to the task file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// List the hosts and tasks in a task file
    List {
        /// Path to the task file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Print the loaded config as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Path to the task file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Host to run on (repeatable; default: all hosts)
    #[arg(short = 'H', long = "host", value_name = "HOST")]
    hosts: Vec<String>,

    /// Run only this task
    #[arg(short = 't', long, value_name = "TASK")]
    task: Option<String>,

    /// Include library tasks
    #[arg(long)]
    lib: bool,

    /// Echo command lines and show all output
    #[arg(short = 'd', long)]
    debug: bool,

    /// Also write the run log to a file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Verify host keys against ~/.ssh/known_hosts
    #[arg(long)]
    strict_host_keys: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match &cli.command {
        Commands::Run(args) if args.debug => tracing::Level::DEBUG,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await?,
        Commands::Validate { config } => validate(config)?,
        Commands::List { config, json } => list(config, json)?,
    }

    Ok(())
}

/// Load, select and run.
async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    info!("Loading tasks from: {}", args.config.display());
    let config = ConfigLoader::load(&args.config, MIN_CONFIG_VERSION)?;
    let hosts = select_hosts(&config, &args.hosts)?;

    // Reject a bad filter before the log file is created.
    if select_tasks(&config.tasks, args.task.as_deref(), args.lib)?.is_empty() {
        warn!("No tasks selected in {}", args.config.display());
        return Ok(());
    }

    let mut writers: Vec<Arc<dyn LogWriter>> = vec![Arc::new(TracingWriter)];
    if let Some(dir) = &args.log_dir {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}-{}.log", config.app_name, config.release_version));
        writers.push(Arc::new(FileWriter::open(&path)?));
        info!("Writing run log to {}", path.display());
    }
    let (sink, handle) = LogSink::open(SINK_CAPACITY, writers);

    let connector = SshConnector::new().strict_host_keys(args.strict_host_keys);
    let runner = TaskRunner::new(Arc::new(connector), sink.clone())
        .prompter(Arc::new(ConsolePrompter::new()))
        .debug(args.debug)
        .on_failure(config.on_failure);

    let result = runner
        .run_selected(&hosts, &config.tasks, args.task.as_deref(), args.lib)
        .await;
    handle.close().await;

    if sink.dropped() > 0 {
        warn!("{} log line(s) were dropped", sink.dropped());
    }
    if let Err(e) = &result {
        error!("Run failed: {}", e);
    }
    result.map_err(Into::into)
}

/// Validate a task file without running.
fn validate(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating: {}", path.display());

    match ConfigLoader::load(&path, MIN_CONFIG_VERSION) {
        Ok(config) => {
            info!(
                "'{}' is valid: {} host(s), {} task(s)",
                config.app_name,
                config.hosts.len(),
                config.tasks.len()
            );
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// List hosts and tasks.
fn list(path: PathBuf, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(&path, MIN_CONFIG_VERSION)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{} (version {})", config.app_name, config.version);
    println!();

    println!("Hosts:");
    for (name, host) in &config.hosts {
        println!("  - {} ({}@{})", name, host.username, host.host);
    }
    println!();

    println!("Tasks:");
    for task in &config.tasks {
        let lib = if task.is_library { " [lib]" } else { "" };
        if task.depends_on.is_empty() {
            println!("  - {}{}", task.name, lib);
        } else {
            println!(
                "  - {}{} (depends on: {})",
                task.name,
                lib,
                task.depends_on.join(", ")
            );
        }
    }

    Ok(())
}
