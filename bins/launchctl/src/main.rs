use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

use launch_descriptor::{ConfigFormat, EcosystemFile, LaunchDescriptor};
use launch_exec::{run_once, LaunchPlan, RunOptions};

/// Files looked for in the current directory when no config is given
const DEFAULT_CONFIG_FILES: [&str; 4] = [
    "ecosystem.config.js",
    "ecosystem.yaml",
    "ecosystem.yml",
    "ecosystem.json",
];

/// Process launch descriptor tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate an ecosystem file
    Validate {
        /// Ecosystem file (JS, YAML or JSON)
        #[arg(value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Print descriptors and the server each one starts
    Show {
        #[arg(value_name = "FILE")]
        config: Option<PathBuf>,

        /// Only show this app
        #[arg(short, long)]
        app: Option<String>,
    },

    /// Re-serialize an ecosystem file in another format
    Convert {
        #[arg(value_name = "FILE")]
        config: Option<PathBuf>,

        /// Target format: js, yaml or json
        #[arg(short, long)]
        to: ConfigFormat,

        /// Write here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the command line an app resolves to
    Plan {
        #[arg(value_name = "FILE")]
        config: Option<PathBuf>,

        #[arg(short, long)]
        app: Option<String>,

        /// Directory relative scripts resolve against (defaults to the config's directory)
        #[arg(short, long, value_name = "DIR")]
        base_dir: Option<PathBuf>,
    },

    /// Launch an app once in the foreground and return its exit code
    Run {
        #[arg(value_name = "FILE")]
        config: Option<PathBuf>,

        #[arg(short, long)]
        app: Option<String>,

        #[arg(short, long, value_name = "DIR")]
        base_dir: Option<PathBuf>,

        /// Seconds to wait for the server port to accept connections
        #[arg(long, value_name = "SECS")]
        ready_timeout: Option<u64>,

        /// Seconds between SIGTERM and kill on shutdown
        #[arg(long, value_name = "SECS", default_value_t = 10)]
        graceful_timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug)?;

    match args.command {
        Command::Validate { config } => validate(config),
        Command::Show { config, app } => show(config, app.as_deref()),
        Command::Convert { config, to, output } => convert(config, to, output),
        Command::Plan {
            config,
            app,
            base_dir,
        } => plan(config, app.as_deref(), base_dir),
        Command::Run {
            config,
            app,
            base_dir,
            ready_timeout,
            graceful_timeout,
        } => {
            let options = RunOptions {
                ready_timeout: ready_timeout.map(Duration::from_secs),
                graceful_timeout: Duration::from_secs(graceful_timeout),
                ..Default::default()
            };
            run(config, app.as_deref(), base_dir, options).await
        }
    }
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

fn validate(config: Option<PathBuf>) -> Result<()> {
    let (path, file) = load(config)?;
    info!("{} is valid: {}", path.display(), file.names().join(", "));
    println!("OK: {} app(s)", file.apps.len());
    Ok(())
}

fn show(config: Option<PathBuf>, app: Option<&str>) -> Result<()> {
    let (_, file) = load(config)?;

    let apps: Vec<&LaunchDescriptor> = match app {
        Some(name) => vec![file.app(name)?],
        None => file.apps.iter().collect(),
    };

    for (i, app) in apps.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("name:   {}", app.name);
        println!("script: {}", app.script);
        println!("args:   {}", app.args);

        match app.server_target() {
            Ok(target) => {
                if let Some(runner) = &target.runner {
                    println!("runner: {}", runner);
                }
                println!("target: {}", target.app);
                println!("listen: {}", target.socket_addr());
                if !target.extra.is_empty() {
                    println!("extra:  {}", target.extra.join(" "));
                }
            }
            Err(e) => println!("target: none ({})", e),
        }
    }

    Ok(())
}

fn convert(config: Option<PathBuf>, to: ConfigFormat, output: Option<PathBuf>) -> Result<()> {
    let (path, file) = load(config)?;
    let rendered = file.to_string(to)?;

    match output {
        Some(output) => {
            std::fs::write(&output, rendered)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Converted {} to {} at {}", path.display(), to, output.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn plan(config: Option<PathBuf>, app: Option<&str>, base_dir: Option<PathBuf>) -> Result<()> {
    let (path, file) = load(config)?;
    let plan = build_plan(&path, &file, app, base_dir)?;

    println!("{}", plan.display_line());
    debug!("Working directory: {}", plan.working_dir.display());
    Ok(())
}

async fn run(
    config: Option<PathBuf>,
    app: Option<&str>,
    base_dir: Option<PathBuf>,
    options: RunOptions,
) -> Result<()> {
    let (path, file) = load(config)?;
    let plan = build_plan(&path, &file, app, base_dir)?;

    if let Err(e) = run_once(&plan, &options).await {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}

fn load(config: Option<PathBuf>) -> Result<(PathBuf, EcosystemFile)> {
    let path = match config {
        Some(path) => path,
        None => find_default_config(Path::new("."))?,
    };

    debug!("Config file: {}", path.display());
    let file = EcosystemFile::load_from_file(&path)?;
    info!("Loaded {} app(s) from {}", file.apps.len(), path.display());

    Ok((path, file))
}

fn find_default_config(dir: &Path) -> Result<PathBuf> {
    DEFAULT_CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            anyhow!(
                "No ecosystem file found in {} (looked for {})",
                dir.display(),
                DEFAULT_CONFIG_FILES.join(", ")
            )
        })
}

fn build_plan(
    config_path: &Path,
    file: &EcosystemFile,
    app: Option<&str>,
    base_dir: Option<PathBuf>,
) -> Result<LaunchPlan> {
    let descriptor = file.select(app)?;

    let base_dir = match base_dir {
        Some(dir) => dir,
        None => config_dir(config_path)?,
    };

    Ok(LaunchPlan::from_descriptor(descriptor, &base_dir)?)
}

/// Directory holding the config file, as an absolute path.
fn config_dir(config_path: &Path) -> Result<PathBuf> {
    let parent = config_path.parent().unwrap_or_else(|| Path::new(""));
    if parent.is_absolute() {
        return Ok(parent.to_path_buf());
    }

    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    if parent.as_os_str().is_empty() {
        Ok(cwd)
    } else {
        Ok(cwd.join(parent))
    }
}
