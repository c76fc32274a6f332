//! Command-line runner.
//!
//! Usage:
//!   classloader main.script               # Run a script
//!   classloader -I lib main.script        # Extra unit search directory
//!   classloader -e 'print Present->new;'  # Run inline code

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{debug, error};

use classloader::logging::{self, LogConfig};
use classloader::runner::api::{install, Runtime};
use classloader::runner::config::RuntimeConfig;
use classloader::RuntimeError;

/// Run scripts whose classes are loaded on first use
#[derive(Parser)]
#[command(name = "classloader")]
#[command(version = "0.1.0")]
#[command(about = "Run scripts with on-demand class loading", long_about = None)]
struct Cli {
    /// Script to run
    #[arg(value_name = "SCRIPT", required_unless_present = "eval", conflicts_with = "eval")]
    script: Option<PathBuf>,

    /// Run CODE instead of a script file
    #[arg(short = 'e', long = "eval", value_name = "CODE")]
    eval: Option<String>,

    /// Prepend DIR to the unit search path (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Read configuration from FILE
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print runtime counters to stderr on exit
    #[arg(long)]
    stats: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(LogConfig::cli(cli.debug)).ok();

    let mut config = match &cli.config {
        Some(path) => match RuntimeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(2);
            }
        },
        None => RuntimeConfig::default(),
    };
    for dir in cli.include.iter().rev() {
        config = config.with_leading_search_dir(dir);
    }
    debug!(search_path = ?config.effective_search_path(), "Configured search path");

    let runtime = match install(Runtime::from_config(config)) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    let mut ctx = runtime.context();
    let result = match (&cli.eval, &cli.script) {
        (Some(code), _) => ctx.run_script(code, "-e"),
        (None, Some(path)) => ctx.run_file(path),
        (None, None) => {
            eprintln!("nothing to run: pass a script or -e CODE");
            process::exit(2);
        }
    };

    if cli.stats {
        let stats = runtime.stats();
        eprintln!(
            "dispatches={} misses={} resolutions={} loads={} load_failures={}",
            stats.dispatches, stats.misses, stats.resolutions, stats.loads, stats.load_failures
        );
    }

    if let Err(e) = result {
        report(&e);
        process::exit(1);
    }
}

fn report(e: &RuntimeError) {
    match e.diagnostic() {
        Some(d) => error!(code = %d.code(), class = %d.type_name(), "Unhandled classloader error"),
        None => debug!(error = %e, "Script died"),
    }
    eprintln!("{}", e);
}
