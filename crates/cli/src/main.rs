//! apitool - map OpenAPI descriptions to tools, call them, and generate
//! standalone tool servers.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod cli;
mod config;

use config::Settings;

#[derive(Parser)]
#[command(name = "apitool", version, about = "Turn OpenAPI descriptions into callable tools")]
struct Cli {
    #[arg(
        long = "config",
        value_name = "FILE",
        global = true,
        help = "TOML settings file"
    )]
    config: Option<PathBuf>,
    #[arg(short = 'v', long = "verbose", global = true, help = "Enable debug logging")]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Map an OpenAPI document to a tool server config (JSON)
    Map(cli::map::MapArgs),
    /// Call one tool against the live API
    Call(cli::call::CallArgs),
    /// Generate a standalone TypeScript tool server
    Generate(cli::generate::GenerateArgs),
}

#[tokio::main]
async fn main() {
    let code = run_cli_async(std::env::args()).await;
    std::process::exit(code);
}

async fn run_cli_async(args: impl IntoIterator<Item = String>) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            return code;
        }
    };

    init_tracing(cli.verbose);

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    match cli.command {
        Some(Commands::Map(args)) => cli::map::run(args, settings).await,
        Some(Commands::Call(args)) => cli::call::run(args, settings).await,
        Some(Commands::Generate(args)) => cli::generate::run(args, settings).await,
        None => {
            let mut cmd = Cli::command();
            let _ = cmd.print_help();
            println!();
            0
        }
    }
}

fn init_tracing(verbose: bool) {
    // APITOOL_LOG takes a level ("debug") or a full filter spec
    let default_level = if verbose { "debug" } else { "info" };
    let filter = match std::env::var("APITOOL_LOG") {
        Ok(level) if is_plain_level(&level) => format!("apitool={level},apitool_core={level}"),
        Ok(spec) => spec,
        Err(_) => format!("apitool={default_level},apitool_core={default_level}"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}
