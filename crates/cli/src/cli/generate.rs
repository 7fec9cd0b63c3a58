use clap::Args;
use std::path::PathBuf;

use apitool_core::generate_typescript;

use crate::cli::{load_server_config, run_cli_async, split_names, write_output};
use crate::config::Settings;

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "SPEC", help = "OpenAPI document (JSON or YAML)")]
    pub spec: PathBuf,
    #[arg(
        long = "disable",
        value_name = "TOOLS",
        help = "Comma-separated tool names to leave out"
    )]
    pub disable: Vec<String>,
    #[arg(long = "base-url", value_name = "URL", help = "Override the server base URL")]
    pub base_url: Option<String>,
    #[arg(short = 'o', long = "out", value_name = "FILE", help = "Write to FILE instead of stdout")]
    pub out: Option<PathBuf>,
}

pub async fn run(args: GenerateArgs, settings: Settings) -> i32 {
    run_cli_async(|| async move {
        let disabled = settings.disabled_tools(&split_names(&args.disable));
        let config = load_server_config(
            &args.spec,
            settings.base_url(args.base_url.as_deref()),
            &disabled,
        )?;
        let source = generate_typescript(&config);
        if let Some(out) = &args.out {
            tracing::info!(path = %out.display(), tools = config.enabled_tools().count(), "Writing TypeScript server.");
        }
        write_output(args.out.as_deref(), &source)
    })
    .await
}
