use clap::Args;
use std::path::PathBuf;

use crate::cli::{load_server_config, run_cli_async, split_names, write_output};
use crate::config::Settings;

#[derive(Args, Debug, Clone)]
pub struct MapArgs {
    #[arg(value_name = "SPEC", help = "OpenAPI document (JSON or YAML)")]
    pub spec: PathBuf,
    #[arg(
        long = "disable",
        value_name = "TOOLS",
        help = "Comma-separated tool names to mark disabled"
    )]
    pub disable: Vec<String>,
    #[arg(long = "base-url", value_name = "URL", help = "Override the server base URL")]
    pub base_url: Option<String>,
    #[arg(short = 'o', long = "out", value_name = "FILE", help = "Write to FILE instead of stdout")]
    pub out: Option<PathBuf>,
}

pub async fn run(args: MapArgs, settings: Settings) -> i32 {
    run_cli_async(|| async move {
        let disabled = settings.disabled_tools(&split_names(&args.disable));
        let config = load_server_config(
            &args.spec,
            settings.base_url(args.base_url.as_deref()),
            &disabled,
        )?;
        tracing::info!(
            tools = config.tools.len(),
            enabled = config.enabled_tools().count(),
            "Mapped API description."
        );
        let json = serde_json::to_string_pretty(&config)
            .map_err(|err| format!("Failed to serialize server config: {err}"))?;
        write_output(args.out.as_deref(), &json)
    })
    .await
}
