use clap::Args;
use serde_json::{Map, Value};
use std::path::PathBuf;

use apitool_core::executor::{ExecutionResult, Executor, ExecutorConfig, resolve_auth};
use apitool_core::ExecuteError;

use crate::cli::{EXIT_CALL_FAILED, load_server_config};
use crate::config::Settings;

#[derive(Args, Debug, Clone)]
pub struct CallArgs {
    #[arg(value_name = "SPEC", help = "OpenAPI document (JSON or YAML)")]
    pub spec: PathBuf,
    #[arg(value_name = "TOOL", help = "Tool name")]
    pub tool: String,
    #[arg(
        long = "args",
        value_name = "JSON",
        default_value = "{}",
        help = "Tool arguments as a JSON object"
    )]
    pub args: String,
    #[arg(long = "base-url", value_name = "URL", help = "Override the server base URL")]
    pub base_url: Option<String>,
    #[arg(long = "timeout", value_name = "SECS", help = "Request timeout in seconds")]
    pub timeout: Option<u64>,
}

enum CallFailure {
    /// Could not get as far as a call.
    Setup(String),
    /// The call was refused before sending.
    Rejected(ExecuteError),
}

pub async fn run(args: CallArgs, settings: Settings) -> i32 {
    match run_call(args, &settings).await {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => {
                println!("{json}");
                if result.is_network_error() {
                    EXIT_CALL_FAILED
                } else {
                    0
                }
            }
            Err(err) => {
                eprintln!("Failed to serialize result: {err}");
                1
            }
        },
        Err(CallFailure::Rejected(err)) => {
            eprintln!("{err}");
            EXIT_CALL_FAILED
        }
        Err(CallFailure::Setup(msg)) => {
            eprintln!("{msg}");
            1
        }
    }
}

async fn run_call(args: CallArgs, settings: &Settings) -> Result<ExecutionResult, CallFailure> {
    let config = load_server_config(
        &args.spec,
        settings.base_url(args.base_url.as_deref()),
        &settings.disabled_tools(&[]),
    )
    .map_err(CallFailure::Setup)?;

    let tool = config
        .tool(&args.tool)
        .ok_or_else(|| CallFailure::Setup(format!("Unknown tool: {}", args.tool)))?;
    if !tool.enabled {
        return Err(CallFailure::Setup(format!("Tool '{}' is disabled", tool.name)));
    }

    let inputs = parse_inputs(&args.args).map_err(CallFailure::Rejected)?;
    let auth = resolve_auth(&tool.handler.auth, |var| std::env::var(var).ok());

    let executor = Executor::new(ExecutorConfig {
        timeout: settings.timeout(args.timeout),
    })
    .map_err(|err| CallFailure::Setup(err.to_string()))?;

    executor
        .execute(&tool.handler, &inputs, &auth)
        .await
        .map_err(CallFailure::Rejected)
}

fn parse_inputs(raw: &str) -> Result<Map<String, Value>, ExecuteError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ExecuteError::Validation(
            "--args must be a JSON object".to_string(),
        )),
        Err(err) => Err(ExecuteError::Validation(format!(
            "--args is not valid JSON: {err}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inputs() {
        let map = parse_inputs(r#"{"id": "42", "limit": 5}"#).unwrap();
        assert_eq!(map["id"], "42");
        assert!(matches!(
            parse_inputs("[1]"),
            Err(ExecuteError::Validation(_))
        ));
        assert!(matches!(
            parse_inputs("{oops"),
            Err(ExecuteError::Validation(_))
        ));
    }
}
