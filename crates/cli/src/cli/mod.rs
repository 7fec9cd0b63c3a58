pub mod call;
pub mod generate;
pub mod map;

use std::fs;
use std::path::Path;

use apitool_core::{MapOptions, ServerConfig, load_config};

/// Exit code for calls that ran but did not produce an HTTP response, or
/// were refused before sending.
pub const EXIT_CALL_FAILED: i32 = 2;

/// Run a subcommand body, printing its error and mapping it to exit code 1.
pub async fn run_cli_async<F, Fut>(f: F) -> i32
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    match f().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

/// Read, normalize and map an API description file.
pub fn load_server_config(
    spec_path: &Path,
    base_url: Option<String>,
    disabled: &[String],
) -> Result<ServerConfig, String> {
    let text = fs::read_to_string(spec_path)
        .map_err(|err| format!("Failed to read {}: {err}", spec_path.display()))?;
    let options = MapOptions {
        base_url,
        ..MapOptions::default()
    };
    let mut config = load_config(&text, &options)
        .map_err(|err| format!("Failed to load {}: {err}", spec_path.display()))?;

    for name in config.disable_tools(disabled) {
        tracing::warn!(tool = %name, "Cannot disable unknown tool.");
    }
    Ok(config)
}

/// Write `contents` to `out`, or stdout when no path is given.
pub fn write_output(out: Option<&Path>, contents: &str) -> Result<(), String> {
    match out {
        Some(path) => fs::write(path, contents)
            .map_err(|err| format!("Failed to write {}: {err}", path.display())),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

/// Split comma-separated `--disable` values.
pub fn split_names(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
