//! OpenAPI to tool mapping and HTTP tool execution.
//!
//! - [`openapi`] parses and normalizes API descriptions.
//! - [`mapper`] turns a normalized description into a [`ServerConfig`].
//! - [`executor`] synthesizes and sends the HTTP request for one tool call.
//! - [`codegen`] renders a standalone TypeScript tool server.

pub mod codegen;
pub mod error;
pub mod executor;
pub mod ir;
pub mod mapper;
pub mod openapi;
pub mod utils;

pub use codegen::generate_typescript;
pub use error::{ExecuteError, NormalizeError};
pub use executor::{ExecutionResult, Executor, ExecutorConfig, build_request, resolve_auth};
pub use ir::{HandlerSpec, ResolvedAuth, ServerConfig, Tool};
pub use mapper::{MapOptions, map, map_with_options};

/// Parse, normalize and map an API description in one step.
pub fn load_config(text: &str, options: &MapOptions) -> Result<ServerConfig, NormalizeError> {
    let spec = openapi::normalize(text)?;
    Ok(map_with_options(&spec, options))
}
