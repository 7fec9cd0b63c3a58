//! Intermediate representation shared by execution and code generation.
//!
//! The IR has three layers:
//! 1. `ServerConfig`: the root artifact produced by the mapper
//! 2. `Tool`: one callable unit per API operation, with its input schema
//! 3. `HandlerSpec`: how a tool's inputs become one HTTP request
//!
//! Everything here is plain data with serde support. The JSON form uses
//! camelCase keys and is the seam between the mapper, the executor and the
//! generators.
//!
//! ## Module Structure
//!
//! - `types`: server, tool, handler and auth types
//! - `schema`: the JSON-Schema-shaped tool input schema

mod schema;
mod types;

pub use schema::InputSchema;
pub use types::{
    ApiKeyLocation, AuthBinding, AuthKind, AuthScheme, BodyParam, HandlerSpec, HeaderParam,
    HttpMethod, RAW_BODY_FIELD, ResolvedAuth, STRUCTURED_BODY_SENTINEL, ServerConfig, Tool,
};
