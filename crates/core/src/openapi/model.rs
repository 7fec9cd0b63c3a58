//! Normalized API description consumed by the mapper.
//!
//! All `$ref`s that matter for tool mapping are resolved, path-level and
//! operation-level parameters are merged, and security requirements are
//! reduced to scheme names.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::ir::HttpMethod;

/// Normalized API description.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSpec {
    /// `info.title`, possibly empty.
    pub title: String,
    /// `info.version`, possibly empty.
    pub version: String,
    /// `info.description`.
    pub description: Option<String>,
    /// Server URLs in declaration order.
    pub base_urls: Vec<String>,
    /// Operations sorted by path, then method.
    pub operations: Vec<NormalizedOperation>,
    /// Security schemes by declared name.
    pub security_schemes: BTreeMap<String, SecuritySchemeDef>,
}

/// Normalized API operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOperation {
    /// Declared `operationId`.
    pub operation_id: Option<String>,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template (e.g., "/items/{itemId}")
    pub path: String,
    /// Short summary.
    pub summary: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Path-level and operation-level parameters, merged.
    pub parameters: Vec<NormalizedParam>,
    /// Selected request body, if any.
    pub request_body: Option<RequestBodyShape>,
    /// Names of the security schemes this operation requires.
    pub security: Vec<String>,
}

/// Parameter location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamLocation {
    /// `in: path`
    Path,
    /// `in: query`
    Query,
    /// `in: header`
    Header,
    /// `in: cookie`
    Cookie,
    /// Anything else the document declared.
    Other(String),
}

impl ParamLocation {
    /// Classify an `in` value.
    pub fn parse(location: &str) -> Self {
        match location {
            "path" => ParamLocation::Path,
            "query" => ParamLocation::Query,
            "header" => ParamLocation::Header,
            "cookie" => ParamLocation::Cookie,
            other => ParamLocation::Other(other.to_string()),
        }
    }
}

/// Single declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedParam {
    /// Parameter name as declared.
    pub name: String,
    /// Where the parameter travels.
    pub location: ParamLocation,
    /// Path parameters are always required.
    pub required: bool,
    /// Declared description.
    pub description: Option<String>,
    /// Declared JSON schema; `{"type": "string"}` when absent.
    pub schema: Value,
}

/// Request body shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBodyShape {
    /// Object schema with named properties; flattened into tool inputs.
    Structured {
        /// Selected media type.
        content_type: String,
        /// Top-level properties in declaration order.
        properties: Vec<BodyProperty>,
    },
    /// Anything else; exposed as one opaque `body` input.
    Opaque {
        /// Selected media type.
        content_type: String,
        /// `requestBody.required`.
        required: bool,
        /// `requestBody.description`.
        description: Option<String>,
        /// Media type schema, `{}` when absent.
        schema: Value,
    },
}

impl RequestBodyShape {
    /// Media type the body is sent as.
    pub fn content_type(&self) -> &str {
        match self {
            RequestBodyShape::Structured { content_type, .. }
            | RequestBodyShape::Opaque { content_type, .. } => content_type,
        }
    }
}

/// One property of a structured request body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyProperty {
    /// Property name.
    pub name: String,
    /// Listed in the object schema's `required`.
    pub required: bool,
    /// Property schema.
    pub schema: Value,
}

/// Security scheme definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecuritySchemeDef {
    /// `type: http` with its scheme (bearer, basic, digest, ...).
    Http {
        /// Lowercased scheme name.
        scheme: String,
    },
    /// `type: apiKey`.
    ApiKey {
        /// Header or query parameter name.
        name: String,
        /// `header`, `query` or `cookie`.
        location: String,
    },
    /// `type: oauth2`
    OAuth2,
    /// `type: openIdConnect`
    OpenIdConnect,
    /// Declared but not usable for request synthesis (e.g. mutualTLS).
    Unsupported(String),
}
