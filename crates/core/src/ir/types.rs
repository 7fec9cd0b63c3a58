//! Server, tool, handler and auth types.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use super::schema::InputSchema;
use crate::error::ExecuteError;

/// Input field holding an opaque request body.
pub const RAW_BODY_FIELD: &str = "body";

/// Wire name of [`BodyParam::StructuredBody`].
pub const STRUCTURED_BODY_SENTINEL: &str = "__body_object__";

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Uppercase method name.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// GET, HEAD and DELETE never carry a request body.
    pub fn allows_body(self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the request body is assembled from the tool inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyParam {
    /// No body is sent.
    #[default]
    NoBody,
    /// The single `body` input is sent as is.
    RawBody,
    /// Every input not bound to a path/query/header param forms a JSON object.
    StructuredBody,
}

impl Serialize for BodyParam {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BodyParam::NoBody => serializer.serialize_none(),
            BodyParam::RawBody => serializer.serialize_str(RAW_BODY_FIELD),
            BodyParam::StructuredBody => serializer.serialize_str(STRUCTURED_BODY_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for BodyParam {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None => Ok(BodyParam::NoBody),
            Some(RAW_BODY_FIELD) => Ok(BodyParam::RawBody),
            Some(STRUCTURED_BODY_SENTINEL) => Ok(BodyParam::StructuredBody),
            Some(other) => Err(D::Error::custom(format!("unknown bodyParam '{other}'"))),
        }
    }
}

/// A header parameter: the real header name and the input field carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderParam {
    /// Header name sent on the wire (e.g. "X-Request-ID").
    pub name: String,
    /// Input field name (e.g. "header_X_Request_ID").
    pub field: String,
}

/// Credential kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthKind {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: Basic <base64(user:pass)>`
    Basic,
    /// Key in a named header or query parameter.
    ApiKey,
}

impl AuthKind {
    /// Suffix appended to derived environment variable names.
    pub fn env_suffix(self) -> &'static str {
        match self {
            AuthKind::Bearer => "TOKEN",
            AuthKind::Basic => "CREDENTIALS",
            AuthKind::ApiKey => "API_KEY",
        }
    }
}

/// Where an API key travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    /// Sent as a request header.
    Header,
    /// Appended to the query string.
    Query,
}

/// An authentication scheme a tool requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthScheme {
    /// How the credential is applied.
    #[serde(rename = "type")]
    pub kind: AuthKind,
    /// Declared scheme detail (`bearer`, `basic`, `apiKey`, `oauth2`, ...).
    pub scheme: String,
    /// Header or query parameter name for API keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_name: Option<String>,
    /// API key location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ApiKeyLocation>,
    /// Scheme name as declared in the API description.
    pub name: String,
}

/// Binds a scheme to the environment variable a generated server reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthBinding {
    /// The scheme.
    pub scheme: AuthScheme,
    /// Variable holding the credential.
    pub env_var: String,
}

/// A credential resolved for one call.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAuth {
    /// How the credential is applied.
    #[serde(rename = "type")]
    pub kind: AuthKind,
    /// Token, `user:pass` or key. Never logged.
    pub value: String,
    /// Header or query parameter name for API keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    /// API key location; header when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ApiKeyLocation>,
}

impl fmt::Debug for ResolvedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAuth")
            .field("kind", &self.kind)
            .field("value", &"***")
            .field("header_name", &self.header_name)
            .field("location", &self.location)
            .finish()
    }
}

/// Per-tool request metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerSpec {
    /// Request method.
    pub method: HttpMethod,
    /// Path template with `{name}` placeholders.
    #[serde(default)]
    pub path: String,
    /// Absolute base URL the path is appended to.
    #[serde(default)]
    pub base_url: String,
    /// `Content-Type` sent with a body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Inputs substituted into the path.
    #[serde(default)]
    pub path_params: Vec<String>,
    /// Inputs sent as query parameters.
    #[serde(default)]
    pub query_params: Vec<String>,
    /// Inputs sent as headers.
    #[serde(default)]
    pub header_params: Vec<HeaderParam>,
    /// Body assembly mode.
    #[serde(default)]
    pub body_param: BodyParam,
    /// Credentials the call needs.
    #[serde(default)]
    pub auth: Vec<AuthBinding>,
}

impl HandlerSpec {
    /// Deserialize a handler supplied by a caller.
    ///
    /// Missing `method`, `baseUrl` or `path` is reported as a validation
    /// error rather than a generic parse failure.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ExecuteError> {
        for key in ["method", "baseUrl", "path"] {
            let present = value
                .get(key)
                .and_then(|v| v.as_str())
                .is_some_and(|s| !s.is_empty());
            if !present {
                return Err(ExecuteError::Validation(format!(
                    "Missing required field: {key}"
                )));
            }
        }
        serde_json::from_value(value)
            .map_err(|e| ExecuteError::Validation(format!("Invalid handler: {e}")))
    }

    /// Input fields bound to a path, query or header parameter.
    pub fn bound_fields(&self) -> HashSet<&str> {
        self.path_params
            .iter()
            .chain(&self.query_params)
            .map(String::as_str)
            .chain(self.header_params.iter().map(|h| h.field.as_str()))
            .collect()
    }
}

/// One callable unit derived from an API operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Unique snake_case name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Accepted inputs.
    pub input_schema: InputSchema,
    /// Disabled tools stay in the IR but are not generated.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How a call becomes a request.
    pub handler: HandlerSpec,
}

fn default_enabled() -> bool {
    true
}

/// Root IR artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Server description.
    pub description: String,
    /// Default base URL.
    pub base_url: String,
    /// One tool per operation, in operation order.
    pub tools: Vec<Tool>,
    /// Every environment variable a generated server reads credentials from.
    pub env_vars: Vec<String>,
}

impl ServerConfig {
    /// Look up a tool by name.
    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Tools that code generators should emit.
    pub fn enabled_tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter().filter(|t| t.enabled)
    }

    /// Mark the named tools as disabled. Tools stay in the IR.
    ///
    /// Returns the names that matched no tool.
    pub fn disable_tools<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut unknown = Vec::new();
        for name in names {
            let name = name.as_ref();
            match self.tools.iter_mut().find(|t| t.name == name) {
                Some(tool) => tool.enabled = false,
                None => unknown.push(name.to_string()),
            }
        }
        unknown
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handler_json() -> serde_json::Value {
        json!({
            "method": "POST",
            "path": "/users/{id}",
            "baseUrl": "https://api.example.com",
            "pathParams": ["id"],
            "headerParams": [{ "name": "X-Trace", "field": "header_X_Trace" }],
            "bodyParam": "__body_object__"
        })
    }

    #[test]
    fn test_body_param_wire_format() {
        assert_eq!(serde_json::to_value(BodyParam::NoBody).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(BodyParam::RawBody).unwrap(), json!("body"));
        assert_eq!(
            serde_json::to_value(BodyParam::StructuredBody).unwrap(),
            json!("__body_object__")
        );
        let parsed: BodyParam = serde_json::from_value(json!("body")).unwrap();
        assert_eq!(parsed, BodyParam::RawBody);
        assert!(serde_json::from_value::<BodyParam>(json!("form")).is_err());
    }

    #[test]
    fn test_handler_from_value() {
        let handler = HandlerSpec::from_value(handler_json()).unwrap();
        assert_eq!(handler.method, HttpMethod::Post);
        assert_eq!(handler.body_param, BodyParam::StructuredBody);
        assert!(handler.query_params.is_empty());
        assert!(handler.auth.is_empty());
    }

    #[test]
    fn test_handler_from_value_missing_fields() {
        for key in ["method", "baseUrl", "path"] {
            let mut value = handler_json();
            value.as_object_mut().unwrap().remove(key);
            let err = HandlerSpec::from_value(value).unwrap_err();
            assert!(matches!(err, ExecuteError::Validation(ref m) if m.contains(key)));
        }
    }

    #[test]
    fn test_bound_fields() {
        let handler = HandlerSpec::from_value(handler_json()).unwrap();
        let bound = handler.bound_fields();
        assert!(bound.contains("id"));
        assert!(bound.contains("header_X_Trace"));
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn test_allows_body() {
        assert!(!HttpMethod::Get.allows_body());
        assert!(!HttpMethod::Head.allows_body());
        assert!(!HttpMethod::Delete.allows_body());
        assert!(HttpMethod::Post.allows_body());
        assert!(HttpMethod::Options.allows_body());
    }

    #[test]
    fn test_resolved_auth_debug_hides_value() {
        let auth = ResolvedAuth {
            kind: AuthKind::Bearer,
            value: "s3cret".into(),
            header_name: None,
            location: None,
        };
        assert!(!format!("{auth:?}").contains("s3cret"));
    }
}
