//! OpenAPI document structs for serde deserialization.
//!
//! Only the subset needed to derive tools is modelled. Schemas stay as raw
//! JSON values because they are passed through to tool input schemas.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Root OpenAPI document.
#[derive(Debug, Deserialize)]
pub struct OpenApiSpec {
    /// Document metadata.
    #[serde(default)]
    pub info: Info,
    /// Server entries in declaration order.
    #[serde(default)]
    pub servers: Vec<Server>,
    /// Path templates to path items. Required by the format.
    pub paths: Option<BTreeMap<String, PathItem>>,
    /// Reusable components.
    #[serde(default)]
    pub components: Components,
    /// Default security requirements for every operation.
    pub security: Option<Vec<SecurityRequirement>>,
}

/// Security requirement object: scheme name -> scopes.
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// Document metadata.
#[derive(Debug, Default, Deserialize)]
pub struct Info {
    /// API title.
    #[serde(default)]
    pub title: String,
    /// API version.
    #[serde(default)]
    pub version: String,
    /// API description.
    pub description: Option<String>,
}

/// Server entry; only the URL is used.
#[derive(Debug, Deserialize)]
pub struct Server {
    /// Server URL, possibly relative.
    pub url: String,
}

/// Reusable components.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// `components.schemas`
    #[serde(default)]
    pub schemas: BTreeMap<String, Value>,
    /// `components.parameters`
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
    /// `components.requestBodies`
    #[serde(default)]
    pub request_bodies: BTreeMap<String, RequestBody>,
    /// `components.securitySchemes`
    #[serde(default)]
    pub security_schemes: BTreeMap<String, SecuritySchemeObject>,
}

/// Either an inline object or a `$ref` to one in `components`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeRef<T> {
    /// `{"$ref": "#/components/..."}`
    Ref {
        /// The reference string.
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    /// Inline object.
    Item(T),
}

/// A path item containing operations for different HTTP methods.
#[derive(Debug, Default, Deserialize)]
pub struct PathItem {
    /// GET operation.
    pub get: Option<Operation>,
    /// PUT operation.
    pub put: Option<Operation>,
    /// POST operation.
    pub post: Option<Operation>,
    /// DELETE operation.
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    pub options: Option<Operation>,
    /// HEAD operation.
    pub head: Option<Operation>,
    /// PATCH operation.
    pub patch: Option<Operation>,
    /// Path-level parameters shared by all operations.
    #[serde(default)]
    pub parameters: Vec<MaybeRef<Parameter>>,
}

/// An API operation (endpoint).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique operation identifier.
    pub operation_id: Option<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Operation-level parameters.
    #[serde(default)]
    pub parameters: Vec<MaybeRef<Parameter>>,
    /// Request body, inline or referenced.
    pub request_body: Option<MaybeRef<RequestBody>>,
    /// Overrides the document-level security when present.
    pub security: Option<Vec<SecurityRequirement>>,
}

/// A parameter (path, query, header or cookie).
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// `in`: path, query, header or cookie.
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required.
    #[serde(default)]
    pub required: bool,
    /// Parameter description.
    pub description: Option<String>,
    /// Parameter schema.
    pub schema: Option<Value>,
}

/// A request body definition.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestBody {
    /// Whether a body must be sent.
    #[serde(default)]
    pub required: bool,
    /// Body description.
    pub description: Option<String>,
    /// Media type to content.
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

/// Media type content (e.g., application/json).
#[derive(Debug, Clone, Deserialize)]
pub struct MediaType {
    /// Content schema.
    pub schema: Option<Value>,
}

/// Security scheme definition from `components.securitySchemes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySchemeObject {
    /// `http`, `apiKey`, `oauth2`, `openIdConnect`, `mutualTLS`.
    #[serde(rename = "type")]
    pub scheme_type: String,
    /// HTTP auth scheme for `type: http` (bearer, basic, ...).
    pub scheme: Option<String>,
    /// Header or query parameter name for `type: apiKey`.
    pub name: Option<String>,
    /// Where an API key travels: header, query or cookie.
    #[serde(rename = "in")]
    pub location: Option<String>,
}

impl OpenApiSpec {
    /// Parse an OpenAPI document from JSON or YAML text.
    ///
    /// JSON is assumed when the first non-whitespace character is `{`.
    pub fn parse(text: &str) -> Result<Self, String> {
        if text.trim_start().starts_with('{') {
            serde_json::from_str(text).map_err(|e| format!("Failed to parse OpenAPI JSON: {e}"))
        } else {
            serde_yaml::from_str(text).map_err(|e| format!("Failed to parse OpenAPI YAML: {e}"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_and_yaml() {
        let json = r#"{"openapi":"3.0.0","info":{"title":"T","version":"1"},"paths":{}}"#;
        let spec = OpenApiSpec::parse(json).unwrap();
        assert_eq!(spec.info.title, "T");

        let yaml = "openapi: 3.0.0\ninfo:\n  title: Y\n  version: '2'\npaths: {}\n";
        let spec = OpenApiSpec::parse(yaml).unwrap();
        assert_eq!(spec.info.title, "Y");
        assert_eq!(spec.info.version, "2");
    }

    #[test]
    fn parameter_refs_deserialize_as_ref() {
        let json = r##"{"paths":{"/a":{"get":{"parameters":[
            {"$ref":"#/components/parameters/Limit"},
            {"name":"q","in":"query"}
        ]}}}}"##;
        let spec = OpenApiSpec::parse(json).unwrap();
        let paths = spec.paths.unwrap();
        let params = &paths["/a"].get.as_ref().unwrap().parameters;
        assert!(matches!(&params[0], MaybeRef::Ref { ref_path } if ref_path.ends_with("Limit")));
        assert!(matches!(&params[1], MaybeRef::Item(p) if p.name == "q"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(OpenApiSpec::parse("{not json").is_err());
    }
}
