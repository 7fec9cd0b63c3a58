//! Mapping from a normalized API description to the tool IR.
//!
//! Each operation becomes one [`Tool`]. Parameters are classified by their
//! declared location, request bodies are either flattened into fields or
//! exposed as one opaque `body` input, and security requirements become
//! environment-variable bindings.
//!
//! Mapping is pure and total. Inputs that cannot be represented (cookie
//! parameters, clashing field names, path params without a placeholder) are
//! dropped with a warning instead of failing the whole mapping.

use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::ir::{
    ApiKeyLocation, AuthBinding, AuthKind, AuthScheme, BodyParam, HandlerSpec, HeaderParam,
    InputSchema, RAW_BODY_FIELD, ServerConfig, Tool,
};
use crate::openapi::{
    NormalizedOperation, NormalizedParam, NormalizedSpec, ParamLocation, RequestBodyShape,
    SecuritySchemeDef,
};
use crate::utils::{
    MAX_TOOL_NAME_LEN, dedupe_name, dedupe_name_within, header_field_name, sanitize_tool_name,
    split_words, to_screaming_snake_case,
};

const DEFAULT_SERVER_NAME: &str = "api-server";
const DEFAULT_VERSION: &str = "1.0.0";

/// Caller overrides for the config header fields.
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// Server name; derived from the document title when unset.
    pub name: Option<String>,
    /// Server version; the document version when unset.
    pub version: Option<String>,
    /// Base URL; the first declared server when unset.
    pub base_url: Option<String>,
}

/// Map a normalized spec with default options.
pub fn map(spec: &NormalizedSpec) -> ServerConfig {
    map_with_options(spec, &MapOptions::default())
}

/// Map a normalized spec into a [`ServerConfig`].
pub fn map_with_options(spec: &NormalizedSpec, options: &MapOptions) -> ServerConfig {
    let base_url = options
        .base_url
        .clone()
        .or_else(|| spec.base_urls.first().cloned())
        .unwrap_or_default();

    let bindings = auth_bindings(&spec.security_schemes);

    let mut tools: Vec<Tool> = Vec::with_capacity(spec.operations.len());
    let mut names: HashSet<String> = HashSet::new();
    let mut env_vars: Vec<String> = Vec::new();

    for op in &spec.operations {
        let name = dedupe_name_within(&tool_base_name(op), MAX_TOOL_NAME_LEN, |n| {
            names.contains(n)
        });
        names.insert(name.clone());

        let tool = map_operation(name, op, &base_url, &bindings);
        for binding in &tool.handler.auth {
            if !env_vars.contains(&binding.env_var) {
                env_vars.push(binding.env_var.clone());
            }
        }
        tools.push(tool);
    }

    let name = options.name.clone().unwrap_or_else(|| {
        let words = split_words(&spec.title);
        if words.is_empty() {
            DEFAULT_SERVER_NAME.to_string()
        } else {
            words.join("-")
        }
    });
    let version = options.version.clone().unwrap_or_else(|| {
        if spec.version.is_empty() {
            DEFAULT_VERSION.to_string()
        } else {
            spec.version.clone()
        }
    });
    let description = spec
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| spec.title.clone());

    ServerConfig {
        name,
        version,
        description,
        base_url,
        tools,
        env_vars,
    }
}

/// Tool name before collision handling.
///
/// The operation identifier when present, else `<method>_<path>` where path
/// placeholders become `by_<name>` (`GET /users/{id}` -> `get_users_by_id`).
fn tool_base_name(op: &NormalizedOperation) -> String {
    if let Some(id) = op.operation_id.as_deref()
        && !id.trim().is_empty()
    {
        return sanitize_tool_name(id);
    }

    let mut parts = vec![op.method.as_str().to_ascii_lowercase()];
    for segment in op.path.split('/').filter(|s| !s.is_empty()) {
        match segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            Some(param) => parts.push(format!("by_{param}")),
            None => parts.push(segment.to_string()),
        }
    }
    sanitize_tool_name(&parts.join("_"))
}

fn map_operation(
    name: String,
    op: &NormalizedOperation,
    base_url: &str,
    bindings: &BTreeMap<String, AuthBinding>,
) -> Tool {
    let mut schema = InputSchema::default();
    let mut path_params: Vec<String> = Vec::new();
    let mut query_params: Vec<String> = Vec::new();
    let mut header_params: Vec<HeaderParam> = Vec::new();

    let placeholder_counts = path_placeholders(&op.path);

    for param in &op.parameters {
        match &param.location {
            ParamLocation::Path => {
                match placeholder_counts.get(param.name.as_str()) {
                    Some(1) => {}
                    Some(_) => {
                        warn!(
                            "Tool '{}': placeholder '{{{}}}' appears more than once in '{}', not binding it",
                            name, param.name, op.path
                        );
                        continue;
                    }
                    None => {
                        warn!(
                            "Tool '{}': path parameter '{}' has no placeholder in '{}', skipping",
                            name, param.name, op.path
                        );
                        continue;
                    }
                }
                if insert_param(&mut schema, &name, &param.name, param) {
                    path_params.push(param.name.clone());
                }
            }
            ParamLocation::Query => {
                if insert_param(&mut schema, &name, &param.name, param) {
                    query_params.push(param.name.clone());
                }
            }
            ParamLocation::Header => {
                let field = header_field_name(&param.name);
                if insert_param(&mut schema, &name, &field, param) {
                    header_params.push(HeaderParam {
                        name: param.name.clone(),
                        field,
                    });
                }
            }
            ParamLocation::Cookie | ParamLocation::Other(_) => {
                warn!(
                    "Tool '{}': parameter '{}' has unsupported location {:?}, skipping",
                    name, param.name, param.location
                );
            }
        }
    }

    // Placeholders the document forgot to declare still need a value
    let mut undeclared: Vec<&str> = placeholder_counts
        .iter()
        .filter(|(ph, count)| **count == 1 && !path_params.iter().any(|p| p.as_str() == **ph))
        .map(|(ph, _)| *ph)
        .collect();
    undeclared.sort_by_key(|ph| op.path.find(&format!("{{{ph}}}")));
    for ph in undeclared {
        if schema.insert(ph, json!({ "type": "string" }), true) {
            path_params.push(ph.to_string());
        } else {
            warn!(
                "Tool '{name}': placeholder '{{{ph}}}' clashes with another input field, leaving it unbound"
            );
        }
    }

    let body_param = map_body(&mut schema, &name, op);
    let content_type = match body_param {
        BodyParam::NoBody => None,
        BodyParam::RawBody | BodyParam::StructuredBody => Some(
            op.request_body
                .as_ref()
                .map(|b| b.content_type().to_string())
                .filter(|ct| !ct.is_empty())
                .unwrap_or_else(|| "application/json".to_string()),
        ),
    };

    let mut auth = Vec::new();
    for scheme_name in &op.security {
        match bindings.get(scheme_name) {
            Some(binding) => auth.push(binding.clone()),
            None => warn!(
                "Tool '{name}': security scheme '{scheme_name}' is undefined or unsupported, skipping"
            ),
        }
    }

    Tool {
        description: tool_description(op),
        input_schema: schema,
        enabled: true,
        handler: HandlerSpec {
            method: op.method,
            path: op.path.clone(),
            base_url: base_url.to_string(),
            content_type,
            path_params,
            query_params,
            header_params,
            body_param,
            auth,
        },
        name,
    }
}

/// Add a declared parameter to the input schema under `field`.
fn insert_param(
    schema: &mut InputSchema,
    tool: &str,
    field: &str,
    param: &NormalizedParam,
) -> bool {
    let property = with_description(param.schema.clone(), param.description.as_deref());
    let inserted = schema.insert(field, property, param.required);
    if !inserted {
        warn!(
            "Tool '{}': input field '{}' is already taken, skipping parameter '{}'",
            tool, field, param.name
        );
    }
    inserted
}

fn map_body(schema: &mut InputSchema, tool: &str, op: &NormalizedOperation) -> BodyParam {
    let Some(body) = &op.request_body else {
        return BodyParam::NoBody;
    };
    if !op.method.allows_body() {
        warn!(
            "Tool '{}': {} does not carry a request body, ignoring it",
            tool, op.method
        );
        return BodyParam::NoBody;
    }

    match body {
        RequestBodyShape::Structured { properties, .. } => {
            for prop in properties {
                if !schema.insert(&prop.name, prop.schema.clone(), prop.required) {
                    warn!(
                        "Tool '{}': body property '{}' clashes with a parameter, skipping",
                        tool, prop.name
                    );
                }
            }
            BodyParam::StructuredBody
        }
        RequestBodyShape::Opaque {
            required,
            description,
            schema: body_schema,
            ..
        } => {
            let property = with_description(body_schema.clone(), description.as_deref());
            if schema.insert(RAW_BODY_FIELD, property, *required) {
                BodyParam::RawBody
            } else {
                warn!(
                    "Tool '{tool}': input field 'body' is taken by a parameter, dropping the request body"
                );
                BodyParam::NoBody
            }
        }
    }
}

fn tool_description(op: &NormalizedOperation) -> String {
    [op.summary.as_deref(), op.description.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map_or_else(|| format!("{} {}", op.method, op.path), str::to_string)
}

/// Attach a description to a schema object unless it already has one.
fn with_description(mut schema: Value, description: Option<&str>) -> Value {
    if let Some(desc) = description.map(str::trim).filter(|d| !d.is_empty())
        && let Some(obj) = schema.as_object_mut()
    {
        obj.entry("description")
            .or_insert_with(|| Value::String(desc.to_string()));
    }
    schema
}

/// Placeholder names in a path template with their occurrence counts.
fn path_placeholders(path: &str) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        if !name.is_empty() {
            *counts.entry(name).or_insert(0) += 1;
        }
        rest = &after[end + 1..];
    }
    counts
}

/// Derive one binding per usable security scheme.
///
/// Environment variable names are the scheme name in SCREAMING_SNAKE_CASE
/// plus a credential-kind suffix; clashes get `_2`, `_3`, ... in sorted
/// scheme order.
fn auth_bindings(schemes: &BTreeMap<String, SecuritySchemeDef>) -> BTreeMap<String, AuthBinding> {
    let mut used: HashSet<String> = HashSet::new();
    let mut bindings = BTreeMap::new();

    for (name, def) in schemes {
        let Some(scheme) = auth_scheme(name, def) else {
            warn!("Security scheme '{name}' ({def:?}) is not supported, skipping");
            continue;
        };
        let env_var = dedupe_name(&env_var_base(name, scheme.kind), |n| used.contains(n));
        used.insert(env_var.clone());
        bindings.insert(name.clone(), AuthBinding { scheme, env_var });
    }

    bindings
}

fn auth_scheme(name: &str, def: &SecuritySchemeDef) -> Option<AuthScheme> {
    let (kind, scheme, param_name, location) = match def {
        SecuritySchemeDef::Http { scheme } => match scheme.as_str() {
            "bearer" => (AuthKind::Bearer, scheme.clone(), None, None),
            "basic" => (AuthKind::Basic, scheme.clone(), None, None),
            _ => return None,
        },
        SecuritySchemeDef::ApiKey { name, location } => {
            let location = match location.as_str() {
                "header" => ApiKeyLocation::Header,
                "query" => ApiKeyLocation::Query,
                _ => return None,
            };
            let param_name = Some(name.clone()).filter(|n| !n.is_empty());
            (AuthKind::ApiKey, "apiKey".to_string(), param_name, Some(location))
        }
        SecuritySchemeDef::OAuth2 => (AuthKind::Bearer, "oauth2".to_string(), None, None),
        SecuritySchemeDef::OpenIdConnect => {
            (AuthKind::Bearer, "openIdConnect".to_string(), None, None)
        }
        SecuritySchemeDef::Unsupported(_) => return None,
    };

    Some(AuthScheme {
        kind,
        scheme,
        param_name,
        location,
        name: name.to_string(),
    })
}

fn env_var_base(scheme_name: &str, kind: AuthKind) -> String {
    let mut base = to_screaming_snake_case(scheme_name);
    if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
        base = format!("API_{base}").trim_end_matches('_').to_string();
    }
    let suffix = kind.env_suffix();
    if base == suffix || base.ends_with(&format!("_{suffix}")) {
        base
    } else {
        format!("{base}_{suffix}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ir::HttpMethod;
    use crate::openapi::BodyProperty;

    fn param(name: &str, location: ParamLocation, required: bool) -> NormalizedParam {
        NormalizedParam {
            name: name.to_string(),
            location,
            required,
            description: None,
            schema: json!({ "type": "string" }),
        }
    }

    fn op(method: HttpMethod, path: &str) -> NormalizedOperation {
        NormalizedOperation {
            operation_id: None,
            method,
            path: path.to_string(),
            summary: None,
            description: None,
            parameters: Vec::new(),
            request_body: None,
            security: Vec::new(),
        }
    }

    fn spec(operations: Vec<NormalizedOperation>) -> NormalizedSpec {
        NormalizedSpec {
            title: "Example API".into(),
            version: "2.1.0".into(),
            description: None,
            base_urls: vec!["https://api.example.com".into()],
            operations,
            security_schemes: BTreeMap::new(),
        }
    }

    fn sample_spec() -> NormalizedSpec {
        let mut get_user = op(HttpMethod::Get, "/users/{id}");
        get_user.operation_id = Some("getUser".into());
        get_user.parameters = vec![
            param("id", ParamLocation::Path, true),
            param("fields", ParamLocation::Query, false),
            param("X-Request-ID", ParamLocation::Header, false),
            param("session", ParamLocation::Cookie, false),
        ];
        get_user.security = vec!["bearerAuth".into()];

        let mut update_user = op(HttpMethod::Put, "/users/{id}");
        update_user.parameters = vec![param("id", ParamLocation::Path, true)];
        update_user.request_body = Some(RequestBodyShape::Structured {
            content_type: "application/json".into(),
            properties: vec![
                BodyProperty {
                    name: "name".into(),
                    required: true,
                    schema: json!({ "type": "string" }),
                },
                BodyProperty {
                    name: "id".into(),
                    required: false,
                    schema: json!({ "type": "string" }),
                },
            ],
        });
        update_user.security = vec!["apiKey".into(), "bearerAuth".into()];

        let mut upload = op(HttpMethod::Post, "/files");
        upload.request_body = Some(RequestBodyShape::Opaque {
            content_type: "text/plain".into(),
            required: true,
            description: Some("File contents".into()),
            schema: json!({ "type": "string" }),
        });

        let mut s = spec(vec![get_user, update_user, upload]);
        s.security_schemes.insert(
            "bearerAuth".into(),
            SecuritySchemeDef::Http {
                scheme: "bearer".into(),
            },
        );
        s.security_schemes.insert(
            "apiKey".into(),
            SecuritySchemeDef::ApiKey {
                name: "X-API-Key".into(),
                location: "header".into(),
            },
        );
        s
    }

    #[test]
    fn test_map_is_idempotent() {
        let s = sample_spec();
        let first = serde_json::to_string(&map(&s)).unwrap();
        let second = serde_json::to_string(&map(&s)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fields_partition_input_schema() {
        let config = map(&sample_spec());
        for tool in &config.tools {
            let h = &tool.handler;
            let mut seen: Vec<String> = h
                .path_params
                .iter()
                .chain(&h.query_params)
                .cloned()
                .chain(h.header_params.iter().map(|p| p.field.clone()))
                .collect();
            let bound: HashSet<_> = seen.iter().cloned().collect();
            assert_eq!(bound.len(), seen.len(), "overlap in {}", tool.name);
            if h.body_param != BodyParam::NoBody {
                seen.extend(
                    tool.input_schema
                        .field_names()
                        .filter(|f| !bound.contains(*f))
                        .map(str::to_string),
                );
            }
            seen.sort();
            let all: Vec<String> = tool.input_schema.field_names().map(str::to_string).collect();
            assert_eq!(seen, all, "partition mismatch in {}", tool.name);
        }
    }

    #[test]
    fn test_classifies_parameters() {
        let config = map(&sample_spec());
        let tool = config.tool("get_user").unwrap();
        assert_eq!(tool.handler.path_params, vec!["id"]);
        assert_eq!(tool.handler.query_params, vec!["fields"]);
        assert_eq!(
            tool.handler.header_params,
            vec![HeaderParam {
                name: "X-Request-ID".into(),
                field: "header_X_Request_ID".into()
            }]
        );
        assert_eq!(tool.handler.body_param, BodyParam::NoBody);
        assert!(tool.handler.content_type.is_none());
        assert!(!tool.input_schema.contains("session"));
        assert!(tool.input_schema.is_required("id"));
        assert!(!tool.input_schema.is_required("fields"));
    }

    #[test]
    fn test_structured_body_skips_clashing_property() {
        let config = map(&sample_spec());
        let tool = config.tool("put_users_by_id").unwrap();
        assert_eq!(tool.handler.body_param, BodyParam::StructuredBody);
        assert_eq!(tool.handler.content_type.as_deref(), Some("application/json"));
        let fields: Vec<_> = tool.input_schema.field_names().collect();
        assert_eq!(fields, vec!["id", "name"]);
        assert!(tool.input_schema.is_required("name"));
    }

    #[test]
    fn test_opaque_body() {
        let config = map(&sample_spec());
        let tool = config.tool("post_files").unwrap();
        assert_eq!(tool.handler.body_param, BodyParam::RawBody);
        assert_eq!(tool.handler.content_type.as_deref(), Some("text/plain"));
        assert_eq!(
            tool.input_schema.properties["body"],
            json!({ "type": "string", "description": "File contents" })
        );
        assert!(tool.input_schema.is_required("body"));
    }

    #[test]
    fn test_body_ignored_for_get() {
        let mut get = op(HttpMethod::Get, "/search");
        get.request_body = Some(RequestBodyShape::Opaque {
            content_type: "application/json".into(),
            required: false,
            description: None,
            schema: json!({}),
        });
        let config = map(&spec(vec![get]));
        assert_eq!(config.tools[0].handler.body_param, BodyParam::NoBody);
        assert!(config.tools[0].input_schema.properties.is_empty());
    }

    #[test]
    fn test_auth_bindings_and_env_vars() {
        let config = map(&sample_spec());
        assert_eq!(config.env_vars, vec!["BEARER_AUTH_TOKEN", "API_KEY"]);

        let tool = config.tool("put_users_by_id").unwrap();
        let api_key = &tool.handler.auth[0];
        assert_eq!(api_key.env_var, "API_KEY");
        assert_eq!(api_key.scheme.kind, AuthKind::ApiKey);
        assert_eq!(api_key.scheme.param_name.as_deref(), Some("X-API-Key"));
        assert_eq!(api_key.scheme.location, Some(ApiKeyLocation::Header));
        assert_eq!(tool.handler.auth[1].env_var, "BEARER_AUTH_TOKEN");
    }

    #[test]
    fn test_env_var_collisions_are_suffixed() {
        let mut schemes = BTreeMap::new();
        schemes.insert(
            "token".to_string(),
            SecuritySchemeDef::Http {
                scheme: "bearer".into(),
            },
        );
        schemes.insert("tokenToken".to_string(), SecuritySchemeDef::OAuth2);
        schemes.insert(
            "cookieKey".to_string(),
            SecuritySchemeDef::ApiKey {
                name: "sid".into(),
                location: "cookie".into(),
            },
        );
        let bindings = auth_bindings(&schemes);
        assert_eq!(bindings["token"].env_var, "TOKEN");
        assert_eq!(bindings["tokenToken"].env_var, "TOKEN_TOKEN");
        assert!(!bindings.contains_key("cookieKey"));

        let mut clash = BTreeMap::new();
        clash.insert("my-key".to_string(), SecuritySchemeDef::OAuth2);
        clash.insert("my_key".to_string(), SecuritySchemeDef::OAuth2);
        let bindings = auth_bindings(&clash);
        assert_eq!(bindings["my-key"].env_var, "MY_KEY_TOKEN");
        assert_eq!(bindings["my_key"].env_var, "MY_KEY_TOKEN_2");
    }

    #[test]
    fn test_tool_names_deduplicated() {
        let mut a = op(HttpMethod::Get, "/a");
        a.operation_id = Some("fetch".into());
        let mut b = op(HttpMethod::Get, "/b");
        b.operation_id = Some("fetch".into());
        let config = map(&spec(vec![a, b]));
        let names: Vec<_> = config.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["fetch", "fetch_2"]);
    }

    #[test]
    fn test_long_duplicate_names_stay_within_limit() {
        let id = "x".repeat(80);
        let mut a = op(HttpMethod::Get, "/a");
        a.operation_id = Some(id.clone());
        let mut b = op(HttpMethod::Get, "/b");
        b.operation_id = Some(id);
        let config = map(&spec(vec![a, b]));
        assert_eq!(config.tools[0].name, "x".repeat(MAX_TOOL_NAME_LEN));
        assert_eq!(config.tools[1].name, format!("{}_2", "x".repeat(MAX_TOOL_NAME_LEN - 2)));
        assert!(config.tools.iter().all(|t| t.name.len() <= MAX_TOOL_NAME_LEN));
    }

    #[test]
    fn test_undeclared_and_unmatched_path_params() {
        let mut o = op(HttpMethod::Get, "/orgs/{org}/repos/{repo}");
        o.parameters = vec![
            param("repo", ParamLocation::Path, true),
            param("ghost", ParamLocation::Path, true),
        ];
        let config = map(&spec(vec![o]));
        let tool = &config.tools[0];
        assert_eq!(tool.handler.path_params, vec!["repo", "org"]);
        assert!(!tool.input_schema.contains("ghost"));
        assert!(tool.input_schema.is_required("org"));
    }

    #[test]
    fn test_config_header_fields() {
        let config = map(&sample_spec());
        assert_eq!(config.name, "example-api");
        assert_eq!(config.version, "2.1.0");
        assert_eq!(config.description, "Example API");
        assert_eq!(config.base_url, "https://api.example.com");

        let options = MapOptions {
            name: Some("custom".into()),
            version: None,
            base_url: Some("https://staging.example.com".into()),
        };
        let config = map_with_options(&sample_spec(), &options);
        assert_eq!(config.name, "custom");
        assert!(
            config
                .tools
                .iter()
                .all(|t| t.handler.base_url == "https://staging.example.com")
        );
    }

    #[test]
    fn test_description_fallbacks() {
        let mut o = op(HttpMethod::Delete, "/items/{id}");
        assert_eq!(tool_description(&o), "DELETE /items/{id}");
        o.description = Some("Deletes an item".into());
        assert_eq!(tool_description(&o), "Deletes an item");
        o.summary = Some("  Delete item ".into());
        assert_eq!(tool_description(&o), "Delete item");
    }

    #[test]
    fn test_disable_tools_keeps_tools() {
        let mut config = map(&sample_spec());
        let unknown = config.disable_tools(&["get_user", "nope"]);
        assert_eq!(unknown, vec!["nope"]);
        assert_eq!(config.tools.len(), 3);
        assert!(!config.tool("get_user").unwrap().enabled);
        assert_eq!(config.enabled_tools().count(), 2);
    }
}
