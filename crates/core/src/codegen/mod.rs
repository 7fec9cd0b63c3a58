//! Standalone tool server generation.
//!
//! The generated TypeScript module carries its own copy of the request
//! runtime (host gate, request building, fetch with timeout and redaction)
//! followed by the tool table. Only enabled tools are emitted.

mod emit;
mod types;

pub use emit::Emit;
pub use types::{TsExpr, TsLiteral, TsModule, TsStmt};

use serde_json::Value;

use crate::executor::{
    BLOCKED_HOST_PREFIXES, DEFAULT_TIMEOUT, MAX_BODY_CHARS, MAX_REDIRECTS, SENSITIVE_QUERY_KEYS,
};
use crate::ir::{
    ApiKeyLocation, AuthBinding, AuthKind, BodyParam, HandlerSpec, InputSchema, RAW_BODY_FIELD,
    STRUCTURED_BODY_SENTINEL, ServerConfig, Tool,
};

const RUNTIME: &str = include_str!("runtime.ts");

/// Render a complete TypeScript tool server for `config`.
pub fn generate_typescript(config: &ServerConfig) -> String {
    codegen_module(config).emit()
}

/// Build the module AST for `config`.
pub fn codegen_module(config: &ServerConfig) -> TsModule {
    let mut body = vec![header_comment(config)];

    body.push(const_decl("SERVER_NAME", TsExpr::string(&config.name)));
    body.push(const_decl("SERVER_VERSION", TsExpr::string(&config.version)));
    body.push(const_decl("TIMEOUT_MS", int(DEFAULT_TIMEOUT.as_millis())));
    body.push(const_decl("MAX_BODY_CHARS", int(MAX_BODY_CHARS)));
    body.push(const_decl("MAX_REDIRECTS", int(MAX_REDIRECTS)));
    body.push(const_decl(
        "BLOCKED_HOST_PREFIXES",
        TsExpr::strings(BLOCKED_HOST_PREFIXES),
    ));
    body.push(const_decl(
        "SENSITIVE_QUERY_KEYS",
        TsExpr::strings(SENSITIVE_QUERY_KEYS),
    ));

    body.push(TsStmt::Raw(RUNTIME.to_string()));

    body.push(TsStmt::VarDecl {
        is_export: true,
        name: "server".into(),
        ty: None,
        init: TsExpr::AsConst(Box::new(TsExpr::Object(vec![
            ("name".into(), TsExpr::string(&config.name)),
            ("version".into(), TsExpr::string(&config.version)),
            ("description".into(), TsExpr::string(&config.description)),
            ("baseUrl".into(), TsExpr::string(&config.base_url)),
            ("envVars".into(), TsExpr::strings(&config.env_vars)),
        ]))),
    });

    body.push(TsStmt::VarDecl {
        is_export: true,
        name: "tools".into(),
        ty: Some("ToolDef[]".into()),
        init: TsExpr::Array(config.enabled_tools().map(tool_expr).collect()),
    });

    TsModule { body }
}

fn header_comment(config: &ServerConfig) -> TsStmt {
    let mut lines = vec![
        format!("{} v{}", config.name, config.version),
        format!(
            "Generated by apitool {}. Do not edit.",
            env!("CARGO_PKG_VERSION")
        ),
    ];
    if !config.env_vars.is_empty() {
        lines.push(String::new());
        lines.push("Credentials are read from:".into());
        lines.extend(config.env_vars.iter().map(|v| format!("  {v}")));
    }
    TsStmt::Comment(lines)
}

fn const_decl(name: &str, init: TsExpr) -> TsStmt {
    TsStmt::VarDecl {
        is_export: false,
        name: name.to_string(),
        ty: None,
        init,
    }
}

fn int<N: TryInto<i64>>(n: N) -> TsExpr {
    TsExpr::Literal(TsLiteral::Int(n.try_into().unwrap_or(i64::MAX)))
}

fn tool_expr(tool: &Tool) -> TsExpr {
    TsExpr::Object(vec![
        ("name".into(), TsExpr::string(&tool.name)),
        ("description".into(), TsExpr::string(&tool.description)),
        ("inputSchema".into(), schema_expr(&tool.input_schema)),
        ("handler".into(), handler_expr(&tool.handler)),
    ])
}

fn schema_expr(schema: &InputSchema) -> TsExpr {
    let mut props = vec![
        ("type".into(), TsExpr::string(&schema.schema_type)),
        (
            "properties".into(),
            TsExpr::Object(
                schema
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), json_expr(v)))
                    .collect(),
            ),
        ),
    ];
    if !schema.required.is_empty() {
        props.push(("required".into(), TsExpr::strings(&schema.required)));
    }
    TsExpr::Object(props)
}

fn handler_expr(handler: &HandlerSpec) -> TsExpr {
    let body_param = match handler.body_param {
        BodyParam::NoBody => TsExpr::Literal(TsLiteral::Null),
        BodyParam::RawBody => TsExpr::string(RAW_BODY_FIELD),
        BodyParam::StructuredBody => TsExpr::string(STRUCTURED_BODY_SENTINEL),
    };
    TsExpr::Object(vec![
        ("method".into(), TsExpr::string(handler.method.as_str())),
        ("path".into(), TsExpr::string(&handler.path)),
        ("baseUrl".into(), TsExpr::string(&handler.base_url)),
        (
            "contentType".into(),
            TsExpr::optional_string(handler.content_type.as_deref()),
        ),
        ("pathParams".into(), TsExpr::strings(&handler.path_params)),
        ("queryParams".into(), TsExpr::strings(&handler.query_params)),
        (
            "headerParams".into(),
            TsExpr::Array(
                handler
                    .header_params
                    .iter()
                    .map(|p| {
                        TsExpr::Object(vec![
                            ("name".into(), TsExpr::string(&p.name)),
                            ("field".into(), TsExpr::string(&p.field)),
                        ])
                    })
                    .collect(),
            ),
        ),
        ("bodyParam".into(), body_param),
        (
            "auth".into(),
            TsExpr::Array(handler.auth.iter().map(auth_expr).collect()),
        ),
    ])
}

fn auth_expr(binding: &AuthBinding) -> TsExpr {
    let kind = match binding.scheme.kind {
        AuthKind::Bearer => "bearer",
        AuthKind::Basic => "basic",
        AuthKind::ApiKey => "apiKey",
    };
    let location = binding.scheme.location.map(|l| match l {
        ApiKeyLocation::Header => "header",
        ApiKeyLocation::Query => "query",
    });
    TsExpr::Object(vec![
        ("type".into(), TsExpr::string(kind)),
        (
            "paramName".into(),
            TsExpr::optional_string(binding.scheme.param_name.as_deref()),
        ),
        ("location".into(), TsExpr::optional_string(location)),
        ("envVar".into(), TsExpr::string(&binding.env_var)),
    ])
}

/// Convert a JSON value into an equivalent JS literal.
fn json_expr(value: &Value) -> TsExpr {
    match value {
        Value::Null => TsExpr::Literal(TsLiteral::Null),
        Value::Bool(b) => TsExpr::Literal(TsLiteral::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => TsExpr::Literal(TsLiteral::Int(i)),
            None => TsExpr::Literal(TsLiteral::Number(n.to_string())),
        },
        Value::String(s) => TsExpr::string(s),
        Value::Array(items) => TsExpr::Array(items.iter().map(json_expr).collect()),
        Value::Object(map) => {
            TsExpr::Object(map.iter().map(|(k, v)| (k.clone(), json_expr(v))).collect())
        }
    }
}
