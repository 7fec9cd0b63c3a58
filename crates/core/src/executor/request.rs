//! Request synthesis: handler metadata + inputs + credentials -> HTTP request.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};
use tracing::debug;

use super::auth::{apply_auth, set_header};
use super::response::redact_url_with;
use super::safety::check_url;
use crate::error::ExecuteError;
use crate::ir::{BodyParam, HandlerSpec, HttpMethod, RAW_BODY_FIELD, ResolvedAuth};

/// Characters left unescaped in path values, matching `encodeURIComponent`.
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const ACCEPT: &str = "application/json, */*";

/// `User-Agent` sent with every request.
pub fn user_agent() -> String {
    format!("apitool/{}", env!("CARGO_PKG_VERSION"))
}

/// A fully synthesized request, ready to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute URL including the query string.
    pub url: String,
    /// Headers in the order they were set.
    pub headers: Vec<(String, String)>,
    /// Serialized body, if the method and handler carry one.
    pub body: Option<String>,
    /// Header names carrying credentials. Dropped when a redirect leaves
    /// the original origin.
    pub credential_headers: Vec<String>,
    /// Query keys carrying credentials.
    pub credential_query_keys: Vec<String>,
}

impl PreparedRequest {
    /// The URL with credential values redacted, for results and logs.
    pub fn display_url(&self) -> String {
        redact_url_with(&self.url, &self.credential_query_keys)
    }


    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Build the request for one call without touching the network.
///
/// Fails with [`ExecuteError::Validation`] when the handler has no base URL
/// or path, and with [`ExecuteError::Blocked`] when the target host is not
/// allowed.
pub fn build_request(
    handler: &HandlerSpec,
    inputs: &Map<String, Value>,
    auth: &[ResolvedAuth],
) -> Result<PreparedRequest, ExecuteError> {
    if handler.base_url.is_empty() {
        return Err(ExecuteError::Validation(
            "Missing required field: baseUrl".to_string(),
        ));
    }
    if handler.path.is_empty() {
        return Err(ExecuteError::Validation(
            "Missing required field: path".to_string(),
        ));
    }

    let mut url = format!("{}{}", handler.base_url.trim_end_matches('/'), handler.path);
    for name in &handler.path_params {
        if let Some(value) = input_string(inputs, name) {
            let encoded = utf8_percent_encode(&value, PATH_VALUE).to_string();
            url = url.replace(&format!("{{{name}}}"), &encoded);
        }
    }

    let mut query: Vec<(String, String)> = handler
        .query_params
        .iter()
        .filter_map(|name| input_string(inputs, name).map(|v| (name.clone(), v)))
        .collect();

    check_url(&with_query(&url, &query))?;

    let mut headers = vec![
        ("User-Agent".to_string(), user_agent()),
        ("Accept".to_string(), ACCEPT.to_string()),
    ];
    if handler.method.allows_body()
        && let Some(content_type) = &handler.content_type
    {
        headers.push(("Content-Type".to_string(), content_type.clone()));
    }
    for param in &handler.header_params {
        if let Some(value) = input_string(inputs, &param.field) {
            set_header(&mut headers, &param.name, value);
        }
    }

    let credentials = apply_auth(auth, &mut headers, &mut query);

    let body = if handler.method.allows_body() {
        build_body(handler, inputs)
    } else {
        None
    };

    let url = with_query(&url, &query);
    debug!(
        method = %handler.method,
        path = %handler.path,
        query_pairs = query.len(),
        has_body = body.is_some(),
        "Built request."
    );

    Ok(PreparedRequest {
        method: handler.method,
        url,
        headers,
        body,
        credential_headers: credentials.headers,
        credential_query_keys: credentials.query_keys,
    })
}

fn build_body(handler: &HandlerSpec, inputs: &Map<String, Value>) -> Option<String> {
    match handler.body_param {
        BodyParam::NoBody => None,
        BodyParam::RawBody => match inputs.get(RAW_BODY_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        },
        BodyParam::StructuredBody => {
            let bound = handler.bound_fields();
            let object: Map<String, Value> = inputs
                .iter()
                .filter(|(k, _)| !bound.contains(k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Some(Value::Object(object).to_string())
        }
    }
}

fn with_query(url: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{encoded}")
}

/// Stringify an input for use in a path, query or header.
///
/// Missing, null and empty-string values yield `None`.
fn input_string(inputs: &Map<String, Value>, name: &str) -> Option<String> {
    value_to_string(inputs.get(name)?)
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => Some(value.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| value_to_string(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
    }
}
