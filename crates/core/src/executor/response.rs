//! Normalized call results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum length, in characters, of a non-JSON response body.
pub const MAX_BODY_CHARS: usize = 500_000;

const NETWORK_ERROR: &str = "Network Error";

/// Query keys whose values never appear in reported URLs.
pub const SENSITIVE_QUERY_KEYS: &[&str] = &[
    "api_key",
    "api-key",
    "apikey",
    "key",
    "token",
    "access_token",
    "secret",
    "client_secret",
    "password",
    "auth",
];

/// Outcome of one tool call.
///
/// Transport failures and timeouts are represented with `status == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// HTTP status code, or 0 when no response arrived.
    pub status: u16,
    /// Canonical reason phrase, or `Network Error`.
    pub status_text: String,
    /// Response headers with lowercase names. Repeated headers are joined
    /// with `, `.
    pub headers: BTreeMap<String, String>,
    /// Response body, or the failure message for network errors.
    pub body: String,
    /// Wall-clock duration of the call.
    pub timing_ms: u64,
    /// Request URL with credential-like query values redacted.
    pub url: String,
}

impl ExecutionResult {
    /// Result for a call that produced no HTTP response.
    pub fn network_error(message: String, timing_ms: u64, url: String) -> Self {
        Self {
            status: 0,
            status_text: NETWORK_ERROR.to_string(),
            headers: BTreeMap::new(),
            body: message,
            timing_ms,
            url,
        }
    }

    /// The request never produced an HTTP response.
    pub fn is_network_error(&self) -> bool {
        self.status == 0
    }

    /// Whether the server answered with a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Pretty-print JSON bodies; cap everything else at [`MAX_BODY_CHARS`].
pub fn format_body(content_type: Option<&str>, text: String) -> String {
    let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    if is_json
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(&text)
        && let Ok(pretty) = serde_json::to_string_pretty(&value)
    {
        return pretty;
    }
    truncate_chars(text, MAX_BODY_CHARS)
}

fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
    text
}

/// Replace values of credential-like query parameters with `***`.
pub fn redact_url(url: &str) -> String {
    redact_url_with::<&str>(url, &[])
}

/// Like [`redact_url`], also hiding the values of `extra_keys`.
pub fn redact_url_with<S: AsRef<str>>(url: &str, extra_keys: &[S]) -> String {
    let Some((base, rest)) = url.split_once('?') else {
        return url.to_string();
    };
    let (query, fragment) = match rest.split_once('#') {
        Some((q, f)) => (q, Some(f)),
        None => (rest, None),
    };

    let redacted: Vec<String> = query
        .split('&')
        .map(|pair| {
            let key = pair.split_once('=').map_or(pair, |(k, _)| k);
            if is_sensitive_key(key, extra_keys) {
                format!("{key}=***")
            } else {
                pair.to_string()
            }
        })
        .collect();

    let mut out = format!("{base}?{}", redacted.join("&"));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn is_sensitive_key<S: AsRef<str>>(key: &str, extra_keys: &[S]) -> bool {
    let decoded = url::form_urlencoded::parse(key.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default();
    SENSITIVE_QUERY_KEYS
        .iter()
        .copied()
        .chain(extra_keys.iter().map(AsRef::as_ref))
        .any(|s| decoded.eq_ignore_ascii_case(s))
}
