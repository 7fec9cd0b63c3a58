//! Tool call execution.
//!
//! A call goes through:
//! 1. Build: handler + inputs + credentials -> `PreparedRequest`
//! 2. Gate: blocked hosts are refused before anything is sent
//! 3. Dispatch: one attempt, bounded by the configured timeout. Redirects
//!    are followed here, each hop through the gate; a hop to another origin
//!    loses the credential headers
//! 4. Normalize: status, headers and body into an `ExecutionResult`
//!
//! Nothing is retried and no state is kept between calls.

mod auth;
mod request;
mod response;
mod safety;

pub use auth::resolve_auth;
pub use request::{PreparedRequest, build_request, user_agent};
pub use response::{
    ExecutionResult, MAX_BODY_CHARS, SENSITIVE_QUERY_KEYS, redact_url, redact_url_with,
};
pub use safety::{BLOCKED_HOST_PREFIXES, check_url, is_blocked_host};

use reqwest::redirect::Policy;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ExecuteError;
use crate::ir::{HandlerSpec, HttpMethod, ResolvedAuth};

/// Wall-clock limit for one call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Redirect hops followed before a call fails.
pub const MAX_REDIRECTS: usize = 10;

/// Executor settings.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Wall-clock limit for one call, redirects included.
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Executes tool calls over HTTP.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Executor {
    client: reqwest::Client,
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor with its own HTTP client.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecuteError> {
        let client = client_builder().build().map_err(|err| {
            warn!(error = %err, "Failed to build executor HTTP client.");
            ExecuteError::Client(err.to_string())
        })?;
        Ok(Self { client, config })
    }

    /// Use a caller-built client. Start from [`client_builder`] to keep the
    /// redirect gate.
    pub fn with_client(client: reqwest::Client, config: ExecutorConfig) -> Self {
        Self { client, config }
    }

    /// Settings this executor runs with.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run one call.
    ///
    /// Validation failures and blocked hosts are errors. Timeouts and
    /// transport failures are reported as an [`ExecutionResult`] with
    /// status 0.
    pub async fn execute(
        &self,
        handler: &HandlerSpec,
        inputs: &Map<String, Value>,
        auth: &[ResolvedAuth],
    ) -> Result<ExecutionResult, ExecuteError> {
        let prepared = match build_request(handler, inputs, auth) {
            Ok(prepared) => prepared,
            Err(err @ ExecuteError::Blocked { .. }) => {
                warn!(error = %err, "Refusing to send request.");
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        let display_url = prepared.display_url();

        debug!(method = %prepared.method, url = %display_url, "Dispatching request.");
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.config.timeout, send(&self.client, &prepared)).await;
        let timing_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Err(_) => {
                let secs = self.config.timeout.as_secs_f64();
                warn!(url = %display_url, timing_ms, "Request timed out.");
                ExecutionResult::network_error(
                    format!("Request timed out after {secs} seconds"),
                    timing_ms,
                    display_url,
                )
            }
            Ok(Err(message)) => {
                warn!(url = %display_url, error = %message, "Request failed.");
                ExecutionResult::network_error(message, timing_ms, display_url)
            }
            Ok(Ok(raw)) => {
                info!(
                    method = %prepared.method,
                    url = %display_url,
                    status = raw.status.as_u16(),
                    timing_ms,
                    "Request completed."
                );
                let content_type = raw.headers.get("content-type").cloned();
                ExecutionResult {
                    status: raw.status.as_u16(),
                    status_text: raw.status.canonical_reason().unwrap_or("").to_string(),
                    body: response::format_body(content_type.as_deref(), raw.body),
                    headers: raw.headers,
                    timing_ms,
                    url: display_url,
                }
            }
        };
        Ok(result)
    }
}

/// Client builder for the executor.
///
/// Automatic redirects are off: [`Executor::execute`] follows them itself so
/// every hop goes through the host gate.
pub fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().redirect(Policy::none())
}

struct RawResponse {
    status: reqwest::StatusCode,
    headers: BTreeMap<String, String>,
    body: String,
}

/// Send `prepared`, following redirects. Errors are rendered messages.
async fn send(client: &reqwest::Client, prepared: &PreparedRequest) -> Result<RawResponse, String> {
    let mut url = Url::parse(&prepared.url).map_err(|err| err.to_string())?;
    let origin = url.origin();
    let mut method = prepared.method;
    let mut headers = prepared.headers.clone();
    let mut body = prepared.body.clone();
    let mut hops = 0;

    loop {
        let mut builder = client.request(reqwest_method(method), url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            builder = builder.body(body.clone());
        }
        let response = builder
            .send()
            .await
            .map_err(|err| error_chain(&err.without_url()))?;

        let status = response.status();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let Some(location) = location.filter(|_| is_followed_redirect(status)) else {
            return read_response(response).await;
        };

        if hops >= MAX_REDIRECTS {
            return Err("too many redirects".to_string());
        }
        hops += 1;

        let next = url
            .join(&location)
            .map_err(|err| format!("invalid redirect location '{location}': {err}"))?;
        let host = next.host_str().unwrap_or_default().to_string();
        if host.is_empty() || is_blocked_host(&host) {
            warn!(%host, "Blocked redirect to private or internal host.");
            return Err(format!("redirect to blocked host '{host}'"));
        }

        if next.origin() != origin {
            headers.retain(|(name, _)| {
                !prepared
                    .credential_headers
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(name))
            });
        }
        if !matches!(status.as_u16(), 307 | 308) {
            if method != HttpMethod::Head {
                method = HttpMethod::Get;
            }
            body = None;
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        }
        debug!(status = status.as_u16(), %host, hops, "Following redirect.");
        url = next;
    }
}

fn is_followed_redirect(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

async fn read_response(response: reqwest::Response) -> Result<RawResponse, String> {
    let status = response.status();
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in response.headers() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    let body = response
        .text()
        .await
        .map_err(|err| error_chain(&err.without_url()))?;
    Ok(RawResponse {
        status,
        headers,
        body,
    })
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

/// Render an error with its sources, `outer: inner: root`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Executor>();
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(ExecutorConfig::default().timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_followed_redirect_statuses() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_followed_redirect(
                reqwest::StatusCode::from_u16(code).unwrap()
            ));
        }
        assert!(!is_followed_redirect(reqwest::StatusCode::NOT_MODIFIED));
        assert!(!is_followed_redirect(reqwest::StatusCode::OK));
    }

    #[test]
    fn test_error_chain_skips_repeats() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("request failed")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }
        let err = Outer(std::io::Error::other("connection refused"));
        assert_eq!(error_chain(&err), "request failed: connection refused");
    }
}
