//! Credential resolution and application.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::ir::{ApiKeyLocation, AuthBinding, AuthKind, ResolvedAuth};

const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";
const DEFAULT_API_KEY_QUERY: &str = "api_key";
const AUTHORIZATION: &str = "Authorization";

/// Resolve bindings to credentials through `lookup` (usually the process
/// environment). Bindings whose variable is unset or empty are skipped.
pub fn resolve_auth<F>(bindings: &[AuthBinding], lookup: F) -> Vec<ResolvedAuth>
where
    F: Fn(&str) -> Option<String>,
{
    bindings
        .iter()
        .filter_map(|binding| {
            let Some(value) = lookup(&binding.env_var).filter(|v| !v.is_empty()) else {
                debug!(env_var = %binding.env_var, scheme = %binding.scheme.name, "Credential not set, skipping.");
                return None;
            };
            Some(ResolvedAuth {
                kind: binding.scheme.kind,
                value,
                header_name: binding.scheme.param_name.clone(),
                location: binding.scheme.location,
            })
        })
        .collect()
}

/// Header and query names that ended up carrying a credential.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CredentialNames {
    pub headers: Vec<String>,
    pub query_keys: Vec<String>,
}

impl CredentialNames {
    fn add_header(&mut self, name: &str) {
        if !self.headers.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            self.headers.push(name.to_string());
        }
    }
}

/// Apply credentials to the outgoing headers or query pairs.
pub fn apply_auth(
    auth: &[ResolvedAuth],
    headers: &mut Vec<(String, String)>,
    query: &mut Vec<(String, String)>,
) -> CredentialNames {
    let mut names = CredentialNames::default();
    for cred in auth.iter().filter(|c| !c.value.is_empty()) {
        match cred.kind {
            AuthKind::Bearer => {
                set_header(headers, AUTHORIZATION, format!("Bearer {}", cred.value));
                names.add_header(AUTHORIZATION);
            }
            AuthKind::Basic => {
                let encoded = STANDARD.encode(cred.value.as_bytes());
                set_header(headers, AUTHORIZATION, format!("Basic {encoded}"));
                names.add_header(AUTHORIZATION);
            }
            AuthKind::ApiKey => {
                if cred.location == Some(ApiKeyLocation::Query) {
                    let name = cred.header_name.as_deref().unwrap_or(DEFAULT_API_KEY_QUERY);
                    query.push((name.to_string(), cred.value.clone()));
                    names.query_keys.push(name.to_string());
                } else {
                    let name = cred.header_name.as_deref().unwrap_or(DEFAULT_API_KEY_HEADER);
                    set_header(headers, name, cred.value.clone());
                    names.add_header(name);
                }
            }
        }
    }
    names
}

/// Set a header, replacing any existing value with the same name.
pub fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    if let Some(slot) = headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        slot.1 = value;
    } else {
        headers.push((name.to_string(), value));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ir::AuthScheme;

    fn binding(name: &str, kind: AuthKind, env_var: &str) -> AuthBinding {
        AuthBinding {
            scheme: AuthScheme {
                kind,
                scheme: "bearer".into(),
                param_name: None,
                location: None,
                name: name.into(),
            },
            env_var: env_var.into(),
        }
    }

    fn cred(kind: AuthKind, value: &str) -> ResolvedAuth {
        ResolvedAuth {
            kind,
            value: value.into(),
            header_name: None,
            location: None,
        }
    }

    #[test]
    fn test_resolve_auth_skips_unset() {
        let bindings = vec![
            binding("bearerAuth", AuthKind::Bearer, "BEARER_AUTH_TOKEN"),
            binding("other", AuthKind::Bearer, "OTHER_TOKEN"),
            binding("empty", AuthKind::Bearer, "EMPTY_TOKEN"),
        ];
        let resolved = resolve_auth(&bindings, |var| match var {
            "BEARER_AUTH_TOKEN" => Some("abc".to_string()),
            "EMPTY_TOKEN" => Some(String::new()),
            _ => None,
        });
        assert_eq!(resolved, vec![cred(AuthKind::Bearer, "abc")]);
    }

    #[test]
    fn test_bearer_and_basic() {
        let mut headers = Vec::new();
        let mut query = Vec::new();
        let names = apply_auth(&[cred(AuthKind::Bearer, "tok")], &mut headers, &mut query);
        assert_eq!(headers, vec![("Authorization".into(), "Bearer tok".into())]);
        assert_eq!(names.headers, vec!["Authorization"]);

        let names = apply_auth(&[cred(AuthKind::Basic, "user:pass")], &mut headers, &mut query);
        assert_eq!(names.headers, vec!["Authorization"]);
        assert_eq!(
            headers,
            vec![("Authorization".into(), "Basic dXNlcjpwYXNz".into())]
        );
        assert!(query.is_empty());
    }

    #[test]
    fn test_api_key_locations() {
        let mut headers = Vec::new();
        let mut query = Vec::new();
        let mut in_query = cred(AuthKind::ApiKey, "k1");
        in_query.location = Some(ApiKeyLocation::Query);
        let mut named = cred(AuthKind::ApiKey, "k2");
        named.header_name = Some("X-Custom-Key".into());

        let names = apply_auth(
            &[in_query, named, cred(AuthKind::ApiKey, "k3"), cred(AuthKind::Bearer, "")],
            &mut headers,
            &mut query,
        );
        assert_eq!(query, vec![("api_key".into(), "k1".into())]);
        assert_eq!(
            headers,
            vec![
                ("X-Custom-Key".into(), "k2".into()),
                ("X-API-Key".into(), "k3".into())
            ]
        );
        assert_eq!(
            names,
            CredentialNames {
                headers: vec!["X-Custom-Key".into(), "X-API-Key".into()],
                query_keys: vec!["api_key".into()],
            }
        );
    }
}
