//! Outbound network gate.
//!
//! Requests to loopback, private and link-local hosts are refused before
//! anything is sent. Matching is done on the host text as the URL parser
//! normalizes it, so `LOCALHOST` and `127.1` are caught as well. A single
//! trailing dot is ignored and IPv4-mapped IPv6 addresses are checked as
//! their IPv4 form.

use std::net::Ipv6Addr;
use url::Url;

use crate::error::ExecuteError;

/// IPv4 prefixes refused outright. `172.16.0.0/12` is checked separately.
pub const BLOCKED_HOST_PREFIXES: &[&str] = &["127.", "10.", "0.", "192.168.", "169.254."];

/// Whether `host` names a loopback, private or link-local target.
pub fn is_blocked_host(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return inner.parse::<Ipv6Addr>().is_ok_and(|addr| {
            addr.is_loopback()
                || addr
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_blocked_host(&v4.to_string()))
        });
    }
    if BLOCKED_HOST_PREFIXES.iter().any(|p| host.starts_with(p)) {
        return true;
    }
    // 172.16.0.0/12
    host.strip_prefix("172.")
        .and_then(|rest| rest.split('.').next())
        .and_then(|octet| octet.parse::<u8>().ok())
        .is_some_and(|octet| (16..=31).contains(&octet))
}

/// Reject URLs that do not parse, have no host, or point at a blocked host.
pub fn check_url(url: &str) -> Result<(), ExecuteError> {
    let parsed = Url::parse(url).map_err(|_| ExecuteError::Blocked {
        host: url.to_string(),
    })?;
    match parsed.host_str() {
        Some(host) if !is_blocked_host(host) => Ok(()),
        Some(host) => Err(ExecuteError::Blocked {
            host: host.to_string(),
        }),
        None => Err(ExecuteError::Blocked {
            host: url.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_hosts() {
        for host in [
            "localhost",
            "LocalHost",
            "127.0.0.1",
            "10.0.0.5",
            "0.0.0.0",
            "192.168.1.1",
            "169.254.169.254",
            "172.16.0.1",
            "172.20.0.1",
            "172.31.255.255",
            "[::1]",
            "localhost.",
            "127.0.0.1.",
            "[::ffff:7f00:1]",
            "[::ffff:a00:5]",
            "[0:0:0:0:0:0:0:1]",
        ] {
            assert!(is_blocked_host(host), "{host} should be blocked");
        }
    }

    #[test]
    fn test_allowed_hosts() {
        for host in [
            "api.example.com",
            "172.32.0.1",
            "172.15.0.1",
            "8.8.8.8",
            "100.64.0.1",
            "localhost.example.com",
            "example.com.",
            "[::ffff:808:808]",
            "[2001:db8::1]",
        ] {
            assert!(!is_blocked_host(host), "{host} should be allowed");
        }
    }

    #[test]
    fn test_check_url() {
        assert!(check_url("https://api.example.com/users").is_ok());
        assert!(check_url("http://172.32.0.1:8080/").is_ok());

        let err = check_url("http://LOCALHOST:3000/admin").unwrap_err();
        assert!(matches!(err, ExecuteError::Blocked { ref host } if host == "localhost"));
        assert!(check_url("http://[::1]/").is_err());
        assert!(check_url("http://127.1/").is_err());
        assert!(check_url("http://localhost./admin").is_err());
        assert!(check_url("http://[::ffff:127.0.0.1]/").is_err());
        assert!(check_url("http://[::ffff:192.168.0.1]:8080/").is_err());
        assert!(check_url("not a url").is_err());
        assert!(check_url("/relative/path").is_err());
    }
}
