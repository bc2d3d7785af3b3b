//! Origin/Host validation for DNS-rebinding protection (spec.md §5.2).
//!
//! Per the MCP spec, a server accepting HTTP connections MUST validate both
//! the `Host` and `Origin` headers to prevent a remote page from rebinding a
//! hostname to `127.0.0.1` and talking to a local MCP server through the
//! victim's browser: `Origin` alone only stops the browser-enforced case,
//! since a rebound DNS name still sends that name as `Host` even once the
//! connection lands on the loopback interface. Localhost-to-localhost
//! traffic carries no such risk, so a missing header is only rejected for a
//! non-loopback peer.

use std::collections::HashSet;
use std::net::IpAddr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecurityError {
    #[error("origin '{0}' is not allowed")]
    OriginNotAllowed(String),
    #[error("missing Origin header from remote client")]
    MissingOriginRemote,
    #[error("host '{0}' is not allowed")]
    HostNotAllowed(String),
    #[error("missing Host header from remote client")]
    MissingHostRemote,
}

#[derive(Debug, Clone)]
pub struct OriginGuardConfig {
    pub allowed_origins: HashSet<String>,
    /// `Host` values (hostname, optionally with `:port`) accepted in
    /// addition to the `allow_localhost` prefixes below.
    pub allowed_hosts: HashSet<String>,
    pub allow_localhost: bool,
    /// Disables the check entirely. Only meant for local development.
    pub allow_any: bool,
}

impl Default for OriginGuardConfig {
    fn default() -> Self {
        Self {
            allowed_origins: HashSet::new(),
            allowed_hosts: HashSet::new(),
            allow_localhost: true,
            allow_any: false,
        }
    }
}

impl OriginGuardConfig {
    pub fn with_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.insert(origin.into());
        self
    }

    pub fn with_allowed_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }
}

const LOCALHOST_PREFIXES: [&str; 4] = [
    "http://localhost",
    "https://localhost",
    "http://127.0.0.1",
    "https://127.0.0.1",
];

const LOCALHOST_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// True if `host` (a `Host` header value, optionally `host:port`) names
/// localhost with any or no port.
fn is_localhost_host(host: &str) -> bool {
    let name = host.rsplit_once(':').map(|(name, _)| name).unwrap_or(host);
    LOCALHOST_HOSTS.contains(&name)
}

/// Validate one request's `Origin` header against `config`.
pub fn validate_origin(
    config: &OriginGuardConfig,
    origin_header: Option<&str>,
    client_ip: IpAddr,
) -> Result<(), SecurityError> {
    if config.allow_any {
        return Ok(());
    }

    match origin_header {
        Some(origin) => {
            if config.allowed_origins.contains(origin) {
                return Ok(());
            }
            if config.allow_localhost && LOCALHOST_PREFIXES.iter().any(|p| origin.starts_with(p)) {
                return Ok(());
            }
            Err(SecurityError::OriginNotAllowed(origin.to_string()))
        }
        None => {
            if client_ip.is_loopback() {
                Ok(())
            } else {
                Err(SecurityError::MissingOriginRemote)
            }
        }
    }
}

/// Validate one request's `Host` header against `config`. Rebinding attacks
/// rewrite DNS, not the `Origin` header a conforming browser sends, so this
/// check is independent of `validate_origin` rather than a fallback for it.
pub fn validate_host(
    config: &OriginGuardConfig,
    host_header: Option<&str>,
    client_ip: IpAddr,
) -> Result<(), SecurityError> {
    if config.allow_any {
        return Ok(());
    }

    match host_header {
        Some(host) => {
            if config.allowed_hosts.contains(host) {
                return Ok(());
            }
            if config.allow_localhost && is_localhost_host(host) {
                return Ok(());
            }
            Err(SecurityError::HostNotAllowed(host.to_string()))
        }
        None => {
            if client_ip.is_loopback() {
                Ok(())
            } else {
                Err(SecurityError::MissingHostRemote)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_configured_origin() {
        let config = OriginGuardConfig::default().with_allowed_origin("https://trusted.example");
        let remote = "203.0.113.5".parse().unwrap();
        assert!(validate_origin(&config, Some("https://trusted.example"), remote).is_ok());
    }

    #[test]
    fn blocks_unrecognized_remote_origin() {
        let config = OriginGuardConfig::default();
        let remote = "203.0.113.5".parse().unwrap();
        assert_eq!(
            validate_origin(&config, Some("https://evil.example"), remote),
            Err(SecurityError::OriginNotAllowed("https://evil.example".to_string()))
        );
    }

    #[test]
    fn allows_missing_origin_from_loopback() {
        let config = OriginGuardConfig::default();
        let local = "127.0.0.1".parse().unwrap();
        assert!(validate_origin(&config, None, local).is_ok());
    }

    #[test]
    fn blocks_missing_origin_from_remote() {
        let config = OriginGuardConfig::default();
        let remote = "203.0.113.5".parse().unwrap();
        assert_eq!(
            validate_origin(&config, None, remote),
            Err(SecurityError::MissingOriginRemote)
        );
    }

    #[test]
    fn allow_any_bypasses_everything() {
        let config = OriginGuardConfig {
            allow_any: true,
            ..Default::default()
        };
        let remote = "203.0.113.5".parse().unwrap();
        assert!(validate_origin(&config, Some("https://evil.example"), remote).is_ok());
    }

    #[test]
    fn allows_localhost_host_with_any_port() {
        let config = OriginGuardConfig::default();
        let local = "127.0.0.1".parse().unwrap();
        assert!(validate_host(&config, Some("localhost:8080"), local).is_ok());
        assert!(validate_host(&config, Some("127.0.0.1:8080"), local).is_ok());
    }

    #[test]
    fn blocks_rebound_dns_name_in_host_header() {
        // A DNS-rebinding attack: the browser's Origin still names the
        // attacker's own page, but the Host header the rebound name
        // resolved to now points at loopback.
        let config = OriginGuardConfig::default();
        let local = "127.0.0.1".parse().unwrap();
        assert_eq!(
            validate_host(&config, Some("rebind.attacker.example:8080"), local),
            Err(SecurityError::HostNotAllowed("rebind.attacker.example:8080".to_string()))
        );
    }

    #[test]
    fn allows_configured_host() {
        let config = OriginGuardConfig::default().with_allowed_host("mcp.internal.example");
        let remote = "203.0.113.5".parse().unwrap();
        assert!(validate_host(&config, Some("mcp.internal.example"), remote).is_ok());
    }

    #[test]
    fn blocks_missing_host_from_remote() {
        let config = OriginGuardConfig::default();
        let remote = "203.0.113.5".parse().unwrap();
        assert_eq!(validate_host(&config, None, remote), Err(SecurityError::MissingHostRemote));
    }
}
