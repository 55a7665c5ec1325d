//! Refuses to load pages from loopback, private, or link-local hosts.
//!
//! Search results are untrusted input; a result pointing at an internal
//! address must not turn the agent into a proxy for the local network.

use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use tracing::warn;
use url::{Host, Url};

use super::FetchError;

const DNS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub trait DnsResolver {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, FetchError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDnsResolver;

impl DnsResolver for TokioDnsResolver {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, FetchError> {
        let addrs = tokio::time::timeout(
            DNS_LOOKUP_TIMEOUT,
            tokio::net::lookup_host(format!("{host}:{port}")),
        )
        .await
        .map_err(|_| FetchError::DnsResolution("lookup timed out".to_string()))?
        .map_err(|e| FetchError::DnsResolution(e.to_string()))?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

/// Drops `user:password@` from a URL before it is logged.
pub fn redact_url_credentials(raw: &str) -> Cow<'_, str> {
    if !raw.contains('@') {
        return Cow::Borrowed(raw);
    }
    match Url::parse(raw) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            Cow::Owned(parsed.to_string())
        }
        _ => Cow::Borrowed(raw),
    }
}

/// Validates scheme and host, then checks every resolved address.
pub async fn guard_url(raw: &str, resolver: &impl DnsResolver) -> Result<Url, FetchError> {
    let parsed = check_static(raw)?;

    if let Some(Host::Domain(domain)) = parsed.host() {
        let port = parsed.port_or_known_default().unwrap_or(80);
        for ip in resolver.lookup(domain, port).await? {
            if is_private_ip(ip) {
                warn!(host = %domain, %ip, "host resolves to a private address");
                return Err(FetchError::InternalHost);
            }
        }
    }

    Ok(parsed)
}

fn check_static(raw: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(raw)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidScheme);
    }

    let blocked = match parsed.host() {
        Some(Host::Ipv4(v4)) => is_private_ip(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_ip(IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => is_internal_name(domain),
        None => true,
    };
    if blocked {
        warn!(url = %redact_url_credentials(raw), "refusing internal host");
        return Err(FetchError::InternalHost);
    }

    Ok(parsed)
}

fn is_internal_name(domain: &str) -> bool {
    let lower = domain.to_ascii_lowercase();
    lower == "localhost"
        || [".localhost", ".local", ".internal", ".arpa"]
            .iter()
            .any(|suffix| lower.ends_with(suffix))
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || is_v6_link_local(v6)
                || is_v6_unique_local(v6)
                || v6.to_ipv4_mapped().is_some_and(is_private_v4)
        }
    }
}

fn is_private_v4(v4: Ipv4Addr) -> bool {
    let [a, b, ..] = v4.octets();
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.is_broadcast()
        || a == 0
        // carrier-grade NAT, 100.64.0.0/10
        || (a == 100 && (64..=127).contains(&b))
}

fn is_v6_link_local(v6: Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xffc0) == 0xfe80
}

fn is_v6_unique_local(v6: Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xfe00) == 0xfc00
}
