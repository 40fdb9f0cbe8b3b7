use crate::error::{PlungerError, Result};
use reqwest::Url;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Collapse duplicates by exact string equality, keeping first-seen order.
pub fn dedupe<I>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Parse a link and refuse anything that is not plain http(s).
pub fn parse_link(link: &str) -> Result<Url> {
    let invalid = |reason: String| PlungerError::InvalidLink {
        link: link.to_string(),
        reason,
    };

    let url = Url::parse(link).map_err(|e| invalid(format!("not an absolute URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url)
}

/// Refuse hosts that name this machine or a non-public network.
///
/// Only literal addresses and `localhost` are caught here; resolved
/// addresses go through [`is_public_ip`] at request time.
pub fn check_host(link: &str, url: &Url) -> Result<()> {
    let invalid = |reason: &str| PlungerError::InvalidLink {
        link: link.to_string(),
        reason: reason.to_string(),
    };

    let host = url.host_str().unwrap_or_default();
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let lowered = host.trim_end_matches('.').to_ascii_lowercase();
    if lowered == "localhost" || lowered.ends_with(".localhost") {
        return Err(invalid("target is the local host"));
    }

    match host.parse::<IpAddr>() {
        Ok(ip) if !is_public_ip(&ip) => Err(invalid("target is a private or reserved address")),
        _ => Ok(()),
    }
}

pub fn is_public_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        // Mapped, compatible and NAT64 forms are judged by the embedded IPv4 address
        IpAddr::V6(v6) => match v6.to_ipv4().or_else(|| nat64_embedded(v6)) {
            Some(v4) => is_public_v4(&v4),
            None => is_public_v6(v6),
        },
    }
}

// 64:ff9b::/96
fn nat64_embedded(ip: &Ipv6Addr) -> Option<Ipv4Addr> {
    let segments = ip.segments();
    if segments[..6] != [0x64, 0xff9b, 0, 0, 0, 0] {
        return None;
    }
    let [a, b] = segments[6].to_be_bytes();
    let [c, d] = segments[7].to_be_bytes();
    Some(Ipv4Addr::new(a, b, c, d))
}

fn is_public_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        // 100.64.0.0/10 shared address space
        || (a == 100 && (b & 0xc0) == 64)
        // 0.0.0.0/8 and 240.0.0.0/4
        || a == 0
        || a >= 240)
}

fn is_public_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    !(ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
        // 2001:db8::/32 documentation
        || (first == 0x2001 && ip.segments()[1] == 0x0db8))
}
