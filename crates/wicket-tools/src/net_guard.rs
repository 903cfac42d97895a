//! Network egress filter for the http tool.
//!
//! Only literal IP hosts are range-checked; hostnames are not re-resolved
//! after the check, so DNS rebinding is only partially mitigated (the http
//! tool additionally refuses to follow redirects). Known limitation.

use crate::error::ToolError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Parse and validate a URL for outbound use.
///
/// Allows only `http`/`https` schemes and denies localhost, loopback,
/// private, and link-local literal hosts before any network activity.
pub fn validate_url(raw: &str) -> Result<reqwest::Url, ToolError> {
    let url = reqwest::Url::parse(raw)
        .map_err(|_| denied("Invalid URL format".to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(denied(format!(
                "Protocol '{other}:' is not allowed. Only http: and https: are supported"
            )));
        }
    }

    let host = url
        .host_str()
        .ok_or_else(|| denied("URL has no host".to_string()))?
        .to_lowercase();

    if host == "localhost" || host == "[::1]" {
        return Err(denied("Access to localhost is blocked".to_string()));
    }

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(denied(format!(
                "Access to private IP address '{bare}' is blocked"
            )));
        }
    }

    Ok(url)
}

fn denied(reason: String) -> ToolError {
    ToolError::UrlDenied(format!("URL validation failed: {reason}"))
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_loopback()                       // 127.0.0.0/8
        || ip.is_private()                 // 10/8, 172.16/12, 192.168/16
        || ip.is_link_local()              // 169.254.0.0/16
        || octets[0] == 0                  // 0.0.0.0/8
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_v4(mapped);
    }
    let segments = ip.segments();
    ip.is_loopback()                            // ::1
        || ip.is_unspecified()                  // ::
        || (segments[0] & 0xffc0) == 0xfe80     // fe80::/10 link-local
        || (segments[0] & 0xfe00) == 0xfc00     // fc00::/7 unique-local
}
