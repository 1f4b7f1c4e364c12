//! Subnet grouping for Sybil and eclipse heuristics.

use std::net::{IpAddr, SocketAddr};

/// Subnet key of an address: `/24` for IPv4, `/48` for IPv6.
///
/// Accepts `ip:port` or a bare IP. Returns `None` for anything else.
pub fn subnet_of(address: &str) -> Option<String> {
    let ip = address
        .parse::<SocketAddr>()
        .map(|s| s.ip())
        .or_else(|_| address.parse::<IpAddr>())
        .ok()?;
    Some(match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.0/24", o[0], o[1], o[2])
        }
        IpAddr::V6(v6) => {
            let s = v6.segments();
            format!("{:x}:{:x}:{:x}::/48", s[0], s[1], s[2])
        }
    })
}
