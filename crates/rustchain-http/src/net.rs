use std::net::{IpAddr, Ipv4Addr};

use axum::http::HeaderMap;

/// Configured set of trusted-proxy CIDR blocks. Only remotes inside this set
/// get their `X-Forwarded-For` header honored; any other remote's raw
/// address is used as-is, never a client-supplied header.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    blocks: Vec<(u32, u32)>,
}

impl TrustedProxies {
    /// Parse a comma-separated list of IPv4 CIDR blocks (`RC_TRUSTED_PROXIES`).
    /// Unparseable entries are skipped rather than rejected at boot.
    pub fn parse(spec: &str) -> Self {
        let blocks = spec
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(parse_cidr)
            .collect();
        Self { blocks }
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        let IpAddr::V4(v4) = ip else {
            return false;
        };
        let addr = u32::from(*v4);
        self.blocks.iter().any(|(net, mask)| addr & mask == *net)
    }
}

fn parse_cidr(s: &str) -> Option<(u32, u32)> {
    let (addr_str, bits_str) = s.split_once('/')?;
    let addr: Ipv4Addr = addr_str.parse().ok()?;
    let bits: u32 = bits_str.parse().ok()?;
    if bits > 32 {
        return None;
    }
    let mask = if bits == 0 { 0 } else { !0u32 << (32 - bits) };
    Some((u32::from(addr) & mask, mask))
}

/// The remote address to apply rate limiting and logging against: the raw
/// peer address, unless it is a configured trusted proxy and supplies
/// `X-Forwarded-For`, in which case the left-most entry is used. Never
/// trusts XFF from an untrusted peer.
pub fn resolve_remote_ip(trusted: &TrustedProxies, remote: IpAddr, headers: &HeaderMap) -> String {
    if trusted.contains(&remote) {
        if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            if let Some(candidate) = xff.split(',').next().map(str::trim) {
                if !candidate.is_empty() {
                    return candidate.to_string();
                }
            }
        }
    }
    remote.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrusted_remote_ignores_xff() {
        let trusted = TrustedProxies::parse("10.0.0.0/8");
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
        let remote: IpAddr = "203.0.113.9".parse().unwrap();
        assert_eq!(resolve_remote_ip(&trusted, remote, &headers), "203.0.113.9");
    }

    #[test]
    fn trusted_remote_honors_xff_leftmost() {
        let trusted = TrustedProxies::parse("10.0.0.0/8");
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4, 10.0.0.5".parse().unwrap());
        let remote: IpAddr = "10.0.0.5".parse().unwrap();
        assert_eq!(resolve_remote_ip(&trusted, remote, &headers), "1.2.3.4");
    }
}
