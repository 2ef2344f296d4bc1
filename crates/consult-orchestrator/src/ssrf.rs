//! URL safety checks for outbound research fetches (§4.6, §7 hardening note).
//! Ported from the original website parser's scheme/host validation.

use std::net::IpAddr;

use tokio::net::lookup_host;

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Rejects anything that isn't a plain http(s) URL resolving to a public,
/// non-loopback, non-link-local address. Re-run on every redirect hop.
pub async fn is_safe_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return false;
    }

    let Some(host) = parsed.host_str() else {
        return false;
    };

    if host.eq_ignore_ascii_case("localhost") {
        return false;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_public_ip(ip);
    }

    let port = parsed.port_or_known_default().unwrap_or(443);
    let lookup_target = format!("{host}:{port}");
    match lookup_host(&lookup_target).await {
        Ok(addrs) => {
            let addrs: Vec<_> = addrs.collect();
            !addrs.is_empty() && addrs.iter().all(|a| is_public_ip(a.ip()))
        }
        Err(_) => false,
    }
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
                || v4.octets()[0] == 0)
        }
        IpAddr::V6(v6) => {
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_unique_local()
                || v6.is_unicast_link_local())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_scheme() {
        assert!(!is_safe_url("file:///etc/passwd").await);
        assert!(!is_safe_url("ftp://example.com").await);
    }

    #[tokio::test]
    async fn rejects_loopback_and_private_literals() {
        assert!(!is_safe_url("http://127.0.0.1/admin").await);
        assert!(!is_safe_url("http://10.0.0.5/").await);
        assert!(!is_safe_url("http://169.254.169.254/latest/meta-data").await);
        assert!(!is_safe_url("http://localhost:8080/").await);
    }

    #[tokio::test]
    async fn accepts_public_ip_literal() {
        assert!(is_safe_url("http://93.184.216.34/").await);
    }
}
