//! Base URL auto-detection
//!
//! When the harness runs inside a container, `localhost` is usually not the
//! server. The local hostname is resolved and, if it maps to a non-loopback
//! IPv4 address, that address replaces `localhost`. Every failure along the
//! way keeps the default.

use super::config::DEFAULT_BASE_URL;
use std::net::IpAddr;

pub const DEFAULT_PORT: u16 = 3000;

/// Pick the base URL for an optionally resolved local address
pub fn choose_base_url(resolved: Option<IpAddr>, port: u16) -> String {
    match resolved {
        Some(ip) if !ip.is_loopback() && !ip.is_unspecified() => match ip {
            IpAddr::V4(v4) => format!("http://{}:{}", v4, port),
            IpAddr::V6(v6) => format!("http://[{}]:{}", v6, port),
        },
        _ => DEFAULT_BASE_URL.to_string(),
    }
}

/// Detect the base URL for the current host
pub async fn detect_base_url() -> String {
    let resolved = match local_hostname() {
        Some(hostname) => resolve_ipv4(&hostname).await,
        None => {
            log::debug!("Could not read local hostname");
            None
        }
    };

    let base_url = choose_base_url(resolved, DEFAULT_PORT);
    if base_url != DEFAULT_BASE_URL {
        log::info!("Running in container, using {}", base_url);
    }
    base_url
}

async fn resolve_ipv4(hostname: &str) -> Option<IpAddr> {
    match tokio::net::lookup_host((hostname, 0)).await {
        Ok(addrs) => addrs.map(|a| a.ip()).find(|ip| ip.is_ipv4()),
        Err(e) => {
            log::debug!("Failed to resolve hostname {}: {}", hostname, e);
            None
        }
    }
}

#[cfg(unix)]
fn local_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for buf.len() bytes and gethostname writes at most that many.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let hostname = String::from_utf8_lossy(&buf[..end]).trim().to_string();
    if hostname.is_empty() {
        None
    } else {
        Some(hostname)
    }
}

#[cfg(not(unix))]
fn local_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok().filter(|h| !h.is_empty())
}
