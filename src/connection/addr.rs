//! `host:port` address handling

use crate::{Error, Result};

/// Split a `host:port` address into its host and port
///
/// IPv6 hosts must be bracketed (`[::1]:6379`); the brackets are removed
/// from the returned host. The port must be a decimal `u16`.
pub fn split_host_port(addr: &str) -> Result<(String, u16)> {
    let malformed = |why: &str| Error::Config(format!("address {:?}: {}", addr, why));

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| malformed("missing ']' in address"))?;
        let host = &rest[..end];
        let after = &rest[end + 1..];
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| malformed("missing port in address"))?;
        (host, port)
    } else {
        let colon = addr
            .rfind(':')
            .ok_or_else(|| malformed("missing port in address"))?;
        let host = &addr[..colon];
        if host.contains(':') {
            return Err(malformed("too many colons in address"));
        }
        if host.contains('[') || host.contains(']') {
            return Err(malformed("unexpected bracket in address"));
        }
        (host, &addr[colon + 1..])
    };

    if port.is_empty() {
        return Err(malformed("missing port in address"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| malformed("invalid port"))?;

    Ok((host.to_string(), port))
}
