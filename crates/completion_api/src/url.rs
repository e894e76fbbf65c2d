/// Default completion server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default completion server port.
pub const DEFAULT_PORT: u16 = 8080;
/// Path of the streaming completion endpoint.
pub const COMPLETION_PATH: &str = "/completion";

/// Build a base URL from a host and port.
///
/// Hosts without a scheme get `http://`; bare IPv6 literals are bracketed.
pub fn base_url_for(host: &str, port: u16) -> String {
    let host = host.trim();
    let host = if host.is_empty() { DEFAULT_HOST } else { host };

    let (scheme, host) = match host.split_once("://") {
        Some((scheme, rest)) => (scheme, rest.trim_end_matches('/')),
        None => ("http", host),
    };

    if host.contains(':') && !host.starts_with('[') {
        format!("{scheme}://[{host}]:{port}")
    } else {
        format!("{scheme}://{host}:{port}")
    }
}

/// Normalize a base URL to the completion endpoint.
///
/// Normalization rules:
/// 1) keep URLs already ending in `/completion`
/// 2) append `/completion` otherwise, after trimming trailing slashes
pub fn normalize_completion_url(input: &str) -> String {
    let default_base = base_url_for(DEFAULT_HOST, DEFAULT_PORT);
    let base = if input.trim().is_empty() {
        default_base.as_str()
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(COMPLETION_PATH) {
        return trimmed.to_string();
    }
    format!("{trimmed}{COMPLETION_PATH}")
}
