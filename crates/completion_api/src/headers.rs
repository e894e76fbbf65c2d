use std::collections::BTreeMap;

use crate::config::CompletionApiConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_ACCEPT_ENCODING: &str = "accept-encoding";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map for completion requests.
///
/// Extra headers cannot override the content type or the `identity` encoding:
/// the line parser needs an uncompressed body.
pub fn build_headers(config: &CompletionApiConfig) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());

    let ua = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );
    headers.insert(HEADER_ACCEPT_ENCODING.to_owned(), "identity".to_owned());

    headers
}

/// Product token of the default `User-Agent`.
pub const USER_AGENT_PRODUCT: &str = "localgpt";

fn default_user_agent() -> String {
    format!(
        "{}/{} ({}; {})",
        USER_AGENT_PRODUCT,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        normalize_arch(std::env::consts::ARCH)
    )
}

fn normalize_arch(arch: &str) -> String {
    match arch.to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" => "x64".to_owned(),
        "x86" | "i386" | "i686" => "ia32".to_owned(),
        "aarch64" => "arm64".to_owned(),
        normalized => normalized.to_owned(),
    }
}
