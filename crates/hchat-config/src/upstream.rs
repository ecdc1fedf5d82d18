use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Default gateway base URL
pub const DEFAULT_API_BASE: &str = "https://h-chat-api.autoever.com/v2/api";

/// Credentials and base URL shared by every vendor transport
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Gateway API key, forwarded in the vendor-specific auth header
    pub api_key: SecretString,
    /// Gateway base URL
    #[serde(default = "default_api_base")]
    pub api_base: Url,
}

impl UpstreamConfig {
    /// Base URL rendered with exactly one trailing slash
    ///
    /// Vendor paths are appended to this without a leading slash.
    pub fn normalized_base(&self) -> String {
        normalize_api_base(self.api_base.as_str())
    }
}

/// Ensure a base URL ends with `/`
pub fn normalize_api_base(base: &str) -> String {
    if base.ends_with('/') {
        base.to_owned()
    } else {
        format!("{base}/")
    }
}

pub(crate) fn default_api_base() -> Url {
    Url::parse(DEFAULT_API_BASE).expect("default API base must be a valid URL")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_missing_slash() {
        assert_eq!(normalize_api_base("http://host/v2/api"), "http://host/v2/api/");
    }

    #[test]
    fn keeps_existing_slash() {
        assert_eq!(normalize_api_base("http://host/v2/api/"), "http://host/v2/api/");
    }
}
