//! Verifier configuration.

use serde::Deserialize;

use hcaptcha_common::constants::{DEFAULT_MAX_MEMORY, SITEVERIFY_URL};

/// Siteverify client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VerifierConfig {
    /// Account secret key
    pub secret: String,

    /// Site key the token is expected to belong to
    #[serde(default)]
    pub site_key: Option<String>,

    /// Caller IP forwarded to the remote service
    #[serde(default)]
    pub remote_ip: Option<String>,

    /// Ceiling for buffering a form body, in bytes
    #[serde(default = "default_max_memory")]
    pub max_memory: usize,

    /// Siteverify endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Whole-request timeout for the transport the verifier builds itself
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl VerifierConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            site_key: None,
            remote_ip: None,
            max_memory: default_max_memory(),
            endpoint: default_endpoint(),
            timeout_secs: None,
        }
    }
}

fn default_max_memory() -> usize { DEFAULT_MAX_MEMORY }
fn default_endpoint() -> String { SITEVERIFY_URL.to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let config: VerifierConfig = serde_json::from_str(r#"{"secret":"s3cr3t"}"#).unwrap();
        assert_eq!(config.secret, "s3cr3t");
        assert_eq!(config.max_memory, 32 * 1024 * 1024);
        assert_eq!(config.endpoint, "https://hcaptcha.com/siteverify");
        assert!(config.site_key.is_none());
        assert!(config.timeout_secs.is_none());
    }

    #[test]
    fn test_secret_is_required() {
        assert!(serde_json::from_str::<VerifierConfig>(r#"{"site_key":"k"}"#).is_err());
    }
}
