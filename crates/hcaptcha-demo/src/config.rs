//! Configuration management for the demo server.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use hcaptcha_common::constants::{DEFAULT_LISTEN_ADDR, DEFAULT_MAX_MEMORY};
use hcaptcha_gate::VerifierConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// hCaptcha account settings
    #[serde(default)]
    pub hcaptcha: CaptchaConfig,
}

/// hCaptcha-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Secret key from the hCaptcha dashboard
    #[serde(default)]
    pub secret_key: String,

    /// Site key rendered into the widget form and checked by siteverify
    #[serde(default)]
    pub site_key: String,

    /// Form body ceiling in bytes
    #[serde(default = "default_max_memory")]
    pub max_memory: usize,

    /// Siteverify request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            site_key: String::new(),
            max_memory: default_max_memory(),
            timeout_secs: default_timeout(),
        }
    }
}

impl CaptchaConfig {
    /// Verifier settings; an empty site key is left out of siteverify
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            site_key: Some(self.site_key.clone()).filter(|key| !key.is_empty()),
            max_memory: self.max_memory,
            timeout_secs: Some(self.timeout_secs),
            ..VerifierConfig::new(self.secret_key.clone())
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_max_memory() -> usize { DEFAULT_MAX_MEMORY }
fn default_timeout() -> u64 { 10 }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref secret) = args.secret_key {
            config.hcaptcha.secret_key = secret.clone();
        }
        if let Some(ref site_key) = args.site_key {
            config.hcaptcha.site_key = site_key.clone();
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            hcaptcha: CaptchaConfig::default(),
        }
    }
}
