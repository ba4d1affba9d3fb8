//! Application state and shared resources.

use anyhow::{Context, Result};

use crate::config::AppConfig;
use hcaptcha_gate::Verifier;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// hCaptcha verifier (shares one outbound client)
    pub verifier: Verifier,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let verifier = Verifier::from_config(config.hcaptcha.verifier_config())
            .context("Invalid hCaptcha configuration (set HCAPTCHA_SECRET_KEY or hcaptcha.secret_key)")?;

        if verifier.site_key().is_none() {
            tracing::warn!("No site key configured, the widget form will not render a challenge");
        }

        Ok(Self { config, verifier })
    }

    /// Site key rendered into the widget form
    pub fn site_key(&self) -> &str {
        self.verifier.site_key().unwrap_or_default()
    }
}
