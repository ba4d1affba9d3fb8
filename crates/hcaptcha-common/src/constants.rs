//! Shared constants for hCaptcha components.

/// Remote siteverify endpoint
pub const SITEVERIFY_URL: &str = "https://hcaptcha.com/siteverify";

/// Form field the client-side widget posts its token under
pub const RESPONSE_FIELD: &str = "h-captcha-response";

/// Default ceiling for buffering a form body (32 MiB)
pub const DEFAULT_MAX_MEMORY: usize = 32 << 20;

/// Default demo server listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Client-side widget script
pub const WIDGET_SCRIPT_URL: &str = "https://hcaptcha.com/1/api.js";

/// Siteverify form parameters
pub mod params {
    /// Account secret key
    pub const SECRET: &str = "secret";

    /// Token produced by the widget
    pub const RESPONSE: &str = "response";

    /// Caller IP address (optional)
    pub const REMOTE_IP: &str = "remoteip";

    /// Expected site key (optional)
    pub const SITE_KEY: &str = "sitekey";
}
