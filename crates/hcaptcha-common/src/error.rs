//! Local error types for hCaptcha verification.
//!
//! None of these reach a caller directly: the verifier flattens them into a
//! failed [`Verdict`](crate::Verdict) whose error codes carry the message.

use thiserror::Error;

/// Failures detected on this side of the siteverify call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HCaptchaError {
    /// `verify_token` called with an empty token
    #[error("tkn is empty")]
    EmptyToken,

    /// The request carried no (or an empty) `h-captcha-response` field
    #[error("form[h-captcha-response] is empty")]
    EmptyFormField,

    /// Request body could not be read or parsed as a form
    #[error("form error: {0}")]
    Form(String),

    /// Connection, DNS, TLS, or timeout failure on the outbound call
    #[error("siteverify request failed: {0}")]
    Transport(String),

    /// Response body could not be read
    #[error("siteverify response read failed: {0}")]
    Read(String),

    /// Response body was not a siteverify JSON document
    #[error("siteverify response decode failed: {0}")]
    Decode(String),

    /// Verifier misconfigured at construction
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`HCaptchaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed token, caught before any network call
    Input,
    /// Outbound call never produced a response
    Transport,
    /// Response arrived but was unusable
    Decode,
    /// Construction-time problem
    Config,
}

impl HCaptchaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyToken | Self::EmptyFormField | Self::Form(_) => ErrorKind::Input,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Read(_) | Self::Decode(_) => ErrorKind::Decode,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns true if the remote service was never contacted
    pub fn is_pre_flight(&self) -> bool {
        matches!(self.kind(), ErrorKind::Input | ErrorKind::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_wire_codes() {
        assert_eq!(HCaptchaError::EmptyToken.to_string(), "tkn is empty");
        assert_eq!(
            HCaptchaError::EmptyFormField.to_string(),
            "form[h-captcha-response] is empty"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(HCaptchaError::Form("x".into()).kind(), ErrorKind::Input);
        assert_eq!(HCaptchaError::Transport("x".into()).kind(), ErrorKind::Transport);
        assert_eq!(HCaptchaError::Read("x".into()).kind(), ErrorKind::Decode);
        assert!(HCaptchaError::EmptyToken.is_pre_flight());
        assert!(!HCaptchaError::Decode("x".into()).is_pre_flight());
    }
}
