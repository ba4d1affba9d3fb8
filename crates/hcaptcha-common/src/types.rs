//! Core types shared across hCaptcha components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HCaptchaError;

/// Siteverify verdict.
///
/// Decoded verbatim from the remote service. Local failures (empty token,
/// transport, decode) are folded into the same shape with `success = false`
/// and a human-readable message appended to `error_codes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Timestamp of the challenge load, opaque
    #[serde(default)]
    pub challenge_ts: String,

    /// Hostname of the site where the challenge was solved, opaque
    #[serde(default)]
    pub hostname: String,

    /// Remote error codes, plus local failure messages
    #[serde(rename = "error-codes", default, skip_serializing_if = "Vec::is_empty")]
    pub error_codes: Vec<String>,

    /// Whether the token was accepted
    pub success: bool,

    /// Passthrough flag, opaque
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub credit: bool,
}

impl Verdict {
    /// Failed verdict carrying a single error code
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error_codes: vec![message.into()],
            ..Default::default()
        }
    }

    /// Flatten a local error into the wire shape.
    ///
    /// Never yields `success = true`.
    pub fn from_error(err: &HCaptchaError) -> Self {
        Self::failure(err.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn has_errors(&self) -> bool {
        !self.error_codes.is_empty()
    }

    /// Best-effort parse of `challenge_ts` (RFC 3339)
    pub fn challenge_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.challenge_ts)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

impl From<HCaptchaError> for Verdict {
    fn from(err: HCaptchaError) -> Self {
        Self::from_error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success() {
        let v: Verdict =
            serde_json::from_str(r#"{"success":true,"challenge_ts":"T","hostname":"H"}"#).unwrap();
        assert!(v.success);
        assert_eq!(v.challenge_ts, "T");
        assert_eq!(v.hostname, "H");
        assert!(v.error_codes.is_empty());
        assert!(!v.credit);
    }

    #[test]
    fn test_decode_remote_failure() {
        let v: Verdict =
            serde_json::from_str(r#"{"success":false,"error-codes":["invalid-input-response"]}"#)
                .unwrap();
        assert!(!v.success);
        assert_eq!(v.error_codes, vec!["invalid-input-response".to_string()]);
        assert_eq!(v.hostname, "");
    }

    #[test]
    fn test_remote_codes_kept_alongside_success() {
        let v: Verdict = serde_json::from_str(
            r#"{"success":true,"hostname":"H","error-codes":["sitekey-secret-mismatch"],"credit":true}"#,
        )
        .unwrap();
        assert!(v.success);
        assert!(v.credit);
        assert_eq!(v.error_codes, vec!["sitekey-secret-mismatch".to_string()]);
    }

    #[test]
    fn test_status_helpers() {
        let passed = Verdict {
            success: true,
            ..Default::default()
        };
        assert!(passed.is_success());
        assert!(!passed.has_errors());

        let failed = Verdict::failure("tkn is empty");
        assert!(!failed.is_success());
        assert!(failed.has_errors());
    }

    #[test]
    fn test_success_is_required() {
        assert!(serde_json::from_str::<Verdict>(r#"{"hostname":"H"}"#).is_err());
    }

    #[test]
    fn test_from_error_never_succeeds() {
        let v = Verdict::from(HCaptchaError::Transport("connection refused".into()));
        assert!(!v.success);
        assert_eq!(v.error_codes.len(), 1);
        assert!(v.error_codes[0].contains("connection refused"));
    }

    #[test]
    fn test_serialize_omits_empty_optionals() {
        let json = serde_json::to_value(Verdict {
            success: true,
            hostname: "H".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(json.get("error-codes").is_none());
        assert!(json.get("credit").is_none());
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_challenge_time() {
        let v = Verdict {
            challenge_ts: "2024-03-01T12:30:00.000Z".into(),
            ..Default::default()
        };
        let ts = v.challenge_time().unwrap();
        assert_eq!(ts.timestamp(), 1_709_296_200);
        assert!(Verdict::default().challenge_time().is_none());
    }
}
