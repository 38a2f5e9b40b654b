/// Error taxonomy for the photo editor
///
/// Low-level failures (`CaptureError`, `SurfaceError`, `ConfigError`) are plain
/// `thiserror` enums. They never reach the UI directly: the session converts
/// them into a single user-facing `PhotoEditorError`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// How long a non-recoverable error stays visible before auto-dismissal
pub const AUTO_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// Failure inside the Capture Engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// The encoder could not produce a binary payload
    #[error("encoding failed for {mime}: {reason}")]
    EncodingFailure { mime: String, reason: String },
}

impl CaptureError {
    pub fn encoding(mime: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EncodingFailure {
            mime: mime.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a render surface
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    /// The renderer itself failed to initialize
    #[error("render surface failed to initialize: {0}")]
    Initialization(String),

    /// The source image could not be decoded
    #[error("source image could not be decoded: {0}")]
    ImageDecode(String),

    /// An adjustment could not be applied
    #[error("adjustment failed: {0}")]
    Adjustment(String),
}

/// Invalid editor configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("quality must be between 1 and 100, got {0}")]
    QualityOutOfRange(u32),

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of one step of the save pipeline
#[derive(Error, Debug)]
pub(crate) enum SaveError {
    #[error("{0}")]
    NotReady(&'static str),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("background encoding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// ========== User-facing errors ==========

/// Kind of a user-facing editor error
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Rendering surface failed to initialize
    SdkLoad,
    /// Source image failed to decode
    ImageLoad,
    /// Capture/synthesis failed or save preconditions were unmet
    SaveFailure,
    /// Catch-all, used for reset failures
    Unknown,
}

impl ErrorKind {
    /// Retry dispatch table: which action re-attempts a failure of this kind
    pub fn retry_action(self) -> RetryAction {
        match self {
            ErrorKind::SdkLoad => RetryAction::RemountSurface,
            ErrorKind::ImageLoad => RetryAction::Reopen,
            ErrorKind::SaveFailure => RetryAction::Save,
            ErrorKind::Unknown => RetryAction::ConfirmReset,
        }
    }
}

/// Action the session runs when the user retries an error
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RetryAction {
    /// Re-invoke save
    Save,
    /// Re-run the confirmed reset
    ConfirmReset,
    /// Mount the render surface again
    RemountSurface,
    /// Close the editor so it can be reopened with another source
    Reopen,
}

/// The error currently shown to the user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoEditorError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl PhotoEditorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: true,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn non_recoverable(mut self) -> Self {
        self.recoverable = false;
        self
    }

    pub fn save_failure(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(ErrorKind::SaveFailure, message).with_details(details)
    }

    pub fn reset_failure(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, "Failed to reset the editor. Please try again.")
            .with_details(details)
    }

    pub fn sdk_load(details: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::SdkLoad,
            "Failed to load the photo editor. The render surface could not be initialized.",
        )
        .with_details(details)
    }

    pub fn image_load(image_url: &str) -> Self {
        Self::new(
            ErrorKind::ImageLoad,
            "Failed to load the image in the editor. The image may be corrupted or in an unsupported format.",
        )
        .with_details(format!("Image URL: {}", image_url))
    }

    /// The retry action for this error, if it can be retried at all
    pub fn retry_action(&self) -> Option<RetryAction> {
        self.recoverable.then(|| self.kind.retry_action())
    }

    /// Recoverable errors stay until dismissed or retried
    pub fn auto_dismiss_after(&self) -> Option<Duration> {
        (!self.recoverable).then_some(AUTO_DISMISS_AFTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_table() {
        assert_eq!(ErrorKind::SaveFailure.retry_action(), RetryAction::Save);
        assert_eq!(ErrorKind::Unknown.retry_action(), RetryAction::ConfirmReset);
        assert_eq!(ErrorKind::SdkLoad.retry_action(), RetryAction::RemountSurface);
        assert_eq!(ErrorKind::ImageLoad.retry_action(), RetryAction::Reopen);
    }

    #[test]
    fn test_non_recoverable_has_no_retry_and_auto_dismisses() {
        let err = PhotoEditorError::save_failure("x", "y").non_recoverable();
        assert_eq!(err.retry_action(), None);
        assert_eq!(err.auto_dismiss_after(), Some(AUTO_DISMISS_AFTER));

        let err = PhotoEditorError::save_failure("x", "y");
        assert_eq!(err.retry_action(), Some(RetryAction::Save));
        assert_eq!(err.auto_dismiss_after(), None);
    }

    #[test]
    fn test_error_serializes_kind_as_type() {
        let err = PhotoEditorError::reset_failure("boom");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "unknown");
        assert_eq!(json["details"], "boom");
        assert_eq!(json["recoverable"], true);
    }

    #[test]
    fn test_capture_error_display() {
        let err = CaptureError::encoding("image/gif", "unsupported output format");
        assert!(err.to_string().contains("image/gif"));
        assert!(err.to_string().contains("unsupported"));
    }
}
