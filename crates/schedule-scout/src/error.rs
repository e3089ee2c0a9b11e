//! Typed failures of a scrape run.
//!
//! Per-candidate problems (a malformed response body, a failed in-page
//! read) never show up here: they are contained where they happen.

/// Invalid or missing input, detected before any browser activity.
///
/// Messages deliberately omit the offending values; they can end up in
/// publicly visible CI logs.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("target URL is not set (pass --url or set TARGET_URL)")]
    MissingTargetUrl,

    #[error("target URL is not a valid http(s) URL")]
    InvalidTargetUrl,

    #[error("invalid path expression at offset {position}: {reason}")]
    InvalidPathExpression {
        position: usize,
        reason: &'static str,
    },
}

/// Terminal failure of one acquisition run.
#[derive(thiserror::Error, Debug)]
pub enum AcquisitionError {
    #[error("no schedule-shaped candidate from network or page")]
    NoCandidate,

    #[error("browser context could not be opened: {0}")]
    Browser(#[source] anyhow::Error),
}
