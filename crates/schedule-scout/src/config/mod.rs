//! Configuration loading and resolution.
//!
//! Every value resolves as: explicit CLI value, then environment variable,
//! then default. Validation happens here, before any browser is launched.

use crate::acquisition::path::PathExpr;
use crate::error::ConfigError;
use std::path::PathBuf;
use url::Url;

pub const TARGET_URL_ENV: &str = "TARGET_URL";
pub const PATH_EXPR_ENV: &str = "DATA_VARIABLE_NAME";
pub const OUTPUT_DIR_ENV: &str = "SCRAPE_OUTPUT_DIR";

/// Output directory when nothing else is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "scraped-data";

/// Validated inputs of one scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub target_url: Url,
    /// Global path to read the schedule from directly, if known.
    pub path: Option<PathExpr>,
    pub output_dir: PathBuf,
}

impl ScrapeConfig {
    /// Resolve from explicit values with environment fallbacks.
    pub fn resolve(
        target_url: Option<&str>,
        path: Option<&str>,
        output_dir: Option<&str>,
    ) -> Result<Self, ConfigError> {
        Self::from_parts(
            explicit_or_env(target_url, TARGET_URL_ENV),
            explicit_or_env(path, PATH_EXPR_ENV),
            explicit_or_env(output_dir, OUTPUT_DIR_ENV),
        )
    }

    /// Validate already-resolved values. Empty strings count as absent.
    pub fn from_parts(
        target_url: Option<String>,
        path: Option<String>,
        output_dir: Option<String>,
    ) -> Result<Self, ConfigError> {
        let raw_url = non_empty(target_url).ok_or(ConfigError::MissingTargetUrl)?;
        let target_url = Url::parse(raw_url.trim()).map_err(|_| ConfigError::InvalidTargetUrl)?;
        if !matches!(target_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidTargetUrl);
        }

        let path = non_empty(path).map(|p| PathExpr::parse(&p)).transpose()?;

        let output_dir = non_empty(output_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok(Self {
            target_url,
            path,
            output_dir,
        })
    }
}

fn explicit_or_env(explicit: Option<&str>, var: &str) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(var).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let cfg = ScrapeConfig::from_parts(Some("https://example.org/grafik".into()), None, None)
            .unwrap();
        assert_eq!(cfg.target_url.as_str(), "https://example.org/grafik");
        assert!(cfg.path.is_none());
        assert_eq!(cfg.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_missing_or_blank_url_is_fatal() {
        assert_eq!(
            ScrapeConfig::from_parts(None, None, None).unwrap_err(),
            ConfigError::MissingTargetUrl
        );
        assert_eq!(
            ScrapeConfig::from_parts(Some("  ".into()), None, None).unwrap_err(),
            ConfigError::MissingTargetUrl
        );
    }

    #[test]
    fn test_invalid_url() {
        for bad in ["not a url", "ftp://example.org/", "javascript:alert(1)"] {
            assert_eq!(
                ScrapeConfig::from_parts(Some(bad.into()), None, None).unwrap_err(),
                ConfigError::InvalidTargetUrl
            );
        }
    }

    #[test]
    fn test_invalid_path_expression_is_fatal() {
        let err = ScrapeConfig::from_parts(
            Some("https://example.org/".into()),
            Some("fetch('/x')".into()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPathExpression { .. }));
        assert!(!err.to_string().contains("fetch"));
    }

    #[test]
    fn test_empty_path_means_none() {
        let cfg = ScrapeConfig::from_parts(
            Some("https://example.org/".into()),
            Some(String::new()),
            Some("out".into()),
        )
        .unwrap();
        assert!(cfg.path.is_none());
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_explicit_value_wins() {
        let cfg = ScrapeConfig::resolve(
            Some("https://explicit.example/"),
            Some("DisconSchedule"),
            Some("explicit-dir"),
        )
        .unwrap();
        assert_eq!(cfg.target_url.host_str(), Some("explicit.example"));
        assert_eq!(cfg.path.unwrap().root(), "DisconSchedule");
        assert_eq!(cfg.output_dir, PathBuf::from("explicit-dir"));
    }
}
