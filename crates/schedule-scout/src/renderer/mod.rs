//! Renderer abstraction for browser-based page loading.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). A context is
//! also a [`PageEnvironment`], so the in-page extractor can read from it.

pub mod chromium;
pub mod responses;

use crate::acquisition::collector::NetworkExchange;
use crate::acquisition::extractor::PageEnvironment;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// Lists the text of every inline (`src`-less) script, in document order.
pub const INLINE_SCRIPTS_JS: &str =
    "Array.from(document.querySelectorAll('script:not([src])')).map(s => s.textContent || '')";

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: PageEnvironment {
    /// Start delivering every completed network response of this context.
    ///
    /// Must be called before [`navigate`](Self::navigate) so nothing from
    /// the initial load is missed. The stream ends when the context closes.
    async fn subscribe_responses(&mut self) -> Result<mpsc::Receiver<NetworkExchange>>;
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<Value>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Decode the result of a path accessor (see `PathExpr::to_page_accessor`).
///
/// The accessor hands back JSON text; parsing it here is the copy that
/// detaches the value from the page.
pub fn decode_accessor_result(raw: Value) -> Option<Value> {
    match raw {
        Value::String(text) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

/// Collect script texts from the result of [`INLINE_SCRIPTS_JS`].
pub fn decode_script_texts(raw: Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                _ => String::new(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_accessor_result() {
        assert_eq!(
            decode_accessor_result(json!(r#"{"a":[1,2]}"#)),
            Some(json!({"a": [1, 2]}))
        );
        assert_eq!(decode_accessor_result(Value::Null), None);
        assert_eq!(decode_accessor_result(json!("{broken")), None);
    }

    #[test]
    fn test_decode_script_texts() {
        assert_eq!(
            decode_script_texts(json!(["a", null, "b"])),
            vec!["a".to_string(), String::new(), "b".to_string()]
        );
        assert!(decode_script_texts(json!({})).is_empty());
    }
}
