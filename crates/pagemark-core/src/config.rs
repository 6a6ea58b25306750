//! Session configuration and the context handed to every component.

use crate::clock::PeerId;
use crate::error::{EditError, EditResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of undo frames kept by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Retry budget for draws against a surface that is not ready yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts before a deferred draw is dropped.
    pub max_attempts: u32,
    /// Delay before the first retry, doubled on every attempt.
    pub base_delay_ms: u64,
    /// Upper bound on a single delay.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 16,
            max_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before the given (zero-based) retry attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(exp.min(self.max_delay_ms))
    }
}

/// Tunables for an editing session.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Undo frames kept before the oldest is dropped (0 = unbounded).
    pub history_limit: usize,
    /// Pen stroke width in device pixels at the zoom the stroke was drawn.
    pub pen_width: f64,
    /// Highlighter stroke width in device pixels.
    pub highlighter_width: f64,
    /// Highlighter alpha (0.0 - 1.0).
    pub highlighter_opacity: f64,
    /// Hit-test tolerance in device pixels.
    pub hit_tolerance: f64,
    /// Default font size for new text and note elements, in page units.
    pub default_font_size: f64,
    /// Retry budget for draws against surfaces that are not ready.
    pub surface_retry: RetryPolicy,
    /// Auto-save interval in seconds.
    pub autosave_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            pen_width: 2.0,
            highlighter_width: 12.0,
            highlighter_opacity: 0.4,
            hit_tolerance: 4.0,
            default_font_size: 14.0,
            surface_retry: RetryPolicy::default(),
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
        }
    }
}

impl SessionConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> EditResult<Self> {
        serde_json::from_str(json).map_err(|e| EditError::Snapshot(format!("invalid config: {e}")))
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

/// Shared context created when an editing session opens.
///
/// Components receive a clone at construction instead of reaching for
/// global state; it lives exactly as long as the session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    config: Arc<SessionConfig>,
    local_peer: PeerId,
    page_count: usize,
}

impl SessionContext {
    pub fn new(config: SessionConfig, local_peer: PeerId, page_count: usize) -> Self {
        Self {
            config: Arc::new(config),
            local_peer,
            page_count,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn local_peer(&self) -> &PeerId {
        &self.local_peer
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Reject page indices outside the loaded document.
    pub fn check_page(&self, index: usize) -> EditResult<()> {
        if index < self.page_count {
            Ok(())
        } else {
            Err(EditError::InvalidPageIndex {
                index,
                page_count: self.page_count,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = SessionConfig::from_json(r#"{ "history_limit": 5 }"#).unwrap();
        assert_eq!(config.history_limit, 5);
        assert!((config.pen_width - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.surface_retry, RetryPolicy::default());
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 10,
            max_delay_ms: 100,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2), Duration::from_millis(40));
        assert_eq!(policy.delay_for(8), Duration::from_millis(100));
    }

    #[test]
    fn test_check_page() {
        let ctx = SessionContext::new(SessionConfig::default(), PeerId::from("me"), 3);
        assert!(ctx.check_page(2).is_ok());
        assert_eq!(
            ctx.check_page(3),
            Err(EditError::InvalidPageIndex {
                index: 3,
                page_count: 3
            })
        );
    }
}
