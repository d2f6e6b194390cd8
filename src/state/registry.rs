use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde::Serialize;

/// A stored retry re-runs the whole fallback chain for its key, cache check
/// included.
pub type RetryFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Clone)]
pub struct ErrorState {
    pub message: String,
    pub code: Option<String>,
    pub retry: RetryFn,
}

/// The closure-free face of an `ErrorState`, embedded in consumer views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub message: String,
    pub code: Option<String>,
}

// ---------------------------------------------------------------------------
// ErrorRegistry
// ---------------------------------------------------------------------------

/// At most one live `ErrorState` per key. A new fetch attempt clears the
/// key's entry up front; only true exhaustion (every tier failed) writes
/// one back.
pub struct ErrorRegistry {
    errors: DashMap<String, ErrorState>,
}

impl ErrorRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            errors: DashMap::new(),
        })
    }

    pub fn record(&self, key: &str, message: String, code: Option<String>, retry: RetryFn) {
        self.errors.insert(
            key.to_string(),
            ErrorState {
                message,
                code,
                retry,
            },
        );
    }

    pub fn clear(&self, key: &str) {
        self.errors.remove(key);
    }

    pub fn get(&self, key: &str) -> Option<ErrorView> {
        self.errors.get(key).map(|e| ErrorView {
            message: e.message.clone(),
            code: e.code.clone(),
        })
    }

    /// Run the stored retry for `key`. Returns false when no error is
    /// registered there. The closure is cloned out before awaiting so no
    /// map guard is held across the retry itself.
    pub async fn retry(&self, key: &str) -> bool {
        let retry = match self.errors.get(key) {
            Some(entry) => Arc::clone(&entry.retry),
            None => return false,
        };
        retry().await;
        true
    }

    pub fn remove_prefix(&self, prefix: &str) {
        self.errors.retain(|k, _| !k.starts_with(prefix));
    }

    pub fn clear_all(&self) {
        self.errors.clear();
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
