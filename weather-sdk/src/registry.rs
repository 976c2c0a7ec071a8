//! Process-wide set of API keys owned by live SDK instances.
//!
//! At most one instance may hold a given key at a time.

use std::collections::HashSet;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{Result, SdkError};

static ACTIVE_KEYS: LazyLock<Mutex<HashSet<String>>> = LazyLock::new(Default::default);

fn active_keys() -> MutexGuard<'static, HashSet<String>> {
    // The set stays consistent even if a holder panicked mid-call.
    ACTIVE_KEYS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Claim `api_key`, failing if a live instance already owns it.
pub fn register(api_key: &str) -> Result<()> {
    let mut keys = active_keys();
    if !keys.insert(api_key.to_owned()) {
        return Err(SdkError::DuplicateKey);
    }
    debug!(active = keys.len(), "API key registered");
    Ok(())
}

pub fn release(api_key: &str) {
    let mut keys = active_keys();
    if keys.remove(api_key) {
        debug!(active = keys.len(), "API key released");
    }
}

pub fn is_registered(api_key: &str) -> bool {
    active_keys().contains(api_key)
}

/// Forget every registered key. Intended for tests only.
pub fn clear() {
    active_keys().clear();
}
