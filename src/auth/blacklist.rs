//!
//! # Token Blacklist
//!
//! Process-local set of tokens invalidated via logout. Entries are consulted
//! on every authenticated request and become moot once the token's own expiry
//! passes, so eviction of expired entries keeps the set bounded by the number
//! of live revoked tokens.

use std::collections::HashMap;
use std::sync::Mutex;

fn now_secs() -> usize {
    chrono::Utc::now().timestamp() as usize
}

/// Shared set of revoked token strings, keyed to each token's expiry.
///
/// The server runs on a multi-threaded runtime, so membership checks and
/// insertions go through a mutex.
#[derive(Default)]
pub struct TokenBlacklist {
    revoked: Mutex<HashMap<String, usize>>,
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token to the blacklist until `exp` (seconds since epoch).
    ///
    /// Idempotent: revoking the same token twice has no additional effect.
    /// Entries whose tokens have already expired are evicted on the way in.
    pub fn revoke(&self, token: &str, exp: usize) {
        let mut revoked = self.revoked.lock().expect("blacklist lock poisoned");
        let now = now_secs();
        revoked.retain(|_, entry_exp| *entry_exp > now);
        revoked.insert(token.to_string(), exp);
    }

    /// Whether a token has been revoked and its revocation is still relevant.
    pub fn contains(&self, token: &str) -> bool {
        let revoked = self.revoked.lock().expect("blacklist lock poisoned");
        match revoked.get(token) {
            Some(exp) => *exp > now_secs(),
            None => false,
        }
    }

    /// Number of live entries, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.revoked.lock().expect("blacklist lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
