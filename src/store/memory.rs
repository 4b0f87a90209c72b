//! Thread-safe in-memory [`TokenStore`] implementation.

// self
use crate::{_prelude::*, auth::AccessToken, store::TokenStore};

/// Process-local token cache guarded by a read-write lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore(Arc<RwLock<Option<AccessToken>>>);
impl MemoryTokenStore {
	/// Creates a store seeded with `token`.
	pub fn with_token(token: impl Into<AccessToken>) -> Self {
		Self(Arc::new(RwLock::new(Some(token.into()))))
	}
}
impl TokenStore for MemoryTokenStore {
	fn get(&self) -> Option<AccessToken> {
		self.0.read().clone()
	}

	fn set(&self, token: AccessToken) {
		*self.0.write() = Some(token);
	}

	fn invalidate(&self, stale: &AccessToken) -> bool {
		let mut guard = self.0.write();

		if guard.as_ref() == Some(stale) {
			*guard = None;

			true
		} else {
			false
		}
	}
}
