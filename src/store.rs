//! Token cache contract and the built-in in-memory implementation.

pub mod memory;

pub use memory::MemoryTokenStore;

// self
use crate::auth::AccessToken;

/// Holder of the single access token a dispatcher works with.
///
/// Implementations must make every method atomic with respect to the others so concurrent
/// callers never observe a half-applied update.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the cached token, if any.
	fn get(&self) -> Option<AccessToken>;

	/// Installs `token`, replacing whatever was cached.
	fn set(&self, token: AccessToken);

	/// Clears the cache only when it still holds `stale`; returns whether it did.
	fn invalidate(&self, stale: &AccessToken) -> bool;
}
