//! Payload signing contracts used by the token exchange.
//!
//! The dispatcher never touches key material directly. It serializes the exchange payload,
//! hands the bytes to a [`PayloadSigner`], and forwards the returned string in the
//! `signature` header. The embedding environment picks the backend: [`RsaSha256Signer`] is the
//! software implementation, while platform crypto APIs can be plugged in by implementing the
//! trait (the returned future may complete immediately or after an async round-trip).

pub mod rsa;

pub use self::rsa::{RsaSha256Signer, SignatureEncoding};

// self
use crate::{_prelude::*, auth::Credential, error::SigningError};

/// Boxed future returned by [`PayloadSigner::sign`].
pub type SignFuture<'a> = Pin<Box<dyn Future<Output = Result<String, SigningError>> + 'a + Send>>;

/// Builds the signer for a freshly loaded credential.
pub type SignerFactory =
	Arc<dyn Fn(&Credential) -> Result<Arc<dyn PayloadSigner>, SigningError> + Send + Sync>;

/// Capability that signs arbitrary payload bytes with the account's private key.
pub trait PayloadSigner
where
	Self: Send + Sync,
{
	/// Returns a detached RSA/SHA-256 signature over `payload`, encoded as a string.
	fn sign<'a>(&'a self, payload: &'a [u8]) -> SignFuture<'a>;
}

/// Default factory: software RSA/SHA-256 over the credential's PEM key with hex output.
pub fn default_signer_factory() -> SignerFactory {
	Arc::new(|credential: &Credential| {
		let signer = RsaSha256Signer::from_pem(credential.private_key())?;

		Ok(Arc::new(signer) as Arc<dyn PayloadSigner>)
	})
}
