//! Software RSA PKCS#1 v1.5 / SHA-256 signer.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use rsa::{
	RsaPrivateKey,
	pkcs1::DecodeRsaPrivateKey,
	pkcs1v15::SigningKey,
	pkcs8::DecodePrivateKey,
	signature::{SignatureEncoding as _, Signer},
};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	error::SigningError,
	sign::{PayloadSigner, SignFuture},
};

/// Text encoding applied to the raw signature bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureEncoding {
	/// Lowercase hexadecimal.
	#[default]
	Hex,
	/// Standard padded base64.
	Base64,
}
impl SignatureEncoding {
	fn encode(self, raw: &[u8]) -> String {
		match self {
			Self::Hex => hex::encode(raw),
			Self::Base64 => STANDARD.encode(raw),
		}
	}
}

/// Signs payloads with an in-process RSA private key.
#[derive(Clone)]
pub struct RsaSha256Signer {
	key: SigningKey<Sha256>,
	encoding: SignatureEncoding,
}
impl RsaSha256Signer {
	/// Decodes a PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1 (`BEGIN RSA PRIVATE KEY`) PEM key.
	pub fn from_pem(pem: &str) -> Result<Self, SigningError> {
		let key = match RsaPrivateKey::from_pkcs8_pem(pem) {
			Ok(key) => key,
			Err(pkcs8_err) =>
				RsaPrivateKey::from_pkcs1_pem(pem).map_err(|_| SigningError::invalid_key(pkcs8_err))?,
		};

		Ok(Self { key: SigningKey::new(key), encoding: SignatureEncoding::default() })
	}

	/// Overrides the output encoding (hex by default).
	pub fn with_encoding(mut self, encoding: SignatureEncoding) -> Self {
		self.encoding = encoding;

		self
	}

	/// Signs `payload` synchronously.
	pub fn sign_now(&self, payload: &[u8]) -> Result<String, SigningError> {
		let signature = self.key.try_sign(payload).map_err(SigningError::sign)?;

		Ok(self.encoding.encode(&signature.to_bytes()))
	}
}
impl PayloadSigner for RsaSha256Signer {
	fn sign<'a>(&'a self, payload: &'a [u8]) -> SignFuture<'a> {
		Box::pin(async move { self.sign_now(payload) })
	}
}
impl Debug for RsaSha256Signer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RsaSha256Signer").field("encoding", &self.encoding).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use rsa::{
		pkcs1v15::{Signature, VerifyingKey},
		signature::Verifier,
	};
	// self
	use super::*;

	const PKCS1_PEM: &str = include_str!("../../tests/fixtures/rsa_pkcs1.pem");
	const FIXTURE: &str = include_str!("../../tests/fixtures/service_account.json");

	fn pkcs8_pem() -> String {
		let value: Value = serde_json::from_str(FIXTURE).expect("Fixture should be valid JSON.");

		value["private_key"].as_str().expect("Fixture should carry a private key.").to_owned()
	}

	fn verify(pem: &str, payload: &[u8], raw: &[u8]) {
		let key = RsaPrivateKey::from_pkcs1_pem(pem)
			.or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
			.expect("Verification key should decode.");
		let verifier = VerifyingKey::<Sha256>::new(key.to_public_key());
		let signature = Signature::try_from(raw).expect("Signature bytes should decode.");

		verifier.verify(payload, &signature).expect("Signature should verify against the key.");
	}

	#[tokio::test]
	async fn hex_signatures_verify_against_the_public_key() {
		let pem = pkcs8_pem();
		let signer = RsaSha256Signer::from_pem(&pem).expect("PKCS#8 key should decode.");
		let payload = br#"{"keyId":"fixture-key-id","timestamp":"2024-01-01T00:00:00.000Z"}"#;
		let signature = signer.sign(payload).await.expect("Signing should succeed.");
		let raw = hex::decode(&signature).expect("Signature should be hex encoded.");

		verify(&pem, payload, &raw);
	}

	#[test]
	fn pkcs1_keys_and_base64_output_are_supported() {
		let signer = RsaSha256Signer::from_pem(PKCS1_PEM)
			.expect("PKCS#1 key should decode.")
			.with_encoding(SignatureEncoding::Base64);
		let payload = b"payload";
		let signature = signer.sign_now(payload).expect("Signing should succeed.");
		let raw = STANDARD.decode(signature).expect("Signature should be base64 encoded.");

		verify(PKCS1_PEM, payload, &raw);
	}

	#[test]
	fn garbage_keys_are_rejected() {
		let err = RsaSha256Signer::from_pem("not a key").expect_err("Garbage must be rejected.");

		assert!(matches!(err, SigningError::InvalidKey { .. }));
	}
}
