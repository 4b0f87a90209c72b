//! Client-level error types shared across credential loading, signing, and dispatch.

// std
use std::string::FromUtf8Error;
// self
use crate::{_prelude::*, dispatch::Endpoint};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Service-account material could not be loaded or failed validation.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The signing backend could not produce a signature.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Retryable upstream failure that outlived the retry policy.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The business endpoint rejected the request again after reauthorization.
	#[error("Request was rejected with status {status} after reauthorization.")]
	Unauthorized {
		/// HTTP status code of the final rejection.
		status: u16,
		/// Response body parsed as JSON, the raw text, or an empty object.
		reason: Value,
	},
	/// The token endpoint revoked the service account itself.
	#[error("Token endpoint deauthorized the service account.")]
	Deauthorized {
		/// Response body returned by the token endpoint.
		reason: Value,
	},
	/// A successful response carried a body that is not JSON.
	#[error("The {endpoint} endpoint returned a non-JSON body with status {status}.")]
	Decode {
		/// Endpoint that produced the body.
		endpoint: Endpoint,
		/// HTTP status code of the response.
		status: u16,
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
	},
	/// A JSON response did not have the shape the caller expects.
	#[error("The {endpoint} endpoint returned an unexpected response shape.")]
	ResponseShape {
		/// Endpoint that produced the body.
		endpoint: Endpoint,
		/// Structured parsing failure including the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The requested operation is not offered by this client.
	#[error("Operation `{operation}` is not implemented.")]
	Unimplemented {
		/// Operation label.
		operation: &'static str,
	},
}
impl Error {
	/// Returns the HTTP status code carried by the error, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Unauthorized { status, .. } | Self::Decode { status, .. } => Some(*status),
			Self::Transient(TransientError::Exhausted { status, .. }) => Some(*status),
			_ => None,
		}
	}
}

/// Failures raised while loading service-account material.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// The credential record has no (or an empty) `private_key`.
	#[error("The credential record does not contain a private_key field.")]
	MissingPrivateKey,
	/// The credential record has no (or an empty) `private_key_id`.
	#[error("The credential record does not contain a private_key_id field.")]
	MissingKeyId,
	/// The credential content is not a well-formed credential record.
	#[error("Credential content is not a valid service-account record.")]
	Parse {
		/// Structured parsing failure including the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The credential stream is not valid UTF-8.
	#[error("Credential content is not valid UTF-8.")]
	Utf8(#[from] FromUtf8Error),
	/// Reading the credential stream or file failed.
	#[error("Failed to read credential content{}.", describe_path(.path))]
	Io {
		/// File path, when the content came from a key file.
		path: Option<PathBuf>,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
}

fn describe_path(path: &Option<PathBuf>) -> String {
	path.as_ref().map(|p| format!(" from {}", p.display())).unwrap_or_default()
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Neither inline credentials nor a key file were configured.
	#[error("No inline credentials or key file were configured.")]
	MissingCredentials,
	/// A credential endpoint is not a valid URL.
	#[error("Credential field `{field}` is not a valid URL.")]
	InvalidEndpoint {
		/// Credential field holding the URL.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The caller-supplied request body could not be serialized.
	#[error("Request body could not be serialized to JSON.")]
	InvalidBody(#[source] serde_json::Error),
	/// The token-exchange timestamp could not be formatted.
	#[error("Token exchange timestamp could not be formatted.")]
	Timestamp(#[from] time::error::Format),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised by [`PayloadSigner`](crate::sign::PayloadSigner) implementations.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// The private key cannot be decoded by the signing backend.
	#[error("Private key could not be decoded.")]
	InvalidKey {
		/// Backend-specific decoding failure.
		#[source]
		source: BoxError,
	},
	/// The backend failed while computing the signature.
	#[error("Payload could not be signed.")]
	Sign {
		/// Backend-specific signing failure.
		#[source]
		source: BoxError,
	},
}
impl SigningError {
	/// Wraps a key decoding failure.
	pub fn invalid_key(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidKey { source: Box::new(src) }
	}

	/// Wraps a signature computation failure.
	pub fn sign(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Sign { source: Box::new(src) }
	}
}

/// Retryable failures that exhausted the retry policy.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Every attempt returned a retryable status; carries the last raw response.
	#[error("The {endpoint} endpoint kept failing with status {status} after {attempts} attempts.")]
	Exhausted {
		/// Endpoint that kept failing.
		endpoint: Endpoint,
		/// HTTP status code of the last response.
		status: u16,
		/// Raw body of the last response.
		body: String,
		/// Number of attempts issued, including the first.
		attempts: u32,
	},
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The attempt did not complete within the configured timeout.
	#[error("Request did not complete within {after:?}.")]
	Timeout {
		/// Timeout that elapsed.
		after: Duration,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote service.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
