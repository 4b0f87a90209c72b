//! Transport primitive for token exchanges and business requests.
//!
//! The dispatcher depends on exactly one operation: send a JSON `POST` and hand back the
//! status code plus raw body. [`HttpTransport`] captures that operation so tests and
//! embedding environments can substitute their own stack; [`ReqwestTransport`] is the
//! default implementation. Transports never interpret status codes, since classification
//! belongs to the dispatcher.

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Single outbound attempt. Every attempt is issued as a `POST`.
#[derive(Clone, Debug)]
pub struct RequestAttempt {
	/// Absolute target URL.
	pub url: Url,
	/// Header name/value pairs in insertion order.
	pub headers: Vec<(&'static str, String)>,
	/// Serialized JSON body.
	pub body: Vec<u8>,
	/// One-based attempt number within the current retry loop.
	pub attempt: u32,
}
impl RequestAttempt {
	/// Returns the first header value registered under `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Status code and raw body of a completed exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Builds a response from a status code and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Whether the status is in the 2xx class.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Abstraction over the HTTP stack used by the dispatcher.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back many
/// dispatchers, and the returned future must be `Send` so dispatcher futures can move
/// across executor threads.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Issues `request` and resolves once the full response body has been read.
	fn send(&self, request: RequestAttempt) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose every request is bounded by `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: RequestAttempt) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.post(request.url);

			for (name, value) in request.headers {
				builder = builder.header(name, value);
			}

			let response = builder.body(request.body).send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn header_lookup_ignores_case() {
		let attempt = RequestAttempt {
			url: Url::parse("https://example.com/token").expect("Fixture URL should parse."),
			headers: vec![("Content-Type", "application/json".into()), ("signature", "abc".into())],
			body: Vec::new(),
			attempt: 1,
		};

		assert_eq!(attempt.header("content-type"), Some("application/json"));
		assert_eq!(attempt.header("Signature"), Some("abc"));
		assert_eq!(attempt.header("authorization"), None);
	}

	#[test]
	fn success_class_covers_all_2xx() {
		assert!(HttpResponse::new(200, "").is_success());
		assert!(HttpResponse::new(204, "").is_success());
		assert!(!HttpResponse::new(302, "").is_success());
		assert!(!HttpResponse::new(199, "").is_success());
	}
}
