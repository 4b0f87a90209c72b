//! Response classification shared by the token exchange and business requests.

// std
use std::ops::Range;
// self
use crate::{
	_prelude::*,
	dispatch::Endpoint,
	error::TransportError,
	http::HttpResponse,
};

/// Statuses treated as a rejected token on business requests.
///
/// The whole 400–409 block is included, so client errors such as 404 or 409 also trigger a
/// reauthorization before they surface.
pub const UNAUTHORIZED_STATUSES: Range<u16> = 400..410;

/// Classified result of a single attempt.
#[derive(Debug)]
pub enum ResponseOutcome {
	/// 2xx with a JSON body (an empty body decodes to `null`).
	Success(Value),
	/// Business request rejected with a status in [`UNAUTHORIZED_STATUSES`].
	Unauthorized {
		/// HTTP status code.
		status: u16,
		/// Body parsed as JSON, the raw text, or an empty object.
		reason: Value,
	},
	/// Retryable non-2xx response.
	TransientFailure {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Token endpoint signalled that the service account was revoked.
	Deauthorized {
		/// Body parsed as JSON.
		reason: Value,
	},
	/// 2xx whose body is not JSON.
	Malformed {
		/// HTTP status code.
		status: u16,
		/// Underlying JSON failure.
		source: serde_json::Error,
	},
	/// The transport failed before a response arrived.
	NetworkError(TransportError),
}
impl ResponseOutcome {
	/// Classifies the result of one attempt against `endpoint`.
	///
	/// Token-endpoint failures are never classified as [`ResponseOutcome::Unauthorized`]; they
	/// are retryable unless the body carries `meta.deauthorize == true`.
	pub fn classify(endpoint: Endpoint, result: Result<HttpResponse, TransportError>) -> Self {
		let response = match result {
			Ok(response) => response,
			Err(err) => return Self::NetworkError(err),
		};

		if response.is_success() {
			return decode_success(response);
		}

		match endpoint {
			Endpoint::Api if UNAUTHORIZED_STATUSES.contains(&response.status) =>
				Self::Unauthorized { status: response.status, reason: rejection_reason(&response) },
			Endpoint::Token => match deauthorization(&response) {
				Some(reason) => Self::Deauthorized { reason },
				None => Self::TransientFailure { status: response.status, body: response.text() },
			},
			Endpoint::Api => Self::TransientFailure { status: response.status, body: response.text() },
		}
	}
}

fn decode_success(response: HttpResponse) -> ResponseOutcome {
	if response.body.iter().all(u8::is_ascii_whitespace) {
		return ResponseOutcome::Success(Value::Null);
	}

	match serde_json::from_slice(&response.body) {
		Ok(value) => ResponseOutcome::Success(value),
		Err(source) => ResponseOutcome::Malformed { status: response.status, source },
	}
}

fn rejection_reason(response: &HttpResponse) -> Value {
	if let Ok(value) = serde_json::from_slice::<Value>(&response.body) {
		return value;
	}

	let text = response.text();

	if text.is_empty() { Value::Object(Map::new()) } else { Value::String(text) }
}

fn deauthorization(response: &HttpResponse) -> Option<Value> {
	let value = serde_json::from_slice::<Value>(&response.body).ok()?;

	(value.pointer("/meta/deauthorize") == Some(&Value::Bool(true))).then_some(value)
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn classify(endpoint: Endpoint, status: u16, body: &str) -> ResponseOutcome {
		ResponseOutcome::classify(endpoint, Ok(HttpResponse::new(status, body)))
	}

	#[test]
	fn success_bodies_are_decoded() {
		assert!(matches!(
			classify(Endpoint::Api, 200, r#"{"orderId":"o1"}"#),
			ResponseOutcome::Success(value) if value == json!({ "orderId": "o1" })
		));
		assert!(matches!(
			classify(Endpoint::Api, 204, ""),
			ResponseOutcome::Success(Value::Null)
		));
		assert!(matches!(
			classify(Endpoint::Token, 201, "<html>"),
			ResponseOutcome::Malformed { status: 201, .. }
		));
	}

	#[test]
	fn api_rejections_cover_400_through_409() {
		for status in [400, 401, 403, 404, 409] {
			assert!(matches!(
				classify(Endpoint::Api, status, "{}"),
				ResponseOutcome::Unauthorized { status: s, .. } if s == status
			));
		}
		for status in [399, 410, 429, 500, 503] {
			assert!(matches!(
				classify(Endpoint::Api, status, ""),
				ResponseOutcome::TransientFailure { status: s, .. } if s == status
			));
		}
	}

	#[test]
	fn rejection_reason_prefers_json_then_text_then_empty_object() {
		let json_reason = classify(Endpoint::Api, 403, r#"{"exception":"Token Expired"}"#);
		let text_reason = classify(Endpoint::Api, 401, "expired");
		let empty_reason = classify(Endpoint::Api, 401, "");

		assert!(matches!(
			json_reason,
			ResponseOutcome::Unauthorized { reason, .. } if reason == json!({ "exception": "Token Expired" })
		));
		assert!(matches!(
			text_reason,
			ResponseOutcome::Unauthorized { reason, .. } if reason == json!("expired")
		));
		assert!(matches!(
			empty_reason,
			ResponseOutcome::Unauthorized { reason, .. } if reason == json!({})
		));
	}

	#[test]
	fn token_endpoint_failures_are_transient_unless_deauthorized() {
		assert!(matches!(
			classify(Endpoint::Token, 403, r#"{"error":"bad signature"}"#),
			ResponseOutcome::TransientFailure { status: 403, .. }
		));
		assert!(matches!(
			classify(Endpoint::Token, 401, r#"{"meta":{"deauthorize":true}}"#),
			ResponseOutcome::Deauthorized { .. }
		));
		assert!(matches!(
			classify(Endpoint::Token, 401, r#"{"meta":{"deauthorize":false}}"#),
			ResponseOutcome::TransientFailure { status: 401, .. }
		));
	}

	#[test]
	fn transport_failures_are_network_errors() {
		let outcome = ResponseOutcome::classify(
			Endpoint::Api,
			Err(TransportError::Timeout { after: Duration::from_secs(1) }),
		);

		assert!(matches!(outcome, ResponseOutcome::NetworkError(TransportError::Timeout { .. })));
	}
}
