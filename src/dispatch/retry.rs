//! Bounded retry loop shared by token exchanges and business requests.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	dispatch::{
		APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE, Dispatcher, Endpoint, ResponseOutcome,
	},
	error::{TransientError, TransportError},
	http::{HttpResponse, HttpTransport, RequestAttempt},
	obs::{self, DispatchOutcome},
};

/// Terminal result of a retry loop that did not succeed.
#[derive(Debug)]
pub(crate) enum Rejection {
	/// The business endpoint rejected the token; the caller decides whether to reauthorize.
	Unauthorized { status: u16, reason: Value },
	/// Any other terminal failure.
	Failed(Error),
}
impl From<Rejection> for Error {
	fn from(rejection: Rejection) -> Self {
		match rejection {
			Rejection::Unauthorized { status, reason } => Error::Unauthorized { status, reason },
			Rejection::Failed(err) => err,
		}
	}
}

impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Issues the business request with the bearer header attached.
	pub(crate) async fn send_authorized(
		&self,
		url: &Url,
		token: &AccessToken,
		body: &[u8],
	) -> Result<Value, Rejection> {
		let headers =
			vec![(CONTENT_TYPE, APPLICATION_JSON.to_owned()), (AUTHORIZATION, token.bearer())];

		self.send_with_retry(Endpoint::Api, url, headers, body).await
	}

	/// Sends the same request until it succeeds, fails terminally, or the policy is exhausted.
	pub(crate) async fn send_with_retry(
		&self,
		endpoint: Endpoint,
		url: &Url,
		headers: Vec<(&'static str, String)>,
		body: &[u8],
	) -> Result<Value, Rejection> {
		let kind = endpoint.kind();
		let max_attempts = self.retry.max_attempts();
		let mut attempt = 1;

		loop {
			let request = RequestAttempt {
				url: url.clone(),
				headers: headers.clone(),
				body: body.to_vec(),
				attempt,
			};

			match ResponseOutcome::classify(endpoint, self.send_once(request).await) {
				ResponseOutcome::Success(value) => return Ok(value),
				ResponseOutcome::Unauthorized { status, reason } =>
					return Err(Rejection::Unauthorized { status, reason }),
				ResponseOutcome::Deauthorized { reason } =>
					return Err(Rejection::Failed(Error::Deauthorized { reason })),
				ResponseOutcome::Malformed { status, source } =>
					return Err(Rejection::Failed(Error::Decode { endpoint, status, source })),
				ResponseOutcome::NetworkError(err) => return Err(Rejection::Failed(err.into())),
				ResponseOutcome::TransientFailure { status, body } => {
					if attempt >= max_attempts {
						return Err(Rejection::Failed(
							TransientError::Exhausted { endpoint, status, body, attempts: attempt }
								.into(),
						));
					}

					self.metrics.record_retry();
					super::metrics::record_outcome(kind, DispatchOutcome::Retry);
					obs::trace_retry(kind, attempt, status, self.retry.delay());
					tokio::time::sleep(self.retry.delay()).await;

					attempt += 1;
				},
			}
		}
	}

	async fn send_once(&self, request: RequestAttempt) -> Result<HttpResponse, TransportError> {
		match self.retry.attempt_timeout() {
			Some(after) => tokio::time::timeout(after, self.transport.send(request))
				.await
				.unwrap_or(Err(TransportError::Timeout { after })),
			None => self.transport.send(request).await,
		}
	}
}
