//! Request dispatcher: token exchange, bearer authorization, reauthorization, and retries.
//!
//! Every business call follows the same strictly ordered sequence:
//!
//! 1. Read the cached [`AccessToken`]; when none exists, perform a signed exchange against the
//!    token endpoint and cache the result.
//! 2. Issue the business request with `Authorization: Bearer <token>`.
//! 3. Classify the response (see [`ResponseOutcome`]). A rejection in the 400–409 range
//!    invalidates the token, triggers exactly one fresh exchange, and replays the request once.
//!    A second rejection is terminal. Other non-2xx statuses are retried with a fixed delay up
//!    to [`RetryPolicy::max_attempts`]; transport failures surface immediately.
//!
//! Token acquisition runs under a single exchange guard. Callers that lose the race reuse the
//! token installed by the winner instead of exchanging again.

mod exchange;
mod metrics;
mod outcome;
mod retry;

pub use self::{metrics::DispatchMetrics, outcome::ResponseOutcome};

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credential},
	error::ConfigError,
	http::HttpTransport,
	obs::{self, DispatchKind, DispatchOutcome, FlowSpan},
	sign::PayloadSigner,
	store::{MemoryTokenStore, TokenStore},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestTransport, sign::RsaSha256Signer};

#[cfg(feature = "reqwest")]
/// Dispatcher specialized for the crate's default reqwest transport.
pub type ReqwestDispatcher = Dispatcher<ReqwestTransport>;

pub(crate) const CONTENT_TYPE: &str = "Content-Type";
pub(crate) const AUTHORIZATION: &str = "Authorization";
pub(crate) const SIGNATURE: &str = "signature";
pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Remote endpoint a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
	/// Token endpoint (`token_uri`).
	Token,
	/// Business API (`api_endpoint` + path).
	Api,
}
impl Endpoint {
	/// Returns a stable label suitable for messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			Endpoint::Token => "token",
			Endpoint::Api => "api",
		}
	}

	const fn kind(self) -> DispatchKind {
		match self {
			Endpoint::Token => DispatchKind::TokenExchange,
			Endpoint::Api => DispatchKind::Request,
		}
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Bounded retry rule for transient failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	max_attempts: u32,
	delay: Duration,
	attempt_timeout: Option<Duration>,
}
impl RetryPolicy {
	/// Attempts issued per retry loop, including the first.
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
	/// Fixed pause between attempts.
	pub const DEFAULT_DELAY: Duration = Duration::from_millis(1_000);

	/// Creates a policy; `max_attempts` is clamped to at least one.
	pub fn new(max_attempts: u32, delay: Duration) -> Self {
		Self { max_attempts: max_attempts.max(1), delay, attempt_timeout: None }
	}

	/// Bounds every transport call; an elapsed attempt fails with a transport timeout.
	pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
		self.attempt_timeout = Some(timeout);

		self
	}

	/// Attempts issued per retry loop, including the first.
	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Fixed pause between attempts.
	pub fn delay(&self) -> Duration {
		self.delay
	}

	/// Per-attempt timeout, if configured.
	pub fn attempt_timeout(&self) -> Option<Duration> {
		self.attempt_timeout
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
	}
}

/// Issues authorized requests on behalf of one service account.
///
/// The dispatcher exclusively owns its [`Credential`]. The token store, signer, and transport
/// are injected so each embedding environment can choose its own backends.
pub struct Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	signer: Arc<dyn PayloadSigner>,
	tokens: Arc<dyn TokenStore>,
	credential: Credential,
	retry: RetryPolicy,
	metrics: Arc<DispatchMetrics>,
	exchange_guard: AsyncMutex<()>,
}
impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a dispatcher over the caller-provided transport and signer.
	///
	/// Fails when `api_endpoint` is not a valid URL. `token_uri` is checked on the first
	/// exchange, so a dispatcher resumed through [`Dispatcher::set_access_token`] never needs it.
	pub fn with_transport(
		credential: Credential,
		transport: impl Into<Arc<T>>,
		signer: Arc<dyn PayloadSigner>,
	) -> Result<Self> {
		Url::parse(credential.api_endpoint())
			.map_err(|source| ConfigError::InvalidEndpoint { field: "api_endpoint", source })?;

		Ok(Self {
			transport: transport.into(),
			signer,
			tokens: Arc::new(MemoryTokenStore::default()),
			credential,
			retry: RetryPolicy::default(),
			metrics: Default::default(),
			exchange_guard: AsyncMutex::new(()),
		})
	}

	/// Replaces the token store (defaults to a fresh [`MemoryTokenStore`]).
	pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.tokens = store;

		self
	}

	/// Replaces the retry policy (defaults to [`RetryPolicy::default`]).
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry = policy;

		self
	}

	/// Credential this dispatcher acts for.
	pub fn credential(&self) -> &Credential {
		&self.credential
	}

	/// Retry policy applied to every retry loop.
	pub fn retry_policy(&self) -> RetryPolicy {
		self.retry
	}

	/// Counters for exchanges, requests, retries, reauthorizations, and failures.
	pub fn metrics(&self) -> &DispatchMetrics {
		&self.metrics
	}

	/// Installs a caller-supplied token, bypassing the exchange on the next request.
	///
	/// Used to resume a session whose token was persisted and restored externally.
	pub fn set_access_token(&self, token: impl Into<AccessToken>) {
		self.tokens.set(token.into());
	}

	/// Returns the cached token so callers can persist it.
	pub fn access_token(&self) -> Option<AccessToken> {
		self.tokens.get()
	}

	/// POSTs `body` as JSON to `api_endpoint` + `path` and returns the decoded JSON response.
	pub async fn request<B>(&self, path: &str, body: &B) -> Result<Value>
	where
		B: ?Sized + Serialize,
	{
		const KIND: DispatchKind = DispatchKind::Request;

		let span = FlowSpan::new(KIND, "request");

		metrics::record_outcome(KIND, DispatchOutcome::Attempt);
		self.metrics.record_request();

		let result = span
			.instrument(async move {
				let url = self.api_url(path)?;
				let payload = serde_json::to_vec(body).map_err(ConfigError::InvalidBody)?;
				let token = self.acquire_token(None).await?;

				match self.send_authorized(&url, &token, &payload).await {
					Err(retry::Rejection::Unauthorized { status, .. }) => {
						self.metrics.record_reauthorization();
						metrics::record_outcome(KIND, DispatchOutcome::Reauthorize);
						obs::trace_reauthorize(status);

						let fresh = self.acquire_token(Some(&token)).await?;

						self.send_authorized(&url, &fresh, &payload).await.map_err(Error::from)
					},
					other => other.map_err(Error::from),
				}
			})
			.await;

		match &result {
			Ok(_) => metrics::record_outcome(KIND, DispatchOutcome::Success),
			Err(_) => {
				self.metrics.record_failure();
				metrics::record_outcome(KIND, DispatchOutcome::Failure);
			},
		}

		result
	}

	/// Same as [`Dispatcher::request`], decoding the response into `R`.
	pub async fn request_as<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let value = self.request(path, body).await?;

		serde_path_to_error::deserialize(value)
			.map_err(|source| Error::ResponseShape { endpoint: Endpoint::Api, source })
	}

	fn api_url(&self, path: &str) -> Result<Url> {
		let raw = format!("{}{path}", self.credential.api_endpoint());

		Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidEndpoint { field: "api_endpoint", source }.into())
	}
}
#[cfg(feature = "reqwest")]
impl Dispatcher<ReqwestTransport> {
	/// Creates a dispatcher with the default reqwest transport and software RSA signer.
	pub fn new(credential: Credential) -> Result<Self> {
		let signer = RsaSha256Signer::from_pem(credential.private_key())?;

		Self::with_transport(credential, ReqwestTransport::default(), Arc::new(signer))
	}
}
impl<T> Debug for Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("credential", &self.credential)
			.field("retry", &self.retry)
			.field("token_cached", &self.tokens.get().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		error::SigningError,
		http::{HttpResponse, RequestAttempt, TransportFuture},
		sign::SignFuture,
	};

	struct Unreachable;
	impl HttpTransport for Unreachable {
		fn send(&self, _request: RequestAttempt) -> TransportFuture<'_> {
			Box::pin(async { Ok(HttpResponse::new(500, "")) })
		}
	}

	struct NoopSigner;
	impl PayloadSigner for NoopSigner {
		fn sign<'a>(&'a self, _payload: &'a [u8]) -> SignFuture<'a> {
			Box::pin(async { Ok::<_, SigningError>("sig".to_owned()) })
		}
	}

	fn credential(token_uri: &str, api_endpoint: &str) -> Credential {
		Credential::from_value(json!({
			"private_key": "pem",
			"private_key_id": "kid",
			"token_uri": token_uri,
			"api_endpoint": api_endpoint,
		}))
		.expect("Test credential should load.")
	}

	fn dispatcher(token_uri: &str, api_endpoint: &str) -> Result<Dispatcher<Unreachable>> {
		Dispatcher::with_transport(
			credential(token_uri, api_endpoint),
			Unreachable,
			Arc::new(NoopSigner),
		)
	}

	#[test]
	fn retry_policy_defaults_and_clamping() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.max_attempts(), 3);
		assert_eq!(policy.delay(), Duration::from_millis(1_000));
		assert_eq!(policy.attempt_timeout(), None);
		assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
	}

	#[test]
	fn invalid_api_endpoints_are_rejected_at_construction() {
		let err = dispatcher("https://auth.example.com/token", "")
			.expect_err("Missing API endpoints must be rejected.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::InvalidEndpoint { field: "api_endpoint", .. })
		));
		assert!(dispatcher("not a url", "https://api.example.com").is_ok());
	}

	#[tokio::test(start_paused = true)]
	async fn token_uri_is_only_required_for_exchanges() {
		let dispatcher = dispatcher("", "https://api.example.com")
			.expect("Dispatcher should build without token_uri.");
		let err = dispatcher
			.request("/auth", &json!({}))
			.await
			.expect_err("Exchanges without a token endpoint must fail.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::InvalidEndpoint { field: "token_uri", .. })
		));

		dispatcher.set_access_token("restored");

		let err = dispatcher
			.request("/auth", &json!({}))
			.await
			.expect_err("The stub transport always answers 500.");

		assert!(matches!(err, Error::Transient(_)));
		assert_eq!(dispatcher.metrics().token_exchanges(), 1);
	}

	#[test]
	fn api_urls_concatenate_base_and_path() {
		let dispatcher = dispatcher("https://auth.example.com/token", "https://api.example.com/v1")
			.expect("Dispatcher should build.");
		let url = dispatcher.api_url("/auth").expect("API URL should build.");

		assert_eq!(url.as_str(), "https://api.example.com/v1/auth");
	}

	#[test]
	fn injected_tokens_are_readable_and_redacted_in_debug() {
		let dispatcher = dispatcher("https://auth.example.com/token", "https://api.example.com")
			.expect("Dispatcher should build.");

		assert_eq!(dispatcher.access_token(), None);

		dispatcher.set_access_token("restored");

		assert_eq!(dispatcher.access_token(), Some(AccessToken::new("restored")));
		assert!(!format!("{dispatcher:?}").contains("restored"));
	}
}
