//! Signed token exchange and race-free token acquisition.

// crates.io
use time::{
	UtcOffset,
	format_description::BorrowedFormatItem,
	macros::format_description,
};
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	dispatch::{APPLICATION_JSON, CONTENT_TYPE, Dispatcher, Endpoint, SIGNATURE},
	error::ConfigError,
	http::HttpTransport,
	obs::{DispatchKind, DispatchOutcome, FlowSpan},
};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
	"[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangePayload<'a> {
	key_id: &'a str,
	timestamp: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeResponse {
	access_token: String,
}

impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Returns a usable token, exchanging for a new one when needed.
	///
	/// With `stale == None` the cached token is reused when present. With `stale == Some`, the
	/// caller saw that token rejected: it is cleared and replaced by a fresh exchange unless a
	/// concurrent caller already replaced it, in which case the replacement is returned.
	pub(crate) async fn acquire_token(&self, stale: Option<&AccessToken>) -> Result<AccessToken> {
		if let (None, Some(current)) = (stale, self.tokens.get()) {
			return Ok(current);
		}

		let _exchange = self.exchange_guard.lock().await;

		match (self.tokens.get(), stale) {
			(Some(current), Some(stale)) if &current == stale => {
				self.tokens.invalidate(stale);
			},
			(Some(current), _) => return Ok(current),
			(None, _) => {},
		}

		let fresh = self.exchange_token().await?;

		self.tokens.set(fresh.clone());

		Ok(fresh)
	}

	/// Signs `{keyId, timestamp}` and trades it for an access token at the token endpoint.
	async fn exchange_token(&self) -> Result<AccessToken> {
		const KIND: DispatchKind = DispatchKind::TokenExchange;

		let span = FlowSpan::new(KIND, "exchange_token");

		super::metrics::record_outcome(KIND, DispatchOutcome::Attempt);
		self.metrics.record_token_exchange();

		let result = span
			.instrument(async {
				let token_url = Url::parse(self.credential.token_uri())
					.map_err(|source| ConfigError::InvalidEndpoint { field: "token_uri", source })?;
				let payload = ExchangePayload {
					key_id: self.credential.key_id(),
					timestamp: exchange_timestamp(OffsetDateTime::now_utc())?,
				};
				let body = serde_json::to_vec(&payload).map_err(ConfigError::InvalidBody)?;
				let signature = self.signer.sign(&body).await?;
				let headers = vec![
					(CONTENT_TYPE, APPLICATION_JSON.to_owned()),
					(SIGNATURE, signature),
				];
				let value = self.send_with_retry(Endpoint::Token, &token_url, headers, &body).await?;
				let response: ExchangeResponse = serde_path_to_error::deserialize(value)
					.map_err(|source| Error::ResponseShape { endpoint: Endpoint::Token, source })?;

				Ok::<_, Error>(AccessToken::new(response.access_token))
			})
			.await;

		match &result {
			Ok(_) => super::metrics::record_outcome(KIND, DispatchOutcome::Success),
			Err(_) => super::metrics::record_outcome(KIND, DispatchOutcome::Failure),
		}

		result
	}
}

/// Formats `instant` as ISO-8601 UTC with millisecond precision.
pub(crate) fn exchange_timestamp(instant: OffsetDateTime) -> Result<String> {
	Ok(instant.to_offset(UtcOffset::UTC).format(TIMESTAMP_FORMAT).map_err(ConfigError::from)?)
}
