//! Domain façade mapping named Bankpass operations onto dispatcher calls.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AuthOptions, CredentialStore},
	dispatch::Dispatcher,
	http::HttpTransport,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Request paths understood by the remote service.
pub mod paths {
	/// Starts a user identification.
	pub const IDENTIFICATION: &str = "/auth";
	/// Collects the response of a pending order.
	pub const COLLECT: &str = "/collect";
	/// Looks up a user's activation code.
	pub const ACTIVATION_CODE: &str = "/code";
}

/// Options for [`Bankpass::request_identification`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationRequest {
	/// User to identify.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	/// Data the identification must yield.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub requirements: Vec<Value>,
	/// Additional fields forwarded verbatim.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl IdentificationRequest {
	/// Creates a request for `user_id`.
	pub fn for_user(user_id: impl Into<String>) -> Self {
		Self { user_id: Some(user_id.into()), ..Default::default() }
	}
}

/// Reference to an order created by the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
	/// Order identifier used to collect the response.
	pub order_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderBody<'a> {
	order_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserBody<'a> {
	user_id: &'a str,
}

/// Named-operation client for the identity-verification service.
#[derive(Debug)]
pub struct Bankpass<T>
where
	T: ?Sized + HttpTransport,
{
	store: CredentialStore<T>,
}
impl<T> Bankpass<T>
where
	T: ?Sized + HttpTransport,
{
	/// Wraps an existing credential store.
	pub fn with_store(store: CredentialStore<T>) -> Self {
		Self { store }
	}

	/// Returns the dispatcher, loading credentials on first use.
	pub async fn dispatcher(&self) -> Result<Arc<Dispatcher<T>>> {
		self.store.dispatcher().await
	}

	/// Starts an identification and returns the created order.
	pub async fn request_identification(&self, options: &IdentificationRequest) -> Result<OrderRef> {
		self.dispatcher().await?.request_as(paths::IDENTIFICATION, options).await
	}

	/// Collects the response for `order_id`.
	pub async fn collect_response(&self, order_id: &str) -> Result<Value> {
		self.dispatcher().await?.request(paths::COLLECT, &OrderBody { order_id }).await
	}

	/// Looks up the activation code for `user_id`.
	pub async fn get_activation_code(&self, user_id: &str) -> Result<Value> {
		self.dispatcher().await?.request(paths::ACTIVATION_CODE, &UserBody { user_id }).await
	}

	/// Signature requests are not offered yet; always fails immediately.
	pub fn request_signature(&self, _user_id: &str) -> Result<Value> {
		Err(Error::Unimplemented { operation: "request_signature" })
	}

	/// Installs a previously persisted token, loading credentials first if needed.
	pub async fn set_access_token(&self, token: impl Into<AccessToken>) -> Result<()> {
		self.dispatcher().await?.set_access_token(token);

		Ok(())
	}

	/// Returns the current token so callers can persist it.
	pub async fn access_token(&self) -> Result<Option<AccessToken>> {
		Ok(self.dispatcher().await?.access_token())
	}
}
#[cfg(feature = "reqwest")]
impl Bankpass<ReqwestTransport> {
	/// Creates a client backed by the default reqwest transport.
	pub fn new(options: AuthOptions) -> Self {
		Self::with_store(CredentialStore::new(options))
	}
}
