//! Shared fixtures and transports for integration tests.

#![allow(dead_code)]

// std
use std::{collections::VecDeque, sync::Arc};
// crates.io
use bankpass::{
	auth::Credential,
	dispatch::{Dispatcher, RetryPolicy},
	error::TransportError,
	http::{HttpResponse, HttpTransport, RequestAttempt, TransportFuture},
	sign::RsaSha256Signer,
};
use parking_lot::Mutex;
use rsa::{RsaPrivateKey, RsaPublicKey, pkcs8::DecodePrivateKey};
use serde_json::{Value, json};
use tokio::time::Instant;

pub const FIXTURE: &str = include_str!("../fixtures/service_account.json");

/// Loads the fixture record with its endpoints pointed at `token_uri` and `api_endpoint`.
pub fn fixture_credential(token_uri: &str, api_endpoint: &str) -> Credential {
	let mut value = fixture_value();

	value["token_uri"] = json!(token_uri);
	value["api_endpoint"] = json!(api_endpoint);

	Credential::from_value(value).expect("Fixture credential should load.")
}

pub fn fixture_value() -> Value {
	serde_json::from_str(FIXTURE).expect("Fixture credential should be valid JSON.")
}

pub fn fixture_public_key() -> RsaPublicKey {
	let pem = fixture_value()["private_key"]
		.as_str()
		.expect("Fixture should carry a private key.")
		.to_owned();

	RsaPrivateKey::from_pkcs8_pem(&pem).expect("Fixture key should decode.").to_public_key()
}

/// Retry policy that keeps wall-clock tests fast.
pub fn fast_retry() -> RetryPolicy {
	RetryPolicy::new(RetryPolicy::DEFAULT_MAX_ATTEMPTS, std::time::Duration::from_millis(10))
}

/// What the stub answers for one attempt.
pub enum Reply {
	Respond(HttpResponse),
	Fail(TransportError),
	Hang,
}
impl Reply {
	pub fn json(status: u16, body: Value) -> Self {
		Self::Respond(HttpResponse::new(status, body.to_string()))
	}

	pub fn text(status: u16, body: &str) -> Self {
		Self::Respond(HttpResponse::new(status, body))
	}
}

/// One attempt observed by [`StubTransport`].
#[derive(Clone, Debug)]
pub struct Recorded {
	pub request: RequestAttempt,
	pub at: Instant,
}
impl Recorded {
	pub fn path(&self) -> &str {
		self.request.url.path()
	}

	pub fn json_body(&self) -> Value {
		serde_json::from_slice(&self.request.body).expect("Recorded body should be JSON.")
	}
}

type Responder = Box<dyn Fn(&RequestAttempt) -> Reply + Send + Sync>;

/// In-memory transport that records every attempt and answers from a responder.
pub struct StubTransport {
	responder: Responder,
	calls: Mutex<Vec<Recorded>>,
	yield_first: bool,
}
impl StubTransport {
	/// Answers attempts in order; panics when the script runs dry.
	pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> Self {
		let queue = Mutex::new(replies.into_iter().collect::<VecDeque<_>>());

		Self::routed(move |request| {
			queue.lock().pop_front().unwrap_or_else(|| {
				panic!("Unexpected attempt against {}.", request.url)
			})
		})
	}

	/// Answers attempts through `responder`.
	pub fn routed(responder: impl Fn(&RequestAttempt) -> Reply + Send + Sync + 'static) -> Self {
		Self { responder: Box::new(responder), calls: Mutex::new(Vec::new()), yield_first: false }
	}

	/// Yields to the scheduler before answering so concurrent callers interleave.
	pub fn yielding(mut self) -> Self {
		self.yield_first = true;

		self
	}

	pub fn calls(&self) -> Vec<Recorded> {
		self.calls.lock().clone()
	}

	pub fn paths(&self) -> Vec<String> {
		self.calls.lock().iter().map(|call| call.path().to_owned()).collect()
	}
}
impl HttpTransport for StubTransport {
	fn send(&self, request: RequestAttempt) -> TransportFuture<'_> {
		Box::pin(async move {
			if self.yield_first {
				tokio::task::yield_now().await;
			}

			let reply = (self.responder)(&request);

			self.calls.lock().push(Recorded { request, at: Instant::now() });

			match reply {
				Reply::Respond(response) => Ok(response),
				Reply::Fail(err) => Err(err),
				Reply::Hang => std::future::pending().await,
			}
		})
	}
}

pub const TOKEN_URI: &str = "https://auth.example.com/token";
pub const API_ENDPOINT: &str = "https://api.example.com/v1";

/// Dispatcher over a stub transport with the fixture key and the given retry policy.
pub fn stub_dispatcher(
	transport: Arc<StubTransport>,
	policy: RetryPolicy,
) -> Dispatcher<StubTransport> {
	let credential = fixture_credential(TOKEN_URI, API_ENDPOINT);
	let signer = RsaSha256Signer::from_pem(credential.private_key())
		.expect("Fixture key should decode.");

	Dispatcher::<StubTransport>::with_transport(credential, transport, Arc::new(signer))
		.expect("Stub dispatcher should build.")
		.with_retry_policy(policy)
}
