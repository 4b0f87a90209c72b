// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{DispatchKind, DispatchOutcome};

/// Thread-safe counters describing dispatcher activity.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
	token_exchanges: AtomicU64,
	requests: AtomicU64,
	retries: AtomicU64,
	reauthorizations: AtomicU64,
	failures: AtomicU64,
}
impl DispatchMetrics {
	/// Returns the number of signed token exchanges started.
	pub fn token_exchanges(&self) -> u64 {
		self.token_exchanges.load(Ordering::Relaxed)
	}

	/// Returns the number of business requests started.
	pub fn requests(&self) -> u64 {
		self.requests.load(Ordering::Relaxed)
	}

	/// Returns the number of transient failures that scheduled another attempt.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	/// Returns the number of rejections that triggered reauthorization.
	pub fn reauthorizations(&self) -> u64 {
		self.reauthorizations.load(Ordering::Relaxed)
	}

	/// Returns the number of business requests that failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_token_exchange(&self) {
		self.token_exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_request(&self) {
		self.requests.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reauthorization(&self) {
		self.reauthorizations.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}

/// Increments `bankpass_dispatch_total{kind,outcome}` on the global recorder.
///
/// A no-op unless the `metrics` feature is enabled; [`DispatchMetrics`] counts regardless.
pub(crate) fn record_outcome(kind: DispatchKind, outcome: DispatchOutcome) {
	#[cfg(feature = "metrics")]
	::metrics::counter!(
		"bankpass_dispatch_total",
		"kind" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
