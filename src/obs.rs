//! Optional observability helpers for dispatcher operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `bankpass.dispatch` with the `kind` and
//!   `stage` (call site) fields, plus events for retries and reauthorizations.
//! - Enable `metrics` to increment the `bankpass_dispatch_total` counter for every
//!   attempt/success/failure/retry/reauthorization, labeled by `kind` + `outcome` (recorded
//!   next to the dispatcher's own counters in `dispatch`).

mod tracing;

pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchKind {
	/// Signed exchange against the token endpoint.
	TokenExchange,
	/// Bearer-authorized business request.
	Request,
}
impl DispatchKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DispatchKind::TokenExchange => "token_exchange",
			DispatchKind::Request => "request",
		}
	}
}
impl Display for DispatchKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
	/// Entry to a dispatcher operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// A transient failure scheduled another attempt.
	Retry,
	/// A rejected token triggered a fresh exchange.
	Reauthorize,
}
impl DispatchOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DispatchOutcome::Attempt => "attempt",
			DispatchOutcome::Success => "success",
			DispatchOutcome::Failure => "failure",
			DispatchOutcome::Retry => "retry",
			DispatchOutcome::Reauthorize => "reauthorize",
		}
	}
}
impl Display for DispatchOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
