// self
use crate::{_prelude::*, obs::DispatchKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by dispatcher operations.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: DispatchKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("bankpass.dispatch", kind = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warning for a transient failure that is about to be retried.
pub fn trace_retry(kind: DispatchKind, attempt: u32, status: u16, delay: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(kind = kind.as_str(), attempt, status, ?delay, "retrying transient failure");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, attempt, status, delay);
	}
}

/// Emits an event for a rejected token that triggers reauthorization.
pub fn trace_reauthorize(status: u16) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(status, "access token rejected; reauthorizing");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = status;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn helpers_noop_without_tracing() {
		trace_retry(DispatchKind::Request, 1, 503, Duration::from_millis(10));
		trace_reauthorize(403);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(DispatchKind::Request, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
