// self
use crate::{_prelude::*, http::Method, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by client flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("brewlog_client.flow", flow = kind.as_str(), stage);

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

/// Logs an outbound dispatch.
pub fn trace_dispatch(method: Method, path: &str, replay: bool) {
	#[cfg(feature = "tracing")]
	tracing::debug!(method = method.as_str(), path, replay, "dispatching request");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, path, replay);
}

/// Logs a received response.
pub fn trace_response(method: Method, path: &str, status: u16) {
	#[cfg(feature = "tracing")]
	tracing::debug!(method = method.as_str(), path, status, "received response");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, path, status);
}

/// Logs the underlying cause of a refresh failure before it is collapsed into
/// [`Error::session_expired`].
pub fn trace_refresh_failure(cause: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(kind = cause.kind().as_str(), status = cause.status(), error = %cause, "token refresh failed");
	#[cfg(not(feature = "tracing"))]
	let _ = cause;
}

/// Logs a store failure that was swallowed on a best-effort path.
pub fn trace_store_failure(operation: &'static str, cause: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(operation, error = %cause, "credential store operation failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (operation, cause);
}
