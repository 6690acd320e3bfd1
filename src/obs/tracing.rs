//! Structured logging span for a single flow invocation (feature `tracing`).

// self
use crate::{_prelude::*, obs::FlowKind};

/// A span builder used by credential/data-lake flows.
///
/// Blocking by design: callers hold the returned guard for the duration of the synchronous
/// call it covers, there is no async instrumentation to thread through.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage, plus the correlation id
	/// that will accompany every log line the call emits.
	pub fn new(kind: FlowKind, stage: &'static str, correlation_id: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"edgelink_core.flow",
				flow = kind.as_str(),
				stage,
				correlation_id
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, correlation_id);

			Self {}
		}
	}

	/// Enters the span for the duration of the guard.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}
