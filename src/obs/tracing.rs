// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, config::CachePolicy, obs::FlowKind};

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
			let span = tracing::info_span!("wechat_broker.flow", flow = kind.as_str(), stage);

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

/// Logs a response body and its round-trip latency against the request path. Query
/// strings are never logged.
pub fn record_response_body(path: &str, status: u16, elapsed: Option<StdDuration>, body: &[u8]) {
	#[cfg(feature = "tracing")]
	{
		let preview = crate::dispatch::body_preview(body);

		tracing::debug!(path, status, elapsed = ?elapsed, body = %preview, "WeChat API responded.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (path, status, elapsed, body);
	}
}

/// Logs which cache policy a client started with.
pub fn record_cache_policy(policy: CachePolicy) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(policy = policy.as_str(), "Access token cache policy selected.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = policy;
	}
}

/// Logs a successful access token swap.
pub fn record_credential_refreshed(expires_at: Option<OffsetDateTime>) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(expires_at = ?expires_at, "Installed a fresh access token.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = expires_at;
	}
}

/// Logs a swallowed refresh failure; the previous token stays in place.
pub fn record_refresh_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %error, "Access token refresh failed; keeping the previous token.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Logs a rejected verification probe.
pub fn record_verification_rejected(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(error = %error, "Access token verification probe was rejected.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Logs a birthday value none of the known date layouts accepted.
pub fn record_unparsed_birthday(raw: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(raw, "Dropped member birthday with an unrecognized format.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = raw;
	}
}
