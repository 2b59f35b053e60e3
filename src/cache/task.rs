// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::{
	runtime::Handle,
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

/// Periodic background task bound to its owner's lifetime.
///
/// Each tick asks `tick` for the next unit of work; returning `None` (the owner is gone)
/// ends the loop. Cancellation interrupts both the wait and an in-flight tick. Dropping
/// the task cancels it without waiting.
#[derive(Debug)]
pub(crate) struct RefreshTask {
	cancel: CancellationToken,
	handle: Option<JoinHandle<()>>,
}
impl RefreshTask {
	pub(crate) fn spawn<F, Fut>(runtime: &Handle, period: StdDuration, mut tick: F) -> Self
	where
		F: 'static + Send + FnMut() -> Option<Fut>,
		Fut: Send + Future<Output = ()>,
	{
		let cancel = CancellationToken::new();
		let token = cancel.clone();
		let handle = runtime.spawn(async move {
			let mut ticker = time::interval_at(Instant::now() + period, period);

			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

			loop {
				tokio::select! {
					_ = token.cancelled() => break,
					_ = ticker.tick() => {
						let Some(work) = tick() else { break };

						tokio::select! {
							_ = token.cancelled() => break,
							_ = work => {},
						}
					},
				}
			}
		});

		Self { cancel, handle: Some(handle) }
	}

	pub(crate) fn is_running(&self) -> bool {
		!self.cancel.is_cancelled() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
	}

	pub(crate) fn cancel(&self) {
		self.cancel.cancel();
	}

	pub(crate) async fn shutdown(mut self) {
		self.cancel.cancel();

		if let Some(handle) = self.handle.take() {
			let _ = handle.await;
		}
	}
}
impl Drop for RefreshTask {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}
