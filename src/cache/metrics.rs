// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for access token refreshes and verification probes.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	verifications: AtomicU64,
	rejected: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of issuance attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of issuances that installed a credential.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed issuances.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of verification probes sent.
	pub fn verifications(&self) -> u64 {
		self.verifications.load(Ordering::Relaxed)
	}

	/// Returns the number of verification probes the upstream rejected.
	pub fn rejected_verifications(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_verification(&self) {
		self.verifications.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rejected_verification(&self) {
		self.rejected.fetch_add(1, Ordering::Relaxed);
	}
}
