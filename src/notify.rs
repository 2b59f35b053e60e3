//! Push-notification signature checks.
//!
//! WeChat signs every message pushed to the account's server URL with
//! `sha1(sort([token, timestamp, nonce]).concat())`, hex encoded.

// crates.io
use sha1::{Digest, Sha1};

/// Returns `true` when `signature` matches the configured server `token` for this
/// `timestamp` and `nonce`. The hex comparison ignores case.
pub fn check_notify(signature: &str, timestamp: &str, nonce: &str, token: &str) -> bool {
	let mut parts = [token, timestamp, nonce];

	parts.sort_unstable();

	let mut hasher = Sha1::new();

	for part in parts {
		hasher.update(part.as_bytes());
	}

	hex::encode(hasher.finalize()).eq_ignore_ascii_case(signature)
}
