//! Account-level access credential issued by the token endpoint.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Immutable bearer credential required on every privileged call.
///
/// The cache replaces credentials wholesale on refresh and never mutates one in place,
/// so a reader holding an `Arc<Credential>` always sees a consistent value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	/// Access token secret; callers must avoid logging it.
	pub value: TokenSecret,
	/// Instant the token endpoint issued the credential.
	pub issued_at: OffsetDateTime,
	/// Expiry derived from `expires_in`, when the endpoint reported one.
	pub expires_at: Option<OffsetDateTime>,
}
impl Credential {
	/// Creates a credential issued now with no known expiry.
	pub fn new(value: impl Into<String>) -> Self {
		Self {
			value: TokenSecret::new(value),
			issued_at: OffsetDateTime::now_utc(),
			expires_at: None,
		}
	}

	/// Derives the expiry from an `expires_in` lifetime; non-positive lifetimes are ignored.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_at = expires_in.is_positive().then(|| self.issued_at + expires_in);

		self
	}

	/// Returns the raw token for embedding into a request.
	pub fn expose(&self) -> &str {
		self.value.expose()
	}

	/// Returns `true` when the reported lifetime has elapsed at `instant`.
	///
	/// Expiry is advisory: the cache treats a credential as usable until a verification
	/// probe is rejected.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("value", &self.value)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
