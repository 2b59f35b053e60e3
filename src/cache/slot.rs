// self
use crate::{_prelude::*, auth::Credential};

/// Single in-memory slot holding the current credential.
///
/// Writers replace the whole `Arc` and readers clone it, so a reader observes either the
/// previous or the next credential in full. The lock is held only for the pointer clone
/// or swap and never across an `.await`.
#[derive(Debug, Default)]
pub struct CredentialSlot(RwLock<Option<Arc<Credential>>>);
impl CredentialSlot {
	/// Returns the cached credential, if any.
	pub fn load(&self) -> Option<Arc<Credential>> {
		self.0.read().clone()
	}

	/// Replaces the cached credential and returns the installed handle.
	pub fn install(&self, credential: Credential) -> Arc<Credential> {
		let credential = Arc::new(credential);

		*self.0.write() = Some(Arc::clone(&credential));

		credential
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn install_replaces_without_mutating_previous() {
		let slot = CredentialSlot::default();

		assert!(slot.load().is_none());

		let first = slot.install(Credential::new("first"));
		let second = slot.install(Credential::new("second"));

		assert_eq!(first.expose(), "first");
		assert_eq!(slot.load().map(|c| c.expose().to_owned()).as_deref(), Some("second"));
		assert!(!Arc::ptr_eq(&first, &second));
	}
}
