//! Shared helpers for operations that run under the account-level access token.

// self
use crate::{
	_prelude::*,
	auth::{Credential, OpenId},
	dispatch::TransportErrorMapper,
	flows::ApiClient,
	http::ApiHttpClient,
};

impl<C, M> ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Runs `op` with the current access token, retrying once after a forced refresh when
	/// the upstream rejects the token itself.
	///
	/// The retry only happens under the autonomous policy; other policies surface the
	/// original error. A refresh failure is returned instead of the first error.
	pub async fn with_credential<T, F, Fut>(&self, mut op: F) -> Result<T>
	where
		F: FnMut(Arc<Credential>) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let credential = self.credentials().current()?;

		match op(Arc::clone(&credential)).await {
			Err(err) if err.is_credential_invalid() && self.credentials().policy().is_autonomous() => {
				let fresh = self.credentials().refresh_after(Some(&credential)).await?;

				op(fresh).await
			},
			result => result,
		}
	}
}

/// Builds the error used when an upstream field violates a local invariant.
pub(crate) fn malformed(reason: impl Into<String>) -> Error {
	Error::MalformedResponse { reason: reason.into() }
}

/// Validates an `openid` returned by the upstream.
pub(crate) fn parse_open_id(raw: &str) -> Result<OpenId> {
	OpenId::new(raw).map_err(|err| malformed(format!("invalid openid: {err}")))
}
