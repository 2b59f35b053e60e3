//! High-level API operations served by [`ApiClient`].

pub mod card_member;
pub mod common;
pub mod user;
pub mod web_auth;

pub use card_member::*;
pub use user::*;
pub use web_auth::*;

// self
use crate::{
	_prelude::*,
	cache::CredentialManager,
	config::ClientConfig,
	dispatch::{Dispatcher, TransportErrorMapper},
	http::ApiHttpClient,
	obs,
};
#[cfg(feature = "reqwest")]
use crate::{dispatch::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Long-lived handle to one Official Account.
///
/// The client owns the immutable configuration, the request [`Dispatcher`], and the
/// [`CredentialManager`]. Clones share all three, so one client serves every task in the
/// process. Under [`CachePolicy::Autonomous`](crate::config::CachePolicy::Autonomous) the
/// credential manager runs a background refresh task until [`ApiClient::shutdown`] is
/// awaited or the last clone is dropped.
#[derive(Clone)]
pub struct ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Arc<ClientConfig>,
	dispatcher: Arc<Dispatcher<C, M>>,
	credentials: Arc<CredentialManager<C, M>>,
}
impl<C, M> ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	///
	/// Under the autonomous policy this spawns the refresh task on the ambient Tokio
	/// runtime and makes one best-effort attempt to fill the credential slot before
	/// returning; a failed attempt is logged and retried on the next tick.
	pub async fn with_http_client(
		config: ClientConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let dispatcher =
			Arc::new(Dispatcher::new(config.endpoints.api.clone(), http_client, mapper));
		let credentials = Arc::new(CredentialManager::new(&config, Arc::clone(&dispatcher)));

		obs::record_cache_policy(config.cache_policy);

		if config.cache_policy.is_autonomous() {
			credentials.start()?;
			credentials.revalidate().await?;
		}

		Ok(Self { config: Arc::new(config), dispatcher, credentials })
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Request pipeline bound to the API host.
	pub fn dispatcher(&self) -> &Dispatcher<C, M> {
		&self.dispatcher
	}

	/// Access token manager.
	pub fn credentials(&self) -> &CredentialManager<C, M> {
		&self.credentials
	}

	/// Stops the background refresh task and waits for it to exit.
	///
	/// The cached credential stays readable afterwards; it is simply no longer kept fresh.
	pub async fn shutdown(&self) {
		self.credentials.shutdown().await;
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client backed by a default reqwest transport.
	pub async fn new(config: ClientConfig) -> Result<Self> {
		Self::with_http_client(config, ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
			.await
	}
}
impl<C, M> Debug for ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("app_id", &self.config.app_id)
			.field("cache_policy", &self.config.cache_policy)
			.field("api", &self.dispatcher.base().as_str())
			.finish()
	}
}
