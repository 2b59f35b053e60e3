//! Access token lifecycle with policy-driven ownership, indirect verification, and a
//! cancellable self-healing refresh task.
//!
//! The WeChat API has no endpoint that answers "is this access token still valid", so
//! [`CredentialManager::verify`] calls `cgi-bin/getcallbackip`, a side-effect-free
//! privileged endpoint, and treats any rejection as invalidity. Under
//! [`CachePolicy::Autonomous`] a background [`RefreshTask`](task::RefreshTask) runs that
//! probe on every tick and swaps in a freshly issued credential when it fails. Refresh
//! failures are logged and swallowed: the previous credential stays in place and the next
//! tick tries again. Readers never wait on a refresh; [`CredentialManager::current`]
//! returns whatever the slot holds.
//!
//! Issuance is single-flighted through an async mutex so a background tick and a
//! call-site forced refresh never hit `cgi-bin/token` at the same time.

mod metrics;
mod slot;
mod task;

pub use metrics::RefreshMetrics;
pub use slot::CredentialSlot;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{AppId, Credential, TokenSecret},
	cache::task::RefreshTask,
	config::{CachePolicy, ClientConfig},
	dispatch::{Dispatcher, TransportErrorMapper},
	error::ConfigError,
	http::ApiHttpClient,
	obs::{self, FlowKind},
};

const TOKEN_PATH: &str = "cgi-bin/token";
const VERIFY_PATH: &str = "cgi-bin/getcallbackip";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IssuedToken {
	access_token: String,
	expires_in: i64,
}

/// Owns the account-level access token for one client.
pub struct CredentialManager<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	policy: CachePolicy,
	app_id: AppId,
	app_secret: TokenSecret,
	refresh_interval: StdDuration,
	dispatcher: Arc<Dispatcher<C, M>>,
	slot: CredentialSlot,
	refresh_guard: AsyncMutex<()>,
	metrics: RefreshMetrics,
	task: Mutex<Option<RefreshTask>>,
}
impl<C, M> CredentialManager<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an idle manager; no request is sent until a refresh is requested.
	pub fn new(config: &ClientConfig, dispatcher: Arc<Dispatcher<C, M>>) -> Self {
		Self {
			policy: config.cache_policy,
			app_id: config.app_id.clone(),
			app_secret: config.app_secret.clone(),
			refresh_interval: config.refresh_interval,
			dispatcher,
			slot: CredentialSlot::default(),
			refresh_guard: AsyncMutex::new(()),
			metrics: RefreshMetrics::default(),
			task: Mutex::new(None),
		}
	}

	/// Policy this manager was constructed with.
	pub fn policy(&self) -> CachePolicy {
		self.policy
	}

	/// Counters describing refresh and verification activity.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns the cached credential without waiting on any in-flight refresh.
	///
	/// The value may be stale by up to one refresh tick. Only a slot that has never been
	/// filled is reported as [`Error::CredentialUnavailable`].
	pub fn current(&self) -> Result<Arc<Credential>> {
		self.ensure_autonomous()?;
		self.slot.load().ok_or(Error::CredentialUnavailable)
	}

	/// Forces a single-flight refresh and returns the installed credential.
	pub async fn refresh_now(&self) -> Result<Arc<Credential>> {
		self.ensure_autonomous()?;

		let _singleflight = self.refresh_guard.lock().await;

		self.issue().await
	}

	/// Refreshes only when `stale` is still the cached credential.
	///
	/// Concurrent callers that observed the same rejected credential trigger one
	/// issuance between them; later callers receive the credential the first one
	/// installed.
	pub async fn refresh_after(&self, stale: Option<&Arc<Credential>>) -> Result<Arc<Credential>> {
		self.ensure_autonomous()?;

		let _singleflight = self.refresh_guard.lock().await;

		match (self.slot.load(), stale) {
			(Some(cached), Some(stale)) if !Arc::ptr_eq(&cached, stale) => Ok(cached),
			(Some(cached), None) => Ok(cached),
			_ => self.issue().await,
		}
	}

	/// Probes `credential` against a privileged endpoint that is always callable.
	///
	/// Any failure, whether transport or an upstream rejection, counts as invalid.
	pub async fn verify(&self, credential: &Credential) -> bool {
		self.metrics.record_verification();

		let probe = obs::observe(
			FlowKind::CredentialVerify,
			"verify",
			self.dispatcher.get::<serde_json::Value>(
				VERIFY_PATH,
				&[("access_token", credential.expose())],
			),
		)
		.await;

		match probe {
			Ok(_) => true,
			Err(err) => {
				self.metrics.record_rejected_verification();
				obs::record_verification_rejected(&err);

				false
			},
		}
	}

	/// Runs one verify-and-refresh cycle.
	///
	/// Refresh failures are logged and swallowed; only a policy mismatch is returned.
	pub async fn revalidate(&self) -> Result<()> {
		self.ensure_autonomous()?;

		let cached = self.slot.load();

		if let Some(credential) = &cached
			&& self.verify(credential).await
		{
			return Ok(());
		}

		let _ = self.refresh_after(cached.as_ref()).await;

		Ok(())
	}

	/// Spawns the periodic revalidation task on the ambient Tokio runtime.
	///
	/// Does nothing for policies that do not own freshness.
	pub(crate) fn start(self: &Arc<Self>) -> Result<()> {
		if !self.policy.is_autonomous() {
			return Ok(());
		}
		// `ClientConfig` fields are public, so a literal can skip the builder.
		if self.refresh_interval.is_zero() {
			return Err(ConfigError::ZeroRefreshInterval.into());
		}

		let runtime =
			tokio::runtime::Handle::try_current().map_err(|_| ConfigError::MissingRuntime)?;
		let manager = Arc::downgrade(self);
		let task = RefreshTask::spawn(&runtime, self.refresh_interval, move || {
			manager.upgrade().map(|manager| async move {
				let _ = manager.revalidate().await;
			})
		});

		if let Some(previous) = self.task.lock().replace(task) {
			previous.cancel();
		}

		Ok(())
	}

	/// Cancels the periodic task and waits for it to finish.
	pub async fn shutdown(&self) {
		let task = self.task.lock().take();

		if let Some(task) = task {
			task.shutdown().await;
		}
	}

	/// Returns `true` while a periodic task is installed and still running.
	pub fn is_running(&self) -> bool {
		self.task.lock().as_ref().is_some_and(RefreshTask::is_running)
	}

	fn ensure_autonomous(&self) -> Result<()> {
		match self.policy {
			CachePolicy::Autonomous => Ok(()),
			CachePolicy::None => Err(Error::NotConfigured),
			CachePolicy::DelegatedHttp => Err(Error::NotImplemented { policy: self.policy.as_str() }),
		}
	}

	// Callers must hold `refresh_guard`.
	async fn issue(&self) -> Result<Arc<Credential>> {
		self.metrics.record_attempt();

		let issued = obs::observe(FlowKind::CredentialRefresh, "issue", async {
			let token = self
				.dispatcher
				.get::<IssuedToken>(
					TOKEN_PATH,
					&[
						("grant_type", "client_credential"),
						("appid", self.app_id.as_ref()),
						("secret", self.app_secret.expose()),
					],
				)
				.await?;

			if token.access_token.is_empty() {
				return Err(Error::EmptyCredential);
			}

			Ok(Credential::new(token.access_token)
				.with_expires_in(Duration::seconds(token.expires_in)))
		})
		.await;

		match issued {
			Ok(credential) => {
				let installed = self.slot.install(credential);

				self.metrics.record_success();
				obs::record_credential_refreshed(installed.expires_at);

				Ok(installed)
			},
			Err(err) => {
				self.metrics.record_failure();
				obs::record_refresh_failure(&err);

				Err(err)
			},
		}
	}

	#[cfg(test)]
	pub(crate) fn install(&self, credential: Credential) -> Arc<Credential> {
		self.slot.install(credential)
	}
}
impl<C, M> Debug for CredentialManager<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialManager")
			.field("policy", &self.policy)
			.field("app_id", &self.app_id)
			.field("refresh_interval", &self.refresh_interval)
			.field("metrics", &self.metrics)
			.finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use httpmock::prelude::*;
	// self
	use super::*;
	use crate::{
		_preludet::*,
		dispatch::ReqwestTransportErrorMapper,
		http::ReqwestHttpClient,
	};

	type TestManager = CredentialManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	fn manager(server: &MockServer, policy: CachePolicy) -> TestManager {
		let config = mock_config_builder(&server.base_url())
			.expect("Mock configuration builder should be created.")
			.cache_policy(policy)
			.build()
			.expect("Mock configuration should build.");
		let dispatcher = Arc::new(test_dispatcher(&config).expect("Test dispatcher should build."));

		CredentialManager::new(&config, dispatcher)
	}

	#[tokio::test]
	async fn none_policy_never_holds_a_credential() {
		let server = MockServer::start_async().await;
		let manager = manager(&server, CachePolicy::None);

		assert!(matches!(manager.current(), Err(Error::NotConfigured)));
		assert!(matches!(manager.refresh_now().await, Err(Error::NotConfigured)));
		assert!(matches!(manager.revalidate().await, Err(Error::NotConfigured)));
	}

	#[tokio::test]
	async fn empty_slot_is_unavailable() {
		let server = MockServer::start_async().await;
		let manager = manager(&server, CachePolicy::Autonomous);

		assert!(matches!(manager.current(), Err(Error::CredentialUnavailable)));
	}

	#[tokio::test]
	async fn refresh_after_skips_when_slot_already_moved() {
		let server = MockServer::start_async().await;
		let token = server
			.mock_async(|when, then| {
				when.method(GET).path("/cgi-bin/token");
				then.status(200)
					.header("content-type", "application/json")
					.body(r#"{"access_token":"fresh","expires_in":7200}"#);
			})
			.await;
		let manager = manager(&server, CachePolicy::Autonomous);
		let stale = manager.install(Credential::new("stale"));
		let newer = manager.install(Credential::new("newer"));
		let kept = manager
			.refresh_after(Some(&stale))
			.await
			.expect("A moved slot should be returned as-is.");

		assert!(Arc::ptr_eq(&kept, &newer));
		token.assert_calls_async(0).await;

		let fresh = manager
			.refresh_after(Some(&newer))
			.await
			.expect("Matching stale credential should trigger issuance.");

		assert_eq!(fresh.expose(), "fresh");
		token.assert_calls_async(1).await;
	}

	#[tokio::test]
	async fn zero_interval_refuses_to_start() {
		let server = MockServer::start_async().await;
		let mut config = mock_config_builder(&server.base_url())
			.expect("Mock configuration builder should be created.")
			.cache_policy(CachePolicy::Autonomous)
			.build()
			.expect("Mock configuration should build.");

		config.refresh_interval = StdDuration::ZERO;

		let dispatcher = Arc::new(test_dispatcher(&config).expect("Test dispatcher should build."));
		let manager = Arc::new(CredentialManager::new(&config, dispatcher));
		let err = manager.start().expect_err("Zero tick should not spawn a task.");

		assert!(matches!(err, Error::Config(ConfigError::ZeroRefreshInterval)));
		assert!(!manager.is_running());
	}
}
