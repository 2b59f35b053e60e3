//! Client configuration: app identity, cache policy, and upstream endpoints.
//!
//! Everything here is supplied once at construction and is immutable afterwards.
//! [`ClientConfig::builder`] validates cross-field rules (the delegated cache policy
//! needs a trusted http(s) address, the refresh tick must be positive, endpoints must
//! be absolute http(s) URLs) so the rest of the client can rely on them.

/// Builder API for assembling client configuration.
pub mod builder;
/// Access token cache policies.
pub mod policy;

pub use builder::*;
pub use policy::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{AppId, CardId, TokenSecret},
	error::ConfigError,
};

/// Upstream base URLs every relative request path resolves against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
	/// Official Account API host (`https://api.weixin.qq.com/`).
	pub api: Url,
	/// Authorization page host (`https://open.weixin.qq.com/`).
	pub open: Url,
}
impl Endpoints {
	/// Production API host.
	pub const DEFAULT_API: &'static str = "https://api.weixin.qq.com/";
	/// Production authorization page host.
	pub const DEFAULT_OPEN: &'static str = "https://open.weixin.qq.com/";
}

/// Immutable configuration consumed by [`ApiClient`](crate::flows::ApiClient).
///
/// Deserialization runs the same validation as [`ClientConfigBuilder::build`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
	/// Official Account `appid`.
	pub app_id: AppId,
	/// Official Account `secret`.
	pub app_secret: TokenSecret,
	/// Merchant identifier for payment integrations.
	pub merchant_id: Option<String>,
	/// Merchant API secret for payment integrations.
	pub merchant_secret: Option<TokenSecret>,
	/// Member card template used by card membership flows.
	pub member_card_id: Option<CardId>,
	/// Who owns access token freshness.
	pub cache_policy: CachePolicy,
	/// Trusted address that serves access tokens under [`CachePolicy::DelegatedHttp`].
	pub cache_address: Option<Url>,
	/// Tick of the autonomous verify-and-refresh cycle.
	pub refresh_interval: StdDuration,
	/// Upstream hosts.
	pub endpoints: Endpoints,
}
impl ClientConfig {
	/// Default tick of the autonomous verify-and-refresh cycle.
	pub const DEFAULT_REFRESH_INTERVAL: StdDuration = StdDuration::from_secs(30);

	/// Creates a new builder for the provided app identity.
	pub fn builder(app_id: AppId, app_secret: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(app_id, app_secret)
	}

	/// Returns the configured member card or [`ConfigError::MissingCardId`].
	pub fn require_card_id(&self) -> Result<&CardId, ConfigError> {
		self.member_card_id.as_ref().ok_or(ConfigError::MissingCardId)
	}
}
impl<'de> Deserialize<'de> for ClientConfig {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		RawClientConfig::deserialize(deserializer)?.validate().map_err(serde::de::Error::custom)
	}
}

// Unvalidated wire shape; always funneled through the builder.
#[derive(Deserialize)]
struct RawClientConfig {
	app_id: AppId,
	app_secret: TokenSecret,
	#[serde(default)]
	merchant_id: Option<String>,
	#[serde(default)]
	merchant_secret: Option<TokenSecret>,
	#[serde(default)]
	member_card_id: Option<CardId>,
	#[serde(default)]
	cache_policy: CachePolicy,
	#[serde(default)]
	cache_address: Option<Url>,
	#[serde(default = "default_refresh_interval")]
	refresh_interval: StdDuration,
	#[serde(default)]
	endpoints: Option<Endpoints>,
}
impl RawClientConfig {
	fn validate(self) -> Result<ClientConfig, ConfigError> {
		let (api_endpoint, open_endpoint) = match self.endpoints {
			Some(endpoints) => (Some(endpoints.api), Some(endpoints.open)),
			None => (None, None),
		};

		ClientConfigBuilder {
			app_id: self.app_id,
			app_secret: self.app_secret,
			merchant_id: self.merchant_id,
			merchant_secret: self.merchant_secret,
			member_card_id: self.member_card_id,
			cache_policy: self.cache_policy,
			cache_address: self.cache_address,
			refresh_interval: self.refresh_interval,
			api_endpoint,
			open_endpoint,
		}
		.build()
	}
}

fn default_refresh_interval() -> StdDuration {
	ClientConfig::DEFAULT_REFRESH_INTERVAL
}
