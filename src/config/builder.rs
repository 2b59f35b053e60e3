// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{AppId, CardId, TokenSecret},
	config::{CachePolicy, ClientConfig, Endpoints},
	error::ConfigError,
};

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Official Account `appid`.
	pub app_id: AppId,
	/// Official Account `secret`.
	pub app_secret: TokenSecret,
	/// Merchant identifier.
	pub merchant_id: Option<String>,
	/// Merchant API secret.
	pub merchant_secret: Option<TokenSecret>,
	/// Member card template identifier.
	pub member_card_id: Option<CardId>,
	/// Access token cache policy.
	pub cache_policy: CachePolicy,
	/// Trusted token address for the delegated policy.
	pub cache_address: Option<Url>,
	/// Autonomous refresh tick.
	pub refresh_interval: StdDuration,
	/// API host override.
	pub api_endpoint: Option<Url>,
	/// Authorization page host override.
	pub open_endpoint: Option<Url>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the app identity.
	pub fn new(app_id: AppId, app_secret: impl Into<String>) -> Self {
		Self {
			app_id,
			app_secret: TokenSecret::new(app_secret),
			merchant_id: None,
			merchant_secret: None,
			member_card_id: None,
			cache_policy: CachePolicy::default(),
			cache_address: None,
			refresh_interval: ClientConfig::DEFAULT_REFRESH_INTERVAL,
			api_endpoint: None,
			open_endpoint: None,
		}
	}

	/// Sets the merchant identity used by payment integrations.
	pub fn merchant(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
		self.merchant_id = Some(id.into());
		self.merchant_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Sets the member card template.
	pub fn member_card_id(mut self, card_id: CardId) -> Self {
		self.member_card_id = Some(card_id);

		self
	}

	/// Selects the access token cache policy.
	pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
		self.cache_policy = policy;

		self
	}

	/// Sets the trusted address used by [`CachePolicy::DelegatedHttp`].
	pub fn cache_address(mut self, address: Url) -> Self {
		self.cache_address = Some(address);

		self
	}

	/// Overrides the autonomous refresh tick (defaults to 30 seconds).
	pub fn refresh_interval(mut self, interval: StdDuration) -> Self {
		self.refresh_interval = interval;

		self
	}

	/// Points the client at a different API host.
	pub fn api_endpoint(mut self, url: Url) -> Self {
		self.api_endpoint = Some(url);

		self
	}

	/// Points the client at a different authorization page host.
	pub fn open_endpoint(mut self, url: Url) -> Self {
		self.open_endpoint = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		if self.refresh_interval.is_zero() {
			return Err(ConfigError::ZeroRefreshInterval);
		}

		let cache_address = match (self.cache_policy, self.cache_address) {
			(CachePolicy::DelegatedHttp, None) => return Err(ConfigError::MissingCacheAddress),
			(CachePolicy::DelegatedHttp, Some(address)) => {
				if !is_http(&address) {
					return Err(ConfigError::InvalidCacheAddress { url: address.to_string() });
				}

				Some(address)
			},
			(_, address) => address,
		};
		let endpoints = Endpoints {
			api: resolve_base("api", self.api_endpoint, Endpoints::DEFAULT_API)?,
			open: resolve_base("open", self.open_endpoint, Endpoints::DEFAULT_OPEN)?,
		};

		Ok(ClientConfig {
			app_id: self.app_id,
			app_secret: self.app_secret,
			merchant_id: self.merchant_id,
			merchant_secret: self.merchant_secret,
			member_card_id: self.member_card_id,
			cache_policy: self.cache_policy,
			cache_address,
			refresh_interval: self.refresh_interval,
			endpoints,
		})
	}
}

fn is_http(url: &Url) -> bool {
	matches!(url.scheme(), "http" | "https") && url.has_host()
}

fn resolve_base(
	name: &'static str,
	url: Option<Url>,
	default: &'static str,
) -> Result<Url, ConfigError> {
	let url = match url {
		Some(url) => url,
		None => Url::parse(default)
			.map_err(|_| ConfigError::InvalidEndpoint { endpoint: name, url: default.into() })?,
	};

	normalize_base(name, url)
}

// Relative paths join onto the base, so the base path must end with a slash.
fn normalize_base(name: &'static str, mut url: Url) -> Result<Url, ConfigError> {
	if !is_http(&url) || url.cannot_be_a_base() {
		return Err(ConfigError::InvalidEndpoint { endpoint: name, url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url.set_query(None);
	url.set_fragment(None);

	Ok(url)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn builder() -> ClientConfigBuilder {
		ClientConfig::builder(
			AppId::new("wx-test-app").expect("App fixture should be valid."),
			"app-secret",
		)
	}

	fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse.")
	}

	#[test]
	fn defaults_target_production_hosts() {
		let config = builder().build().expect("Default configuration should validate.");

		assert_eq!(config.cache_policy, CachePolicy::None);
		assert_eq!(config.refresh_interval, StdDuration::from_secs(30));
		assert_eq!(config.endpoints.api.as_str(), Endpoints::DEFAULT_API);
		assert_eq!(config.endpoints.open.as_str(), Endpoints::DEFAULT_OPEN);
		assert!(matches!(config.require_card_id(), Err(ConfigError::MissingCardId)));
	}

	#[test]
	fn delegated_policy_requires_http_address() {
		let err = builder()
			.cache_policy(CachePolicy::DelegatedHttp)
			.build()
			.expect_err("Delegated policy without an address should fail.");

		assert!(matches!(err, ConfigError::MissingCacheAddress));

		let err = builder()
			.cache_policy(CachePolicy::DelegatedHttp)
			.cache_address(url("ftp://tokens.internal/"))
			.build()
			.expect_err("Non-http cache address should fail.");

		assert!(matches!(err, ConfigError::InvalidCacheAddress { .. }));

		let config = builder()
			.cache_policy(CachePolicy::DelegatedHttp)
			.cache_address(url("http://tokens.internal/access_token"))
			.build()
			.expect("Delegated policy with an http address should validate.");

		assert_eq!(
			config.cache_address.as_ref().map(Url::as_str),
			Some("http://tokens.internal/access_token")
		);
	}

	#[test]
	fn endpoints_gain_trailing_slash_and_reject_other_schemes() {
		let config = builder()
			.api_endpoint(url("http://127.0.0.1:8080/mock?x=1"))
			.build()
			.expect("Mock endpoint should validate.");

		assert_eq!(config.endpoints.api.as_str(), "http://127.0.0.1:8080/mock/");

		let err = builder()
			.open_endpoint(url("mailto:ops@example.com"))
			.build()
			.expect_err("Non-http endpoint should fail.");

		assert!(matches!(err, ConfigError::InvalidEndpoint { endpoint: "open", .. }));
	}

	#[test]
	fn zero_refresh_interval_is_rejected() {
		let err = builder()
			.cache_policy(CachePolicy::Autonomous)
			.refresh_interval(StdDuration::ZERO)
			.build()
			.expect_err("Zero tick should fail.");

		assert!(matches!(err, ConfigError::ZeroRefreshInterval));
	}

	#[test]
	fn config_deserializes_from_labels() {
		let config: ClientConfig = serde_json::from_value(serde_json::json!({
			"app_id": "wx-json-app",
			"app_secret": "json-secret",
			"merchant_id": null,
			"merchant_secret": null,
			"member_card_id": "pCardFromJson",
			"cache_policy": "autonomy",
			"cache_address": null,
			"refresh_interval": { "secs": 45, "nanos": 0 },
			"endpoints": {
				"api": "https://api.weixin.qq.com/",
				"open": "https://open.weixin.qq.com/"
			}
		}))
		.expect("Configuration should deserialize.");

		assert_eq!(config.cache_policy, CachePolicy::Autonomous);
		assert_eq!(config.refresh_interval, StdDuration::from_secs(45));
		assert_eq!(config.app_secret.expose(), "json-secret");
		assert_eq!(
			config.require_card_id().map(|card| card.to_string()).ok(),
			Some("pCardFromJson".into())
		);
	}

	#[test]
	fn deserialization_applies_builder_validation() {
		let base = serde_json::json!({
			"app_id": "wx-json-app",
			"app_secret": "json-secret",
			"cache_policy": "autonomy",
		});
		let with = |key: &str, value: serde_json::Value| {
			let mut config = base.clone();

			config[key] = value;

			serde_json::from_value::<ClientConfig>(config)
		};
		let err = with("refresh_interval", serde_json::json!({ "secs": 0, "nanos": 0 }))
			.expect_err("Zero tick should be rejected while deserializing.");

		assert!(err.to_string().contains("greater than zero"));

		let err = with("cache_policy", serde_json::json!("http"))
			.expect_err("Delegated policy without an address should be rejected.");

		assert!(err.to_string().contains("requires a cache address"));

		let config = with(
			"endpoints",
			serde_json::json!({
				"api": "https://api.weixin.qq.com/sub",
				"open": "https://open.weixin.qq.com/"
			}),
		)
		.expect("Endpoints without a trailing slash should be normalized.");

		assert_eq!(config.endpoints.api.as_str(), "https://api.weixin.qq.com/sub/");
		assert_eq!(config.refresh_interval, ClientConfig::DEFAULT_REFRESH_INTERVAL);
	}
}
