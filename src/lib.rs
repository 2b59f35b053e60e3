//! WeChat Official Account client with a self-healing access-token cache, a uniform
//! `errcode` envelope pipeline, web-authorization login, and member-card normalization.
//!
//! Start from [`config::ClientConfig::builder`], then construct an [`flows::ApiClient`].
//! Every privileged call borrows the account-level access token from the
//! [`cache::CredentialManager`] and retries once after a forced refresh when the upstream
//! reports the token as invalid.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod card;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod flows;
pub mod http;
pub mod notify;
pub mod obs;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests that drive the client against a mock
	//! upstream.

	pub use crate::_prelude::*;

	// std
	use std::time::Duration as StdDuration;
	// self
	use crate::{
		auth::{AppId, CardId},
		config::{ClientConfig, ClientConfigBuilder},
		dispatch::{Dispatcher, ReqwestTransportErrorMapper},
		error::ConfigError,
		flows::ReqwestApiClient,
		http::ReqwestHttpClient,
	};

	/// App identifier used by test configurations.
	pub const TEST_APP_ID: &str = "wx-test-app";
	/// App secret used by test configurations.
	pub const TEST_APP_SECRET: &str = "test-app-secret";
	/// Member card identifier used by test configurations.
	pub const TEST_CARD_ID: &str = "pTestMemberCard";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> Result<ReqwestHttpClient> {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.build()
			.map_err(ConfigError::from)?;

		Ok(ReqwestHttpClient::with_client(client))
	}

	/// Returns a configuration builder whose API and authorization hosts point at `base`.
	///
	/// The refresh tick is one hour so background ticks never interfere with a test unless
	/// it overrides the interval.
	pub fn mock_config_builder(base: &str) -> Result<ClientConfigBuilder> {
		let url = Url::parse(base)
			.map_err(|_| ConfigError::InvalidEndpoint { endpoint: "api", url: base.into() })?;
		let app_id = AppId::new(TEST_APP_ID).map_err(ConfigError::from)?;
		let card_id = CardId::new(TEST_CARD_ID).map_err(ConfigError::from)?;

		Ok(ClientConfig::builder(app_id, TEST_APP_SECRET)
			.member_card_id(card_id)
			.api_endpoint(url.clone())
			.open_endpoint(url)
			.refresh_interval(StdDuration::from_secs(3_600)))
	}

	/// Builds a dispatcher for `config` on the test transport.
	pub fn test_dispatcher(
		config: &ClientConfig,
	) -> Result<Dispatcher<ReqwestHttpClient, ReqwestTransportErrorMapper>> {
		Ok(Dispatcher::new(
			config.endpoints.api.clone(),
			test_reqwest_http_client()?,
			ReqwestTransportErrorMapper,
		))
	}

	/// Constructs an [`ReqwestApiClient`] on the test transport.
	pub async fn build_reqwest_test_client(config: ClientConfig) -> Result<ReqwestApiClient> {
		ReqwestApiClient::with_http_client(config, test_reqwest_http_client()?, ReqwestTransportErrorMapper)
			.await
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use oauth2;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
