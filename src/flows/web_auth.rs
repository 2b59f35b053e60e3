//! Web-authorization login: redirect link construction and the code exchange.
//!
//! The exchange uses a per-login token issued by `sns/oauth2/access_token`, never the
//! account-level access token, so it does not touch the credential manager.

// self
use crate::{
	_prelude::*,
	auth::{AppId, OpenId, TokenSecret},
	card::Gender,
	dispatch::TransportErrorMapper,
	error::ConfigError,
	flows::{ApiClient, common},
	http::ApiHttpClient,
	obs::{self, FlowKind},
};

const AUTHORIZE_PATH: &str = "connect/oauth2/authorize";
const EXCHANGE_PATH: &str = "sns/oauth2/access_token";
const PROFILE_PATH: &str = "sns/userinfo";
const AUTHORIZE_SCOPE: &str = "snsapi_userinfo";
const AUTHORIZE_FRAGMENT: &str = "wechat_redirect";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginToken {
	access_token: String,
	openid: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebProfileWire {
	openid: String,
	unionid: String,
	nickname: String,
	sex: i64,
	province: String,
	city: String,
	country: String,
	headimgurl: String,
}

/// Profile returned by a completed web-authorization login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthorizedUser {
	/// Per-account user identifier handed back to the embedding web layer.
	pub open_id: OpenId,
	/// Cross-account identifier, when the account is bound to an open platform.
	pub union_id: Option<String>,
	/// Display name.
	pub nickname: String,
	/// Gender derived from the numeric sex code.
	pub sex: Gender,
	/// Province.
	pub province: String,
	/// City.
	pub city: String,
	/// Country.
	pub country: String,
	/// Avatar URL.
	pub avatar_url: String,
}

/// Builds the authorization page URL that redirects to `landing?from={from}` after consent.
///
/// Pure string construction; the redirect target is form-encoded so the upstream hands it
/// back verbatim.
pub fn authorization_link(open: &Url, app_id: &AppId, landing: &str, from: &str) -> Result<Url> {
	let mut url = open
		.join(AUTHORIZE_PATH)
		.map_err(|source| ConfigError::InvalidPath { path: AUTHORIZE_PATH.into(), source })?;

	url.query_pairs_mut()
		.append_pair("appid", app_id.as_ref())
		.append_pair("redirect_uri", &format!("{landing}?from={from}"))
		.append_pair("response_type", "code")
		.append_pair("scope", AUTHORIZE_SCOPE);
	url.set_fragment(Some(AUTHORIZE_FRAGMENT));

	Ok(url)
}

impl<C, M> ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the authorization link for this client's app; see [`authorization_link`].
	pub fn authorization_link(&self, landing: &str, from: &str) -> Result<Url> {
		let config = self.config();

		authorization_link(&config.endpoints.open, &config.app_id, landing, from)
	}

	/// Exchanges a login `code` for the user's profile.
	///
	/// A non-zero `errcode` from the exchange stops before the profile fetch. An exchange
	/// that succeeds without a token or `openid` fails with [`Error::ExchangeFailed`].
	pub async fn exchange_code_for_user(&self, code: &str) -> Result<AuthorizedUser> {
		obs::observe(FlowKind::WebAuthorization, "exchange_code_for_user", async {
			let config = self.config();
			let login = self.exchange_code(&config.app_id, &config.app_secret, code).await?;
			let profile: WebProfileWire = self
				.dispatcher()
				.get(
					PROFILE_PATH,
					&[
						("access_token", login.access_token.as_str()),
						("openid", login.openid.as_str()),
						("lang", "zh_CN"),
					],
				)
				.await?;
			let open_id = if profile.openid.is_empty() {
				common::parse_open_id(&login.openid)?
			} else {
				common::parse_open_id(&profile.openid)?
			};

			Ok(AuthorizedUser {
				open_id,
				union_id: (!profile.unionid.is_empty()).then_some(profile.unionid),
				nickname: profile.nickname,
				sex: Gender::from_sex_code(profile.sex),
				province: profile.province,
				city: profile.city,
				country: profile.country,
				avatar_url: profile.headimgurl,
			})
		})
		.await
	}

	async fn exchange_code(
		&self,
		app_id: &AppId,
		app_secret: &TokenSecret,
		code: &str,
	) -> Result<LoginToken> {
		let login: LoginToken = self
			.dispatcher()
			.get(
				EXCHANGE_PATH,
				&[
					("appid", app_id.as_ref()),
					("secret", app_secret.expose()),
					("code", code),
					("grant_type", "authorization_code"),
				],
			)
			.await?;

		if login.access_token.is_empty() {
			return Err(Error::ExchangeFailed {
				reason: "code exchange returned an empty access_token".into(),
			});
		}
		if login.openid.is_empty() {
			return Err(Error::ExchangeFailed {
				reason: "code exchange returned an empty openid".into(),
			});
		}

		Ok(login)
	}
}
