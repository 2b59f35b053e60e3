//! Account-level user profile lookup (`cgi-bin/user/info`).

// self
use crate::{
	_prelude::*,
	auth::OpenId,
	card::Gender,
	dispatch::TransportErrorMapper,
	flows::{ApiClient, common},
	http::ApiHttpClient,
	obs::{self, FlowKind},
};

const USER_INFO_PATH: &str = "cgi-bin/user/info";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserInfoWire {
	subscribe: i64,
	openid: String,
	nickname: String,
	sex: i64,
	language: String,
	city: String,
	province: String,
	country: String,
	headimgurl: String,
	subscribe_time: i64,
	unionid: String,
	remark: String,
	groupid: i64,
	tagid_list: Vec<i64>,
}

/// Basic profile of a user relative to this Official Account.
///
/// Users who do not follow the account only carry `subscribed == false` and their
/// `open_id`; every other field is empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserProfile {
	/// Whether the user follows the account.
	pub subscribed: bool,
	/// Per-account user identifier.
	pub open_id: OpenId,
	/// Display name.
	pub nickname: String,
	/// Gender derived from the numeric sex code.
	pub sex: Gender,
	/// Client language, e.g. `zh_CN`.
	pub language: String,
	/// City.
	pub city: String,
	/// Province.
	pub province: String,
	/// Country.
	pub country: String,
	/// Avatar URL; empty when the user has none.
	pub avatar_url: String,
	/// Most recent follow time.
	pub subscribed_at: Option<OffsetDateTime>,
	/// Cross-account identifier, present once the account is bound to an open platform.
	pub union_id: Option<String>,
	/// Operator remark.
	pub remark: String,
	/// Legacy group identifier.
	pub group_id: i64,
	/// Tag identifiers.
	pub tag_ids: Vec<i64>,
}
impl UserProfile {
	fn from_wire(wire: UserInfoWire, requested: &OpenId) -> Result<Self> {
		let open_id = if wire.openid.is_empty() {
			requested.clone()
		} else {
			common::parse_open_id(&wire.openid)?
		};
		let subscribed_at = (wire.subscribe_time > 0)
			.then(|| OffsetDateTime::from_unix_timestamp(wire.subscribe_time).ok())
			.flatten();

		Ok(Self {
			subscribed: wire.subscribe == 1,
			open_id,
			nickname: wire.nickname,
			sex: Gender::from_sex_code(wire.sex),
			language: wire.language,
			city: wire.city,
			province: wire.province,
			country: wire.country,
			avatar_url: wire.headimgurl,
			subscribed_at,
			union_id: (!wire.unionid.is_empty()).then_some(wire.unionid),
			remark: wire.remark,
			group_id: wire.groupid,
			tag_ids: wire.tagid_list,
		})
	}
}

impl<C, M> ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Fetches the profile of `open_id` using the account-level access token.
	pub async fn user_info(&self, open_id: &OpenId) -> Result<UserProfile> {
		obs::observe(FlowKind::UserInfo, "user_info", async {
			let wire: UserInfoWire = self
				.with_credential(move |credential| async move {
					self.dispatcher()
						.get(
							USER_INFO_PATH,
							&[
								("access_token", credential.expose()),
								("openid", open_id.as_ref()),
								("lang", "zh_CN"),
							],
						)
						.await
				})
				.await?;

			UserProfile::from_wire(wire, open_id)
		})
		.await
	}
}
