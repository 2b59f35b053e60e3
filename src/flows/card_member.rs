//! Member card lookups and one-click activation.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{CardId, OpenId},
	card::{self, CardField, MemberCardStatus, MemberIdentity, MembershipRecord},
	dispatch::TransportErrorMapper,
	flows::{ApiClient, common},
	http::ApiHttpClient,
	obs::{self, FlowKind},
};

const MEMBER_INFO_PATH: &str = "card/membercard/userinfo/get";
const USER_CARDS_PATH: &str = "card/user/getcardlist";
const ACTIVATION_FORM_PATH: &str = "card/membercard/activatetempinfo/get";
const DECRYPT_CODE_PATH: &str = "card/code/decrypt";
const ACTIVATE_PATH: &str = "card/membercard/activate";

#[derive(Debug, Serialize)]
struct CardCodeBody<'a> {
	card_id: &'a str,
	code: &'a str,
}

#[derive(Debug, Serialize)]
struct UserCardsBody<'a> {
	card_id: &'a str,
	openid: &'a str,
}

#[derive(Debug, Serialize)]
struct ActivationFormBody<'a> {
	activate_ticket: &'a str,
}

#[derive(Debug, Serialize)]
struct DecryptBody<'a> {
	encrypt_code: &'a str,
}

#[derive(Debug, Serialize)]
struct ActivateBody<'a> {
	membership_number: &'a str,
	code: &'a str,
	card_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FieldLists {
	common_field_list: Vec<CardField>,
	custom_field_list: Vec<CardField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemberInfoWire {
	openid: String,
	nickname: String,
	user_info: FieldLists,
	user_card_status: String,
	has_active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserCardsWire {
	card_list: Vec<UserCardWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserCardWire {
	card_id: String,
	code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActivationFormWire {
	info: FieldLists,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DecryptedCode {
	code: String,
}

/// Parameters WeChat appends to the post-submit jump of a one-click activation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ActivationRequest {
	/// Encrypted card number (`encrypt_code`).
	pub encrypt_code: String,
	/// Card holder.
	pub open_id: OpenId,
	/// Ticket that unlocks the submitted form (`activate_ticket`).
	pub activate_ticket: String,
}

impl<C, M> ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Loads the member behind `card_code` on the configured member card.
	///
	/// Fails with [`Error::CardNotActivated`] when the card was claimed but never activated.
	pub async fn member_by_code(&self, card_code: &str) -> Result<MembershipRecord> {
		obs::observe(FlowKind::CardMember, "member_by_code", async {
			let card_id = self.config().require_card_id()?;
			let body = CardCodeBody { card_id: card_id.as_ref(), code: card_code };
			let member: MemberInfoWire = self.post_with_credential(MEMBER_INFO_PATH, &body).await?;

			if !member.has_active {
				return Err(Error::CardNotActivated);
			}

			let identity = MemberIdentity {
				card_id: card_id.clone(),
				open_id: common::parse_open_id(&member.openid)?,
				union_id: String::new(),
				card_code: card_code.to_owned(),
				nickname: member.nickname,
				status: MemberCardStatus::from_label(&member.user_card_status),
			};

			Ok(card::normalize(
				identity,
				&member.user_info.common_field_list,
				&member.user_info.custom_field_list,
			))
		})
		.await
	}

	/// Finds the configured member card among the cards `open_id` holds and loads it.
	///
	/// Card identifiers are compared case-insensitively.
	pub async fn member_by_open_id(&self, open_id: &OpenId) -> Result<MembershipRecord> {
		let card_id = self.config().require_card_id()?;
		let body = UserCardsBody { card_id: card_id.as_ref(), openid: open_id.as_ref() };
		let cards: UserCardsWire = obs::observe(
			FlowKind::CardMember,
			"member_by_open_id",
			self.post_with_credential(USER_CARDS_PATH, &body),
		)
		.await?;
		let code = find_member_code(card_id, open_id, cards.card_list)?;

		self.member_by_code(&code).await
	}

	/// Completes a one-click activation and returns the new member's record.
	///
	/// Reads the submitted form, decrypts the card number, activates the card, then loads
	/// the user's profile. Any failing step stops the sequence. The record's gender comes
	/// from the form, falling back to the profile's sex code.
	pub async fn activate_member(&self, request: &ActivationRequest) -> Result<MembershipRecord> {
		obs::observe(FlowKind::CardActivation, "activate_member", async {
			let card_id = self.config().require_card_id()?;
			let form: ActivationFormWire = self
				.post_with_credential(
					ACTIVATION_FORM_PATH,
					&ActivationFormBody { activate_ticket: &request.activate_ticket },
				)
				.await?;
			let decrypted: DecryptedCode = self
				.post_with_credential(
					DECRYPT_CODE_PATH,
					&DecryptBody { encrypt_code: &request.encrypt_code },
				)
				.await?;

			if decrypted.code.is_empty() {
				return Err(common::malformed("card code decryption returned an empty code"));
			}

			let _: serde_json::Value = self
				.post_with_credential(
					ACTIVATE_PATH,
					&ActivateBody {
						membership_number: &decrypted.code,
						code: &decrypted.code,
						card_id: card_id.as_ref(),
					},
				)
				.await?;
			let profile = self.user_info(&request.open_id).await?;
			let identity = MemberIdentity {
				card_id: card_id.clone(),
				open_id: request.open_id.clone(),
				union_id: profile.union_id.unwrap_or_default(),
				card_code: decrypted.code,
				nickname: profile.nickname,
				status: MemberCardStatus::Normal,
			};

			Ok(card::normalize(identity, &form.info.common_field_list, &form.info.custom_field_list)
				.with_fallback_gender(profile.sex))
		})
		.await
	}

	async fn post_with_credential<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned + Default,
	{
		self.with_credential(move |credential| async move {
			self.dispatcher().post(path, &[("access_token", credential.expose())], body).await
		})
		.await
	}
}

fn find_member_code(card_id: &CardId, open_id: &OpenId, cards: Vec<UserCardWire>) -> Result<String> {
	if cards.is_empty() {
		return Err(Error::CardNotFound { open_id: open_id.to_string() });
	}

	cards
		.into_iter()
		.find(|card| card.card_id.eq_ignore_ascii_case(card_id))
		.map(|card| card.code)
		.ok_or_else(|| Error::NotCardMember { open_id: open_id.to_string() })
}
