//! Member card records and the normalizer for vendor field lists.
//!
//! WeChat reports what a member typed into the activation form as flat `{name, value}`
//! lists. Common fields are keyed by `USER_FORM_INFO_FLAG_*` sentinels; custom fields are
//! keyed by their display names, which are not stable identifiers. [`normalize`] folds
//! both lists into a typed [`MembershipRecord`] without ever failing: unknown names are
//! ignored, unknown genders become [`Gender::Unknown`], and birthdays that match none of
//! the known layouts keep the default of today.

mod birthday;

pub use birthday::parse_birthday;

// crates.io
use time::Date;
// self
use crate::{
	_prelude::*,
	auth::{CardId, OpenId},
	obs,
};

/// Placeholder stored when a custom field is absent.
pub const CUSTOM_FIELD_PLACEHOLDER: &str = "2000";
/// Display name of the first custom field.
pub const CUSTOM_FIELD1_NAME: &str = "大宝生日";
/// Display name of the second custom field.
pub const CUSTOM_FIELD2_NAME: &str = "二宝生日";

const MOBILE_FLAGS: [&str; 2] = ["USER_FORM_INFO_FLAG_MOBILE", "mobile"];
const SEX_FLAGS: [&str; 2] = ["USER_FORM_INFO_FLAG_SEX", "sex"];
const NAME_FLAGS: [&str; 2] = ["USER_FORM_INFO_FLAG_NAME", "name"];
const BIRTHDAY_FLAGS: [&str; 2] = ["USER_FORM_INFO_FLAG_BIRTHDAY", "birthday"];

/// One `{name, value}` entry from a vendor field list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardField {
	/// Sentinel identifier or display name.
	pub name: String,
	/// Free-form value entered by the member.
	pub value: String,
}
impl CardField {
	/// Creates a field entry.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into() }
	}
}

/// Member gender as reported by forms or profiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
	/// Male.
	Male,
	/// Female.
	Female,
	/// Not provided or not recognized.
	#[default]
	Unknown,
}
impl Gender {
	/// Parses a form token; matching is case-insensitive and never fails.
	pub fn from_token(token: &str) -> Self {
		if token.eq_ignore_ascii_case("MALE") {
			Self::Male
		} else if token.eq_ignore_ascii_case("FEMALE") {
			Self::Female
		} else {
			Self::Unknown
		}
	}

	/// Maps the numeric `sex` code of user profiles.
	pub fn from_sex_code(code: i64) -> Self {
		match code {
			1 => Self::Male,
			2 => Self::Female,
			_ => Self::Unknown,
		}
	}

	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Male => "male",
			Self::Female => "female",
			Self::Unknown => "unknown",
		}
	}
}
impl Display for Gender {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Lifecycle state of a claimed member card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberCardStatus {
	/// Active card.
	Normal,
	/// Card validity elapsed.
	Expire,
	/// Transfer to another user is pending.
	Gifting,
	/// Transfer completed.
	GiftSucc,
	/// Transfer was not accepted in time.
	GiftTimeout,
	/// Card was deleted.
	Delete,
	/// Card was invalidated.
	Unavailable,
	/// Label not recognized by this client.
	#[default]
	#[serde(other)]
	Unknown,
}
impl MemberCardStatus {
	/// Parses an upstream label; unrecognized labels map to [`MemberCardStatus::Unknown`].
	pub fn from_label(label: &str) -> Self {
		match label {
			"NORMAL" => Self::Normal,
			"EXPIRE" => Self::Expire,
			"GIFTING" => Self::Gifting,
			"GIFT_SUCC" => Self::GiftSucc,
			"GIFT_TIMEOUT" => Self::GiftTimeout,
			"DELETE" => Self::Delete,
			"UNAVAILABLE" => Self::Unavailable,
			_ => Self::Unknown,
		}
	}

	/// Returns the upstream label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Normal => "NORMAL",
			Self::Expire => "EXPIRE",
			Self::Gifting => "GIFTING",
			Self::GiftSucc => "GIFT_SUCC",
			Self::GiftTimeout => "GIFT_TIMEOUT",
			Self::Delete => "DELETE",
			Self::Unavailable => "UNAVAILABLE",
			Self::Unknown => "UNKNOWN",
		}
	}
}
impl Display for MemberCardStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Identity half of a membership record, known before any field list is read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberIdentity {
	/// Member card template.
	pub card_id: CardId,
	/// Card holder.
	pub open_id: OpenId,
	/// Cross-account identifier; empty when the account is not bound to an open platform.
	pub union_id: String,
	/// Decrypted card number.
	pub card_code: String,
	/// Display name.
	pub nickname: String,
	/// Card lifecycle state.
	pub status: MemberCardStatus,
}

/// Normalized, typed member card profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MembershipRecord {
	/// Member card template.
	pub card_id: CardId,
	/// Card holder.
	pub open_id: OpenId,
	/// Cross-account identifier.
	pub union_id: String,
	/// Card number.
	pub card_code: String,
	/// Display name.
	pub nickname: String,
	/// Mobile number from the activation form.
	pub mobile: String,
	/// Gender from the activation form.
	pub gender: Gender,
	/// Real name from the activation form.
	pub real_name: String,
	/// Birthday; today when unset or unparseable.
	pub birthday: Date,
	/// Card lifecycle state.
	pub status: MemberCardStatus,
	/// Value of the first custom field.
	pub custom_field1: String,
	/// Value of the second custom field.
	pub custom_field2: String,
}
impl MembershipRecord {
	/// Replaces an [`Gender::Unknown`] form gender with `fallback`.
	pub fn with_fallback_gender(mut self, fallback: Gender) -> Self {
		if self.gender == Gender::Unknown {
			self.gender = fallback;
		}

		self
	}
}

/// Normalizes vendor field lists using today's UTC date for unset birthdays.
pub fn normalize(
	identity: MemberIdentity,
	common: &[CardField],
	custom: &[CardField],
) -> MembershipRecord {
	normalize_at(OffsetDateTime::now_utc().date(), identity, common, custom)
}

/// Normalizes vendor field lists against an explicit `today`.
///
/// Deterministic: identical inputs always produce identical records.
pub fn normalize_at(
	today: Date,
	identity: MemberIdentity,
	common: &[CardField],
	custom: &[CardField],
) -> MembershipRecord {
	let mut mobile = String::new();
	let mut gender = Gender::Unknown;
	let mut real_name = String::new();
	let mut birthday = today;

	for field in common {
		let name = field.name.as_str();

		if MOBILE_FLAGS.contains(&name) {
			mobile = field.value.clone();
		} else if SEX_FLAGS.contains(&name) {
			gender = Gender::from_token(&field.value);
		} else if NAME_FLAGS.contains(&name) {
			real_name = field.value.clone();
		} else if BIRTHDAY_FLAGS.contains(&name) {
			match parse_birthday(&field.value, today) {
				Some(date) => birthday = date,
				None => obs::record_unparsed_birthday(&field.value),
			}
		}
	}

	let mut custom_field1 = CUSTOM_FIELD_PLACEHOLDER.to_owned();
	let mut custom_field2 = CUSTOM_FIELD_PLACEHOLDER.to_owned();

	for field in custom {
		match field.name.as_str() {
			CUSTOM_FIELD1_NAME => custom_field1 = field.value.clone(),
			CUSTOM_FIELD2_NAME => custom_field2 = field.value.clone(),
			_ => {},
		}
	}

	MembershipRecord {
		card_id: identity.card_id,
		open_id: identity.open_id,
		union_id: identity.union_id,
		card_code: identity.card_code,
		nickname: identity.nickname,
		mobile,
		gender,
		real_name,
		birthday,
		status: identity.status,
		custom_field1,
		custom_field2,
	}
}
