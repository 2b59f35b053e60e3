// self
use crate::{_prelude::*, error::ConfigError};

/// Who is responsible for keeping the account access token fresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CachePolicy {
	/// No token is ever held; privileged calls fail with `NotConfigured`.
	#[default]
	#[serde(rename = "none")]
	None,
	/// This client verifies and refreshes the token on a recurring tick.
	#[serde(rename = "autonomy", alias = "autonomous")]
	Autonomous,
	/// Another trusted process owns the token and serves it over HTTP.
	#[serde(rename = "http", alias = "delegated_http")]
	DelegatedHttp,
}
impl CachePolicy {
	/// Returns the stable configuration label.
	pub const fn as_str(self) -> &'static str {
		match self {
			CachePolicy::None => "none",
			CachePolicy::Autonomous => "autonomy",
			CachePolicy::DelegatedHttp => "http",
		}
	}

	/// Returns `true` when this client owns refresh responsibility.
	pub const fn is_autonomous(self) -> bool {
		matches!(self, CachePolicy::Autonomous)
	}
}
impl Display for CachePolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for CachePolicy {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"none" => Ok(CachePolicy::None),
			"autonomy" | "autonomous" => Ok(CachePolicy::Autonomous),
			"http" | "delegated_http" => Ok(CachePolicy::DelegatedHttp),
			other => Err(ConfigError::UnknownCachePolicy { label: other.to_owned() }),
		}
	}
}
