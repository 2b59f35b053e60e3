//! Client-level error types shared across the dispatcher, credential cache, and flows.

// self
use crate::{_prelude::*, auth::IdentifierError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Upstream codes meaning the account-level access token is no longer accepted.
const CREDENTIAL_INVALID_CODES: [i64; 3] = [40001, 40014, 42001];

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts, request encoding).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Upstream responded with a body that could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// Upstream rejected the request with a non-zero `errcode`.
	#[error("WeChat API returned errcode {code}: {message}.")]
	Api {
		/// Upstream `errcode`.
		code: i64,
		/// Upstream `errmsg`.
		message: String,
	},
	/// The cache policy never holds an access token.
	#[error("Access token caching is disabled for this client.")]
	NotConfigured,
	/// The cache policy exists but is not wired to a working source yet.
	#[error("Access token cache policy `{policy}` is not implemented.")]
	NotImplemented {
		/// Label of the unimplemented policy.
		policy: &'static str,
	},
	/// No access token has ever been issued to this client.
	#[error("No access token has been issued yet.")]
	CredentialUnavailable,
	/// Issuance succeeded at the envelope level but carried no token.
	#[error("Token endpoint returned an empty access_token.")]
	EmptyCredential,
	/// Web-authorization exchange produced no usable login token.
	#[error("Web authorization exchange failed: {reason}.")]
	ExchangeFailed {
		/// Client-supplied reason string.
		reason: String,
	},
	/// Upstream returned a field that violates a local invariant.
	#[error("Upstream response is malformed: {reason}.")]
	MalformedResponse {
		/// Client-supplied reason string.
		reason: String,
	},
	/// The member card exists but has not been activated.
	#[error("Member card has not been activated.")]
	CardNotActivated,
	/// The user has never claimed any card from this account.
	#[error("User `{open_id}` holds no cards.")]
	CardNotFound {
		/// User identifier that was queried.
		open_id: String,
	},
	/// The user holds cards but none of them is the configured member card.
	#[error("User `{open_id}` is not a member of the configured card.")]
	NotCardMember {
		/// User identifier that was queried.
		open_id: String,
	},
}
impl Error {
	/// Returns `true` when the upstream rejected the account-level access token itself.
	///
	/// Callers use this to decide whether a forced refresh followed by a single retry is
	/// worthwhile.
	pub fn is_credential_invalid(&self) -> bool {
		matches!(self, Self::Api { code, .. } if CREDENTIAL_INVALID_CODES.contains(code))
	}

	/// Upstream `errcode` when the failure came from an envelope.
	pub fn api_code(&self) -> Option<i64> {
		match self {
			Self::Api { code, .. } => Some(*code),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// An identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// A configured endpoint is not an absolute http(s) URL.
	#[error("The {endpoint} endpoint must be an absolute http(s) URL: {url}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A request path could not be resolved against the API base.
	#[error("Request path `{path}` cannot be resolved against the API base.")]
	InvalidPath {
		/// Relative path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Label does not name a known cache policy.
	#[error("Unknown access token cache policy `{label}`.")]
	UnknownCachePolicy {
		/// Label that failed to parse.
		label: String,
	},
	/// The delegated cache policy requires a trusted address.
	#[error("The http cache policy requires a cache address.")]
	MissingCacheAddress,
	/// The delegated cache address must be an http(s) URL.
	#[error("Cache address must use http or https: {url}.")]
	InvalidCacheAddress {
		/// Address that failed validation.
		url: String,
	},
	/// The refresh tick must be positive.
	#[error("The access token refresh interval must be greater than zero.")]
	ZeroRefreshInterval,
	/// Member-card operations need a configured card identifier.
	#[error("No member card identifier is configured.")]
	MissingCardId,
	/// The autonomous policy needs a Tokio runtime to host its refresh task.
	#[error("The autonomy cache policy must be started inside a Tokio runtime.")]
	MissingRuntime,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, request encoding).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the WeChat API.")]
	Network {
		/// Transport-specific network error with request URLs scrubbed.
		#[source]
		source: BoxError,
	},
	/// The request did not complete in time.
	#[error("Request timed out while calling the WeChat API.")]
	Timeout {
		/// Transport-specific timeout error with request URLs scrubbed.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the WeChat API.")]
	Io(#[from] std::io::Error),
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be encoded as JSON.")]
	Encode(#[source] serde_json::Error),
	/// Transport reported a failure without a structured cause.
	#[error("HTTP client error occurred while calling the WeChat API: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		// Query strings carry `secret` and `access_token`; never surface them.
		let e = e.without_url();

		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Response decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Upstream responded with malformed JSON or an unexpected shape.
	#[error("WeChat API returned malformed JSON (HTTP status {status:?}).")]
	Json {
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Leading slice of the body for diagnostics.
		preview: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn credential_invalid_codes_are_recognized() {
		for code in CREDENTIAL_INVALID_CODES {
			let err = Error::Api { code, message: "invalid credential".into() };

			assert!(err.is_credential_invalid());
			assert_eq!(err.api_code(), Some(code));
		}

		let other = Error::Api { code: 45009, message: "api freq out of limit".into() };

		assert!(!other.is_credential_invalid());
		assert!(!Error::CredentialUnavailable.is_credential_invalid());
		assert_eq!(Error::NotConfigured.api_code(), None);
	}

	#[test]
	fn api_error_message_carries_code_and_text() {
		let err = Error::Api { code: 40001, message: "invalid credential".into() };

		assert_eq!(err.to_string(), "WeChat API returned errcode 40001: invalid credential.");
	}

	#[test]
	fn config_error_converts_into_client_error_with_source() {
		let err: Error = ConfigError::MissingCardId.into();

		assert!(matches!(err, Error::Config(ConfigError::MissingCardId)));
		assert_eq!(err.to_string(), "No member card identifier is configured.");
	}
}
