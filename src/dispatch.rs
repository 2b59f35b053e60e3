//! Request/response pipeline shared by every WeChat API call.
//!
//! [`Dispatcher::issue`] resolves a relative path against the API host, serializes an
//! optional JSON body, executes the request through an [`ApiHttpClient`], and decodes
//! the `{errcode, errmsg, ...payload}` [`Envelope`] into the caller's payload type. A
//! non-zero `errcode` always becomes [`Error::Api`], regardless of the HTTP status.
//! The dispatcher holds no mutable state beyond the transport's connection pool, so
//! any number of callers may share it.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpResponse,
	http::{Method, Request, header::CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, DecodeError, TransportError},
	http::{ApiHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Maps HTTP transport failures into client [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a client error.
	///
	/// Implementations must scrub request URLs from the surfaced cause; they carry the
	/// app secret and access token in the query string.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_metadata: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: "unknown transport failure".into() }.into(),
		}
	}
}

/// Uniform response wrapper: `errcode == 0` means success.
///
/// The payload is flattened so each call site only declares the fields it reads.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Envelope<T> {
	/// Upstream status code; absent means success.
	#[serde(default)]
	pub errcode: i64,
	/// Upstream status text.
	#[serde(default)]
	pub errmsg: String,
	/// Operation-specific fields.
	#[serde(flatten)]
	pub payload: T,
}
impl<T> Envelope<T> {
	/// Returns `true` when the upstream accepted the request.
	pub fn is_success(&self) -> bool {
		self.errcode == 0
	}

	/// Converts the envelope into its payload or an [`Error::Api`].
	pub fn into_result(self) -> Result<T> {
		if self.is_success() {
			Ok(self.payload)
		} else {
			Err(Error::Api { code: self.errcode, message: self.errmsg })
		}
	}
}

/// Decodes a raw response body into an [`Envelope`].
///
/// An empty (or whitespace-only) body means "no payload" and yields the default
/// payload with `errcode == 0`.
pub fn decode_envelope<T>(body: &[u8], status: Option<u16>) -> Result<Envelope<T>, DecodeError>
where
	T: DeserializeOwned + Default,
{
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Envelope::default());
	}

	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| DecodeError::Json {
		source,
		status,
		preview: body_preview(body),
	})
}

/// Stateless request pipeline bound to one API host.
pub struct Dispatcher<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	base: Url,
}
impl<C, M> Dispatcher<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a dispatcher resolving paths against `base`.
	pub fn new(base: Url, http_client: impl Into<Arc<C>>, error_mapper: impl Into<Arc<M>>) -> Self {
		Self { http_client: http_client.into(), error_mapper: error_mapper.into(), base }
	}

	/// API host every relative path resolves against.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Issues a `GET` with query parameters and no body.
	pub async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T>
	where
		T: DeserializeOwned + Default,
	{
		self.issue::<(), T>(Method::GET, path, query, None).await
	}

	/// Issues a `POST` with query parameters and a JSON body.
	pub async fn post<B, T>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned + Default,
	{
		self.issue(Method::POST, path, query, Some(body)).await
	}

	/// Builds, sends, and decodes one request.
	///
	/// `path` may be relative (resolved against the API host) or absolute. A present
	/// `body` is serialized to JSON and sent with `Content-Type: application/json`.
	pub async fn issue<B, T>(
		&self,
		method: Method,
		path: &str,
		query: &[(&str, &str)],
		body: Option<&B>,
	) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned + Default,
	{
		let url = self.resolve(path, query)?;
		let mut builder = Request::builder().method(method).uri(url.as_str());
		let payload = match body {
			Some(body) => {
				builder = builder.header(CONTENT_TYPE, "application/json");

				serde_json::to_vec(body).map_err(TransportError::Encode)?
			},
			None => Vec::new(),
		};
		let request = builder.body(payload).map_err(ConfigError::from)?;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response: HttpResponse = handle
			.call(request)
			.await
			.map_err(|err| self.error_mapper.map_transport_error(meta.take().as_ref(), err))?;
		let status = response.status().as_u16();
		let elapsed = meta.take().and_then(|meta| meta.elapsed);

		obs::record_response_body(url.path(), status, elapsed, response.body());

		decode_envelope::<T>(response.body(), Some(status))?.into_result()
	}

	fn resolve(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
		let mut url = self
			.base
			.join(path)
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })?;

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		Ok(url)
	}
}
#[cfg(feature = "reqwest")]
impl Dispatcher<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a dispatcher backed by a default reqwest client.
	pub fn reqwest(base: Url) -> Self {
		Self::new(base, ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
impl<C, M> Debug for Dispatcher<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher").field("base", &self.base.as_str()).finish()
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err.without_url()).into();
	}

	TransportError::from(err).into()
}

/// Returns at most [`BODY_PREVIEW_LIMIT`] characters of a body for diagnostics.
pub(crate) fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut buf = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, Default, Deserialize)]
	#[serde(default)]
	struct IssuedToken {
		access_token: String,
		expires_in: i64,
	}

	#[test]
	fn success_envelope_yields_payload() {
		let envelope = decode_envelope::<IssuedToken>(
			br#"{"access_token":"T","expires_in":7200}"#,
			Some(200),
		)
		.expect("Token payload should decode.");

		assert!(envelope.is_success());

		let token = envelope.into_result().expect("Zero errcode should succeed.");

		assert_eq!(token.access_token, "T");
		assert_eq!(token.expires_in, 7200);
	}

	#[test]
	fn non_zero_errcode_becomes_api_error() {
		let err = decode_envelope::<IssuedToken>(
			br#"{"errcode":40001,"errmsg":"invalid credential"}"#,
			Some(200),
		)
		.expect("Error envelope should decode.")
		.into_result()
		.expect_err("Non-zero errcode should fail.");

		assert!(matches!(err, Error::Api { code: 40001, ref message } if message == "invalid credential"));
		assert!(err.is_credential_invalid());
	}

	#[test]
	fn empty_body_is_not_a_parse_failure() {
		let envelope = decode_envelope::<IssuedToken>(b"", Some(200))
			.expect("Empty body should decode as an empty payload.");

		assert_eq!(envelope.errcode, 0);
		assert!(envelope.payload.access_token.is_empty());
		assert!(decode_envelope::<IssuedToken>(b" \n", None).is_ok());
	}

	#[test]
	fn malformed_body_reports_path_and_preview() {
		let err = decode_envelope::<IssuedToken>(br#"{"expires_in":"soon"}"#, Some(502))
			.expect_err("Wrong field type should fail.");
		let DecodeError::Json { source, status, preview } = err;

		assert!(source.inner().to_string().contains("invalid type"));
		assert_eq!(status, Some(502));
		assert!(preview.contains("soon"));
	}

	#[test]
	fn body_preview_truncates_long_bodies() {
		let long = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let preview = body_preview(long.as_bytes());

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
