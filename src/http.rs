//! Transport primitives for API calls.
//!
//! [`HttpTransport`] is the client's only dependency on an HTTP stack. It executes one
//! [`ApiRequest`] against an absolute URL and reports either an [`ApiResponse`] (for any status,
//! success or not) or a [`TransportError`] when no response could be obtained. Authentication,
//! refresh, and error normalization all live above this seam in
//! [`ApiClient`](crate::client::ApiClient), so custom transports only move bytes.

// crates.io
#[cfg(feature = "reqwest")]
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
#[cfg(feature = "reqwest")] use crate::error::ConfigError;
use crate::{_prelude::*, auth::TokenSecret, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing API requests.
///
/// Implementations must apply their own request timeout and report it as
/// [`TransportError::NoResponse`]; a timeout never engages the refresh protocol.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` against the already-resolved `url`.
	fn execute<'a>(&'a self, url: Url, request: &'a ApiRequest) -> TransportFuture<'a>;
}

/// HTTP verbs used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}

/// Outbound API call, relative to the configured base URL.
///
/// Carries the per-request "already retried" marker that stops a replayed request from
/// re-entering the refresh protocol.
#[derive(Clone)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Path relative to the base URL (a leading `/` is ignored).
	pub path: String,
	/// Extra headers; names are stored lower-case.
	pub headers: BTreeMap<String, String>,
	/// JSON body.
	pub body: Option<serde_json::Value>,
	retried: bool,
	refresh_on_unauthorized: bool,
}
impl ApiRequest {
	const AUTHORIZATION: &'static str = "authorization";

	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: BTreeMap::new(),
			body: None,
			retried: false,
			refresh_on_unauthorized: true,
		}
	}

	/// `GET path`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// `POST path`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// `PUT path`.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// `PATCH path`.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// `DELETE path`.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		let value = serde_json::to_value(body)
			.map_err(|e| Error::unknown(format!("Request body could not be serialized: {e}")))?;

		self.body = Some(value);

		Ok(self)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Surfaces a 401 for this request as an error instead of refreshing and replaying.
	pub fn without_refresh(mut self) -> Self {
		self.refresh_on_unauthorized = false;

		self
	}

	/// `true` once the request has been through the refresh protocol.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	/// Current `Authorization` header value.
	pub fn authorization(&self) -> Option<&str> {
		self.headers.get(Self::AUTHORIZATION).map(String::as_str)
	}

	pub(crate) fn may_refresh(&self) -> bool {
		self.refresh_on_unauthorized && !self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}

	pub(crate) fn set_bearer(&mut self, token: &TokenSecret) {
		self.headers.insert(Self::AUTHORIZATION.into(), token.bearer());
	}
}
impl Debug for ApiRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				let value = if name == Self::AUTHORIZATION { "<redacted>" } else { value.as_str() };

				(name.as_str(), value)
			})
			.collect::<BTreeMap<_, _>>();

		f.debug_struct("ApiRequest")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("headers", &headers)
			.field("has_body", &self.body.is_some())
			.field("retried", &self.retried)
			.finish()
	}
}

/// Response captured by a transport, for any HTTP status.
#[derive(Clone, Debug, Default)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// `Retry-After` hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Builds a response with a JSON body.
	pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
		Self { status, retry_after: None, body: body.to_string().into_bytes() }
	}

	/// `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body, reporting the failing JSON path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let de = &mut serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(de).map_err(|e| Error::malformed_body(self.status, &e))
	}

	/// Normalizes a non-success response into an [`Error`].
	pub fn into_error(self) -> Error {
		Error::from_response(self.status, &self.body).with_retry_after(self.retry_after)
	}
}

/// Parses a `Retry-After` value given either as delta-seconds or as an RFC 2822 date.
///
/// Dates in the past yield `None`.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

/// [`HttpTransport`] backed by a shared [`ReqwestClient`].
///
/// The client should carry the request timeout; [`ReqwestTransport::new`] configures it along
/// with the JSON content type every API call uses.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport whose requests time out after `timeout`.
	pub fn new(timeout: StdDuration) -> Result<Self, ConfigError> {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		let client = ReqwestClient::builder().timeout(timeout).default_headers(headers).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute<'a>(&'a self, url: Url, request: &'a ApiRequest) -> TransportFuture<'a> {
		Box::pin(async move {
			let mut builder = self.0.request(request.method.into(), url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &request.body {
				builder = builder.json(body);
			}

			let outbound = builder.build().map_err(TransportError::request)?;
			let response = self.0.execute(outbound).await?;
			let status = response.status().as_u16();
			let retry_after = retry_after_header(response.headers());
			let body = response.bytes().await.map_err(TransportError::no_response)?.to_vec();

			Ok(ApiResponse { status, retry_after, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
	parse_retry_after(headers.get(RETRY_AFTER)?.to_str().ok()?)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ErrorKind;

	#[test]
	fn retry_after_accepts_seconds_and_dates() {
		assert_eq!(parse_retry_after(" 120 "), Some(Duration::seconds(120)));
		assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
		assert_eq!(parse_retry_after("soon"), None);

		let future = (OffsetDateTime::now_utc() + Duration::hours(1))
			.format(&Rfc2822)
			.expect("Future instant should format as RFC 2822.");
		let parsed = parse_retry_after(&future).expect("Future Retry-After date should parse.");

		assert!(parsed.is_positive() && parsed <= Duration::hours(1));
	}

	#[test]
	fn debug_redacts_authorization() {
		let mut request = ApiRequest::get("/coffees").with_header("X-Trace", "t-1");

		request.set_bearer(&TokenSecret::new("very-secret"));

		let rendered = format!("{request:?}");

		assert_eq!(request.authorization(), Some("Bearer very-secret"));
		assert!(!rendered.contains("very-secret"));
		assert!(rendered.contains("x-trace"));
	}

	#[test]
	fn retry_marker_blocks_refresh() {
		let mut request = ApiRequest::get("/coffees");

		assert!(request.may_refresh());

		request.mark_retried();

		assert!(request.is_retried());
		assert!(!request.may_refresh());
		assert!(!ApiRequest::post("/auth/login").without_refresh().may_refresh());
	}

	#[test]
	fn malformed_success_body_is_unknown() {
		#[derive(Debug, Deserialize)]
		struct Body {
			#[allow(dead_code)]
			token: String,
		}

		let response = ApiResponse { status: 200, retry_after: None, body: br#"{"token":7}"#.to_vec() };
		let err = response.json::<Body>().expect_err("Numeric token should not decode.");

		assert_eq!(err.kind(), ErrorKind::Unknown);
		assert_eq!(err.status(), 200);
		assert!(err.message().contains("token"));
	}

	#[test]
	fn error_response_keeps_retry_hint() {
		let response = ApiResponse {
			status: 429,
			retry_after: Some(Duration::seconds(3)),
			body: br#"{"message":"Too many requests"}"#.to_vec(),
		};
		let err = response.into_error();

		assert!(err.should_retry());
		assert_eq!(err.retry_after(), Some(Duration::seconds(3)));
	}
}
