//! Normalized client errors and the status-to-kind taxonomy.
//!
//! Every failure that leaves [`ApiClient`](crate::client::ApiClient) is an [`Error`]. Transport
//! failures ([`TransportError`]) and storage failures ([`StoreError`]) are collapsed into it at
//! the client boundary, so callers branch on [`Error::kind`] or on the advisory
//! [`Error::should_clear_auth`] / [`Error::should_retry`] flags instead of transport shapes.

// self
use crate::{_prelude::*, store::StoreError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fixed classification applied to every normalized error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	/// 400: the server rejected the payload.
	Validation,
	/// 401: missing, expired, or revoked credentials.
	Auth,
	/// 403: authenticated but not allowed.
	Forbidden,
	/// 404.
	NotFound,
	/// 409.
	Conflict,
	/// 429: the caller should back off and retry.
	RateLimit,
	/// 500, 502, or 503.
	Server,
	/// No response was received (status sentinel 0).
	Network,
	/// Everything else, including requests that could not be dispatched.
	Unknown,
}
impl ErrorKind {
	/// Maps an HTTP status (or the `0` no-response sentinel) onto the taxonomy.
	pub const fn from_status(status: u16) -> Self {
		match status {
			400 => Self::Validation,
			401 => Self::Auth,
			403 => Self::Forbidden,
			404 => Self::NotFound,
			409 => Self::Conflict,
			429 => Self::RateLimit,
			500 | 502 | 503 => Self::Server,
			0 => Self::Network,
			_ => Self::Unknown,
		}
	}

	/// Returns a stable label suitable for logs and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Validation => "VALIDATION",
			Self::Auth => "AUTH",
			Self::Forbidden => "FORBIDDEN",
			Self::NotFound => "NOT_FOUND",
			Self::Conflict => "CONFLICT",
			Self::RateLimit => "RATE_LIMIT",
			Self::Server => "SERVER",
			Self::Network => "NETWORK",
			Self::Unknown => "UNKNOWN",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Message field of an API error body; validation failures carry a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
	/// Single human-readable message.
	One(String),
	/// One message per failed validation rule.
	Many(Vec<String>),
}

/// Error body returned by the Brewlog API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
	/// Message or list of validation messages.
	#[serde(default)]
	pub message: Option<ErrorMessage>,
	/// Short error label (e.g. `Bad Request`).
	#[serde(default)]
	pub error: Option<String>,
	/// Status code echoed by the server.
	#[serde(default)]
	pub status_code: Option<u16>,
	/// Server timestamp of the failure.
	#[serde(default)]
	pub timestamp: Option<String>,
	/// Request path echoed by the server.
	#[serde(default)]
	pub path: Option<String>,
	/// Request method echoed by the server.
	#[serde(default)]
	pub method: Option<String>,
}
impl ErrorPayload {
	/// Joins list messages with `", "`; returns `None` when the body carries no message.
	pub fn joined_message(&self) -> Option<String> {
		let joined = match self.message.as_ref()? {
			ErrorMessage::One(message) => message.clone(),
			ErrorMessage::Many(messages) => messages.join(", "),
		};

		if joined.is_empty() { None } else { Some(joined) }
	}
}

/// Normalized error exposed by every public client API.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct Error {
	kind: ErrorKind,
	message: String,
	status: u16,
	payload: Option<ErrorPayload>,
	retry_after: Option<Duration>,
}
impl Error {
	const NETWORK_MESSAGE: &'static str = "Network error - no response from server";
	const SESSION_EXPIRED_MESSAGE: &'static str = "Session expired";

	/// Builds an error whose kind is derived from `status`.
	pub fn from_status(status: u16, message: impl Into<String>) -> Self {
		Self::with_kind(ErrorKind::from_status(status), status, message)
	}

	/// Normalizes an HTTP error response.
	///
	/// The message comes from the JSON body when present (list messages joined with `", "`),
	/// otherwise from the status line.
	pub fn from_response(status: u16, body: &[u8]) -> Self {
		let payload = serde_json::from_slice::<ErrorPayload>(body).ok();
		let message = payload
			.as_ref()
			.and_then(ErrorPayload::joined_message)
			.unwrap_or_else(|| format!("Request failed with status code {status}"));

		Self { payload, ..Self::from_status(status, message) }
	}

	/// No response was received from the server.
	pub fn network() -> Self {
		Self::with_kind(ErrorKind::Network, 0, Self::NETWORK_MESSAGE)
	}

	/// The request never reached the transport, or failed for an unclassified reason.
	pub fn unknown(message: impl Into<String>) -> Self {
		Self::with_kind(ErrorKind::Unknown, 0, message)
	}

	/// Terminal refresh failure; every refresh-failure cause collapses into this value.
	pub fn session_expired() -> Self {
		Self::with_kind(ErrorKind::Auth, 401, Self::SESSION_EXPIRED_MESSAGE)
	}

	/// A successful response whose body did not match the expected shape.
	pub fn malformed_body(
		status: u16,
		source: &serde_path_to_error::Error<serde_json::Error>,
	) -> Self {
		Self::with_kind(
			ErrorKind::Unknown,
			status,
			format!("Response body could not be decoded at `{}`: {}", source.path(), source.inner()),
		)
	}

	/// Attaches a `Retry-After` hint parsed from the response.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	fn with_kind(kind: ErrorKind, status: u16, message: impl Into<String>) -> Self {
		Self { kind, message: message.into(), status, payload: None, retry_after: None }
	}

	/// Taxonomy classification.
	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	/// Raw message extracted from the failure.
	pub fn message(&self) -> &str {
		&self.message
	}

	/// HTTP status, or `0` when no response was received.
	pub fn status(&self) -> u16 {
		self.status
	}

	/// HTTP status when a response was received.
	pub fn http_status(&self) -> Option<u16> {
		(self.status != 0).then_some(self.status)
	}

	/// Parsed error body, when the server sent one.
	pub fn payload(&self) -> Option<&ErrorPayload> {
		self.payload.as_ref()
	}

	/// Server-provided back-off hint.
	pub fn retry_after(&self) -> Option<Duration> {
		self.retry_after
	}

	/// Message suitable for display.
	pub fn user_message(&self) -> String {
		let validation = self.validation_errors();

		if !validation.is_empty() {
			return validation.join("\n");
		}

		match self.kind {
			ErrorKind::Validation | ErrorKind::Conflict => self.message.clone(),
			ErrorKind::Auth => "Session expired. Please login again.".into(),
			ErrorKind::Forbidden => "You don't have permission to perform this action.".into(),
			ErrorKind::NotFound => "Resource not found.".into(),
			ErrorKind::RateLimit => "Too many requests. Please wait and try again.".into(),
			ErrorKind::Server => "Something went wrong. Please try again later.".into(),
			ErrorKind::Network => "No internet connection. Please check your network.".into(),
			ErrorKind::Unknown => "An unexpected error occurred. Please try again.".into(),
		}
	}

	/// Individual validation messages; empty unless this is a list-carrying VALIDATION error.
	pub fn validation_errors(&self) -> Vec<String> {
		match (self.kind, self.payload.as_ref().and_then(|p| p.message.as_ref())) {
			(ErrorKind::Validation, Some(ErrorMessage::Many(messages))) => messages.clone(),
			_ => Vec::new(),
		}
	}

	/// `true` only for AUTH errors; callers should drop their authenticated state.
	pub fn should_clear_auth(&self) -> bool {
		self.kind == ErrorKind::Auth
	}

	/// `true` only for RATE_LIMIT errors.
	pub fn should_retry(&self) -> bool {
		self.kind == ErrorKind::RateLimit
	}
}
impl From<StoreError> for Error {
	fn from(e: StoreError) -> Self {
		Self::unknown(e.to_string())
	}
}
impl From<TransportError> for Error {
	fn from(e: TransportError) -> Self {
		match e {
			TransportError::NoResponse { .. } => Self::network(),
			TransportError::Request { source } => Self::unknown(source.to_string()),
		}
	}
}

/// Configuration failures raised while constructing a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No base URL could be resolved from the environment.
	#[error("Environment variable `{variable}` is not set.")]
	MissingBaseUrl {
		/// Variable that was consulted last.
		variable: &'static str,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL `{value}` is invalid.")]
	InvalidBaseUrl {
		/// Offending value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL parses but cannot anchor relative endpoint paths.
	#[error("Base URL `{value}` cannot be used as a base for API paths.")]
	UnsupportedBaseUrl {
		/// Offending value.
		value: String,
	},
	/// Request timeout must be non-zero.
	#[error("Request timeout must be greater than zero.")]
	ZeroTimeout,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
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

/// Failures reported by an [`HttpTransport`](crate::http::HttpTransport).
///
/// Never surfaced to callers directly; the client normalizes it into [`Error`].
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Connectivity failure or timeout; no response was received.
	#[error("No response was received from the server.")]
	NoResponse {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The request could not be constructed or dispatched.
	#[error("Request could not be dispatched: {source}.")]
	Request {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a connectivity or timeout failure.
	pub fn no_response(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::NoResponse { source: Box::new(src) }
	}

	/// Wraps a request construction failure.
	pub fn request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Request { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_builder() { Self::request(e) } else { Self::no_response(e) }
	}
}
