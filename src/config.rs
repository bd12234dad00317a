//! Client configuration: API base URL and request timeout.
//!
//! Release builds read the base URL from [`API_URL_VAR`]. Development builds first consult the
//! per-platform override ([`Platform::override_var`]) so emulators can reach a host-local
//! server, then fall back to [`API_URL_VAR`].

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the API base URL.
pub const API_URL_VAR: &str = "BREWLOG_API_URL";
/// Development override for Android builds.
pub const API_URL_ANDROID_VAR: &str = "BREWLOG_API_URL_ANDROID";
/// Development override for iOS builds.
pub const API_URL_IOS_VAR: &str = "BREWLOG_API_URL_IOS";

/// Platform the client runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
	/// Android device or emulator.
	Android,
	/// iOS device or simulator.
	Ios,
	/// Anything else (desktop, web, CLI).
	Other,
}
impl Platform {
	/// Development-only base URL override consulted for this platform.
	pub const fn override_var(self) -> Option<&'static str> {
		match self {
			Platform::Android => Some(API_URL_ANDROID_VAR),
			Platform::Ios => Some(API_URL_IOS_VAR),
			Platform::Other => None,
		}
	}

	/// Platform of the current compilation target.
	pub const fn current() -> Self {
		if cfg!(target_os = "android") {
			Platform::Android
		} else if cfg!(target_os = "ios") {
			Platform::Ios
		} else {
			Platform::Other
		}
	}
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL; always ends with `/` so relative paths resolve beneath it.
	pub base_url: Url,
	/// Per-request timeout applied by the transport.
	pub timeout: StdDuration,
}
impl ClientConfig {
	/// Request timeout used unless overridden.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Returns a builder for the provided base URL.
	pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder { base_url: base_url.into(), timeout: Self::DEFAULT_TIMEOUT }
	}

	/// Resolves the configuration from process environment variables.
	pub fn from_env(platform: Platform, development: bool) -> Result<Self, ConfigError> {
		Self::from_lookup(platform, development, |key| env::var(key).ok())
	}

	/// Resolves the configuration through `lookup`; blank values count as unset.
	pub fn from_lookup<F>(
		platform: Platform,
		development: bool,
		lookup: F,
	) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
		let platform_url = if development { platform.override_var().and_then(read) } else { None };
		let base_url = platform_url
			.or_else(|| read(API_URL_VAR))
			.ok_or(ConfigError::MissingBaseUrl { variable: API_URL_VAR })?;

		Self::builder(base_url).build()
	}

	/// Resolves `path` beneath the base URL; a leading `/` is ignored.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|e| Error::unknown(format!("Invalid request path `{path}`: {e}")))
	}
}

/// Builder for [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	base_url: String,
	timeout: StdDuration,
}
impl ClientConfigBuilder {
	/// Overrides the request timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Validates and normalizes the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let value = self.base_url.trim().to_owned();
		let mut base_url = Url::parse(&value)
			.map_err(|source| ConfigError::InvalidBaseUrl { value: value.clone(), source })?;

		if base_url.cannot_be_a_base() {
			return Err(ConfigError::UnsupportedBaseUrl { value });
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		Ok(ClientConfig { base_url, timeout: self.timeout })
	}
}
