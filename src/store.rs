//! Credential storage contract and built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Async key-value contract for the persisted access/refresh token pair.
///
/// The request pipeline reads the access token before every dispatch; only the
/// [`RefreshCoordinator`](crate::refresh::RefreshCoordinator) and the explicit login/logout
/// helpers write to it. Clearing must be idempotent.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored access token, if any.
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Returns the stored refresh token, if any.
	fn refresh_token(&self) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Replaces the access token, leaving the refresh token untouched.
	fn set_access_token(&self, token: TokenSecret) -> StoreFuture<'_, ()>;

	/// Replaces both tokens.
	fn set_tokens(&self, access: TokenSecret, refresh: TokenSecret) -> StoreFuture<'_, ()>;

	/// Removes both tokens.
	fn clear_tokens(&self) -> StoreFuture<'_, ()>;

	/// Returns `true` when an access token is stored.
	fn has_tokens(&self) -> StoreFuture<'_, bool> {
		Box::pin(async move { Ok(self.access_token().await?.is_some()) })
	}

	/// Reads both tokens.
	fn credentials(&self) -> StoreFuture<'_, CredentialPair> {
		Box::pin(async move {
			Ok(CredentialPair {
				access_token: self.access_token().await?,
				refresh_token: self.refresh_token().await?,
			})
		})
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
