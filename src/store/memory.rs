//! Thread-safe in-memory [`CredentialStore`] implementation for tests and ephemeral sessions.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	store::{CredentialStore, StoreFuture},
};

/// Keeps the credential pair in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<CredentialPair>>);
impl MemoryStore {
	/// Creates a store pre-populated with `pair`.
	pub fn with_credentials(pair: CredentialPair) -> Self {
		Self(Arc::new(RwLock::new(pair)))
	}

	/// Returns a copy of the current pair without going through the async contract.
	pub fn snapshot(&self) -> CredentialPair {
		self.0.read().clone()
	}
}
impl CredentialStore for MemoryStore {
	fn access_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		let pair = self.0.clone();

		Box::pin(async move { Ok(pair.read().access_token.clone()) })
	}

	fn refresh_token(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		let pair = self.0.clone();

		Box::pin(async move { Ok(pair.read().refresh_token.clone()) })
	}

	fn set_access_token(&self, token: TokenSecret) -> StoreFuture<'_, ()> {
		let pair = self.0.clone();

		Box::pin(async move {
			pair.write().access_token = Some(token);

			Ok(())
		})
	}

	fn set_tokens(&self, access: TokenSecret, refresh: TokenSecret) -> StoreFuture<'_, ()> {
		let pair = self.0.clone();

		Box::pin(async move {
			*pair.write() = CredentialPair {
				access_token: Some(access),
				refresh_token: Some(refresh),
			};

			Ok(())
		})
	}

	fn clear_tokens(&self) -> StoreFuture<'_, ()> {
		let pair = self.0.clone();

		Box::pin(async move {
			*pair.write() = CredentialPair::default();

			Ok(())
		})
	}
}
