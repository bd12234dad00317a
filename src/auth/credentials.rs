//! The persisted access/refresh token pair.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access and refresh tokens as held by a [`CredentialStore`](crate::store::CredentialStore).
///
/// Created on login, the access half is replaced on every successful refresh, and the whole
/// pair is cleared on logout or when a refresh fails terminally.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	/// Short-lived bearer credential.
	pub access_token: Option<TokenSecret>,
	/// Longer-lived credential exchanged for new access tokens.
	pub refresh_token: Option<TokenSecret>,
}
impl CredentialPair {
	/// Builds a fully populated pair.
	pub fn new(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		Self { access_token: Some(access.into()), refresh_token: Some(refresh.into()) }
	}

	/// `true` when neither token is present.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_none()
	}
}
