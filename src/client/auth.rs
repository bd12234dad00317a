//! `/auth` endpoints and the refresh call used by the coordinator.

// self
use crate::{
	_prelude::*,
	auth::{
		AuthResponse, CheckStatusResponse, LoginRequest, LogoutRequest, LogoutResponse,
		RefreshTokenRequest, RefreshTokenResponse, TokenSecret, User,
	},
	client::ApiClient,
	http::{ApiRequest, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::{RefreshFuture, RefreshedTokens, TokenRefresher},
};

/// `POST` endpoint exchanging credentials for a token pair.
pub const LOGIN_PATH: &str = "/auth/login";
/// `POST` endpoint exchanging a refresh token for an access token.
pub const REFRESH_PATH: &str = "/auth/refresh";
/// `GET` endpoint validating the current access token.
pub const CHECK_TOKEN_PATH: &str = "/auth/check-token";
/// `POST` endpoint invalidating a refresh token.
pub const LOGOUT_PATH: &str = "/auth/logout";

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Logs in and stores the returned token pair.
	///
	/// A 401 here means bad credentials, so it is returned as an AUTH error without attempting a
	/// refresh.
	pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = ApiRequest::post(LOGIN_PATH).with_json(credentials)?.without_refresh();
				let response = self.send_json::<AuthResponse>(request).await?;

				self.store
					.set_tokens(response.token.clone(), response.refresh_token.clone())
					.await?;

				Ok(response)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Returns the user owning the current access token.
	pub async fn check_auth_status(&self) -> Result<User> {
		const KIND: FlowKind = FlowKind::CheckStatus;

		let span = FlowSpan::new(KIND, "check_auth_status");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(self.get::<CheckStatusResponse>(CHECK_TOKEN_PATH))
			.await
			.map(|response| response.user);

		obs::record_result(KIND, &result);

		result
	}

	/// Invalidates the refresh token server-side, then clears the local credentials.
	///
	/// `refresh_override` replaces the stored refresh token in the request body when non-empty.
	/// If the call fails the store is left untouched.
	pub async fn logout(&self, refresh_override: Option<&str>) -> Result<LogoutResponse> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let stored = self.store.refresh_token().await?;
				let refresh_token = refresh_override
					.filter(|value| !value.is_empty())
					.or_else(|| stored.as_ref().map(TokenSecret::expose));
				let request =
					ApiRequest::post(LOGOUT_PATH).with_json(&LogoutRequest { refresh_token })?;
				let response = self.send_json::<LogoutResponse>(request).await?;

				self.store.clear_tokens().await?;

				Ok(response)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Refreshes the access token through the session's single-flight coordinator.
	pub async fn refresh_session(&self) -> Result<TokenSecret> {
		self.coordinator.obtain_token(self).await
	}

	/// `true` when an access token is stored.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.store.has_tokens().await?)
	}
}
// The refresh call bypasses the pipeline: no bearer header and no nested refresh.
impl<T> TokenRefresher for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(async move {
			let request = ApiRequest::post(REFRESH_PATH)
				.with_json(&RefreshTokenRequest { refresh_token: refresh_token.expose() })?;
			let response = self.dispatch(&request).await?;

			if !response.is_success() {
				return Err(response.into_error());
			}

			let RefreshTokenResponse { token, refresh_token } = response.json()?;

			Ok(RefreshedTokens { access_token: token, refresh_token })
		})
	}
}
