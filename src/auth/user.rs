//! Request and response bodies for the `/auth` endpoints.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Account role reported by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
	/// Regular account.
	User,
	/// Administrative account.
	Admin,
}

/// Authenticated user profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Server-side identifier.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Login e-mail.
	pub email: String,
	/// Account role.
	pub role: Role,
}

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
	/// Login e-mail.
	pub email: String,
	/// Plain-text password; never logged.
	pub password: String,
}
impl LoginRequest {
	/// Builds a login body.
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}
impl Debug for LoginRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Response of `POST /auth/login`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
	/// Logged-in user.
	pub user: User,
	/// Access token.
	pub token: TokenSecret,
	/// Refresh token.
	pub refresh_token: TokenSecret,
}

/// Body of `POST /auth/refresh`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
	/// Refresh token being exchanged.
	pub refresh_token: &'a str,
}

/// Response of `POST /auth/refresh`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
	/// Replacement access token.
	pub token: TokenSecret,
	/// Rotated refresh token, when the server issues one.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}

/// Response of `GET /auth/check-token`.
#[derive(Clone, Debug, Deserialize)]
pub struct CheckStatusResponse {
	/// User owning the presented access token.
	pub user: User,
}

/// Body of `POST /auth/logout`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest<'a> {
	/// Refresh token to invalidate server-side.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<&'a str>,
}

/// Response of `POST /auth/logout`.
#[derive(Clone, Debug, Deserialize)]
pub struct LogoutResponse {
	/// Confirmation message.
	pub message: String,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn login_response_decodes_camel_case() {
		let body = r#"{"user":{"id":"u1","name":"Ana","email":"ana@example.com","role":"ADMIN"},"token":"A","refreshToken":"R"}"#;
		let response: AuthResponse =
			serde_json::from_str(body).expect("Login response fixture should decode.");

		assert_eq!(response.user.role, Role::Admin);
		assert_eq!(response.token.expose(), "A");
		assert_eq!(response.refresh_token.expose(), "R");
	}

	#[test]
	fn login_request_debug_hides_password() {
		let request = LoginRequest::new("ana@example.com", "hunter2");

		assert!(!format!("{request:?}").contains("hunter2"));
	}

	#[test]
	fn logout_request_omits_absent_refresh_token() {
		let payload = serde_json::to_string(&LogoutRequest { refresh_token: None })
			.expect("Logout request should serialize.");

		assert_eq!(payload, "{}");
	}
}
