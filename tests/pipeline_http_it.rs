#![cfg(feature = "reqwest")]

mod common;

// std
use std::time::{Duration as StdDuration, Instant};
// crates.io
use httpmock::prelude::*;
use serde_json::Value;
use time::Duration;
// self
use brewlog_client::{
	auth::{CredentialPair, LoginRequest, TokenSecret},
	config::ClientConfig,
	error::ErrorKind,
	events::SessionEvent,
};
use common::{Harness, USER_JSON};

const JSON: &str = "application/json";

fn stale_pair() -> CredentialPair {
	CredentialPair::new("A", "R")
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_request_replayed() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let Harness { client, store, notifier } =
		common::reqwest_harness(&server, CredentialPair::default());
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/login")
				.json_body(serde_json::json!({ "email": "ana@example.com", "password": "pw" }));
			then.status(200).header("content-type", JSON).body(format!(
				r#"{{"user":{USER_JSON},"token":"A","refreshToken":"R"}}"#
			));
		})
		.await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/coffees").header("authorization", "Bearer A");
			then.status(401)
				.header("content-type", JSON)
				.body(r#"{"message":"jwt expired","statusCode":401}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.json_body(serde_json::json!({ "refreshToken": "R" }));
			then.status(200).header("content-type", JSON).body(r#"{"token":"B"}"#);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/coffees").header("authorization", "Bearer B");
			then.status(200).header("content-type", JSON).body(r#"{"data":[],"total":0}"#);
		})
		.await;
	let auth = client.login(&LoginRequest::new("ana@example.com", "pw")).await?;

	assert_eq!(auth.user.email, "ana@example.com");
	assert_eq!(store.snapshot(), stale_pair());

	let body = client.get::<Value>("/coffees").await?;

	assert_eq!(body["total"], 0);

	login.assert_async().await;
	stale.assert_async().await;
	refresh.assert_async().await;
	fresh.assert_async().await;

	assert_eq!(store.snapshot(), CredentialPair::new("B", "R"));
	assert_eq!(notifier.count(SessionEvent::Refreshed), 1);
	assert_eq!(notifier.count(SessionEvent::Revoked), 0);
	assert!(!client.coordinator().is_refreshing());

	Ok(())
}

#[tokio::test]
async fn replay_rejection_surfaces_auth_error_without_second_refresh() {
	let server = MockServer::start_async().await;
	let Harness { client, notifier, .. } = common::reqwest_harness(&server, stale_pair());
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/coffees/my-collection");
			then.status(401).header("content-type", JSON).body(r#"{"message":"Unauthorized"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).header("content-type", JSON).body(r#"{"token":"B"}"#);
		})
		.await;
	let err = client
		.get::<Value>("/coffees/my-collection")
		.await
		.expect_err("A 401 on the replay should be returned to the caller.");

	assert_eq!(err.kind(), ErrorKind::Auth);
	assert_eq!(err.status(), 401);
	assert_eq!(err.message(), "Unauthorized");

	protected.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(notifier.count(SessionEvent::Revoked), 0);
	assert_eq!(client.coordinator().metrics().attempts(), 1);
}

#[tokio::test]
async fn non_auth_failures_never_engage_refresh() {
	let server = MockServer::start_async().await;
	let Harness { client, store, .. } = common::reqwest_harness(&server, stale_pair());
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).header("content-type", JSON).body(r#"{"token":"B"}"#);
		})
		.await;

	for (status, kind) in [
		(400, ErrorKind::Validation),
		(403, ErrorKind::Forbidden),
		(404, ErrorKind::NotFound),
		(409, ErrorKind::Conflict),
		(500, ErrorKind::Server),
		(503, ErrorKind::Server),
		(418, ErrorKind::Unknown),
	] {
		let path = format!("/status/{status}");
		let mock = server
			.mock_async(|when, then| {
				when.method(GET).path(path.as_str());
				then.status(status)
					.header("content-type", JSON)
					.body(format!(r#"{{"message":"failed with {status}"}}"#));
			})
			.await;

		assert!(!client.coordinator().is_refreshing());

		let err = client
			.get::<Value>(&path)
			.await
			.expect_err("Non-2xx responses should be returned as errors.");

		assert_eq!(err.kind(), kind, "status {status}");
		assert_eq!(err.status(), status);
		assert_eq!(err.message(), format!("failed with {status}"));
		assert!(!client.coordinator().is_refreshing());

		mock.assert_async().await;
	}

	refresh.assert_calls_async(0).await;

	assert_eq!(store.snapshot(), stale_pair());
}

#[tokio::test]
async fn rate_limit_carries_retry_after_hint() {
	let server = MockServer::start_async().await;
	let Harness { client, .. } = common::reqwest_harness(&server, stale_pair());
	let limited = server
		.mock_async(|when, then| {
			when.method(POST).path("/coffees");
			then.status(429)
				.header("content-type", JSON)
				.header("retry-after", "7")
				.body(r#"{"message":"Too many requests","statusCode":429}"#);
		})
		.await;
	let err = client
		.post::<_, Value>("/coffees", &serde_json::json!({ "name": "Yirgacheffe" }))
		.await
		.expect_err("Rate limited calls should fail.");

	assert_eq!(err.kind(), ErrorKind::RateLimit);
	assert_eq!(err.status(), 429);
	assert_eq!(err.retry_after(), Some(Duration::seconds(7)));
	assert!(err.should_retry());

	limited.assert_async().await;
}

#[tokio::test]
async fn validation_lists_are_joined() {
	let server = MockServer::start_async().await;
	let Harness { client, .. } = common::reqwest_harness(&server, stale_pair());
	let invalid = server
		.mock_async(|when, then| {
			when.method(PATCH).path("/coffees/42");
			then.status(400).header("content-type", JSON).body(
				r#"{"message":["name must not be empty","roastLevel is invalid"],"error":"Bad Request","statusCode":400}"#,
			);
		})
		.await;
	let err = client
		.patch::<_, Value>("/coffees/42", &serde_json::json!({ "name": "" }))
		.await
		.expect_err("Validation failures should surface.");

	assert_eq!(err.kind(), ErrorKind::Validation);
	assert_eq!(err.message(), "name must not be empty, roastLevel is invalid");
	assert_eq!(err.validation_errors(), ["name must not be empty", "roastLevel is invalid"]);

	invalid.assert_async().await;
}

#[tokio::test]
async fn rejected_refresh_clears_store_and_revokes_session() {
	let server = MockServer::start_async().await;
	let Harness { client, store, notifier } = common::reqwest_harness(&server, stale_pair());
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/coffees");
			then.status(401).header("content-type", JSON).body(r#"{"message":"jwt expired"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401)
				.header("content-type", JSON)
				.body(r#"{"message":"Invalid refresh token"}"#);
		})
		.await;
	let err = client
		.get::<Value>("/coffees")
		.await
		.expect_err("A rejected refresh should fail the original request.");

	assert_eq!(err.kind(), ErrorKind::Auth);
	assert_eq!(err.message(), "Session expired");
	assert!(err.should_clear_auth());
	assert!(store.snapshot().is_empty());
	assert_eq!(notifier.count(SessionEvent::Revoked), 1);
	assert!(!client.coordinator().is_refreshing());

	protected.assert_async().await;
	refresh.assert_async().await;
}

#[tokio::test]
async fn login_rejection_is_not_treated_as_expiry() {
	let server = MockServer::start_async().await;
	let Harness { client, store, notifier } =
		common::reqwest_harness(&server, CredentialPair::default());
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(401)
				.header("content-type", JSON)
				.body(r#"{"message":"Invalid credentials","statusCode":401}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).header("content-type", JSON).body(r#"{"token":"B"}"#);
		})
		.await;
	let err = client
		.login(&LoginRequest::new("ana@example.com", "wrong"))
		.await
		.expect_err("Bad credentials should fail the login.");

	assert_eq!(err.kind(), ErrorKind::Auth);
	assert_eq!(err.message(), "Invalid credentials");
	assert!(store.snapshot().is_empty());
	assert_eq!(notifier.count(SessionEvent::Revoked), 0);

	login.assert_async().await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn check_status_and_logout_round_trip() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let Harness { client, store, .. } = common::reqwest_harness(&server, stale_pair());
	let check = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth/check-token").header("authorization", "Bearer A");
			then.status(200)
				.header("content-type", JSON)
				.body(format!(r#"{{"message":"Token is valid","user":{USER_JSON}}}"#));
		})
		.await;
	let logout = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/logout")
				.header("authorization", "Bearer A")
				.json_body(serde_json::json!({ "refreshToken": "R" }));
			then.status(200).header("content-type", JSON).body(r#"{"message":"Logged out"}"#);
		})
		.await;
	let user = client.check_auth_status().await?;

	assert_eq!(user.name, "Ana");
	assert!(client.is_authenticated().await?);

	let response = client.logout(None).await?;

	assert_eq!(response.message, "Logged out");
	assert!(store.snapshot().is_empty());
	assert!(!client.is_authenticated().await?);

	check.assert_async().await;
	logout.assert_async().await;

	Ok(())
}

#[tokio::test]
async fn failed_logout_keeps_credentials() {
	let server = MockServer::start_async().await;
	let Harness { client, store, .. } = common::reqwest_harness(&server, stale_pair());
	let logout = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/logout");
			then.status(500).header("content-type", JSON).body(r#"{"message":"boom"}"#);
		})
		.await;
	let err = client.logout(Some("")).await.expect_err("Server failures should surface.");

	assert_eq!(err.kind(), ErrorKind::Server);
	assert_eq!(store.snapshot(), stale_pair());

	logout.assert_async().await;
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
	let config = ClientConfig::builder("http://127.0.0.1:1")
		.timeout(StdDuration::from_secs(2))
		.build()
		.expect("Loopback URL should build.");
	let Harness { client, notifier, .. } = common::reqwest_harness_with_config(config, stale_pair());
	let err = client.get::<Value>("/coffees").await.expect_err("Nothing listens on port 1.");

	assert_eq!(err.kind(), ErrorKind::Network);
	assert_eq!(err.status(), 0);
	assert_eq!(err.http_status(), None);
	assert_eq!(err.message(), "Network error - no response from server");
	assert_eq!(notifier.count(SessionEvent::Revoked), 0);
	assert!(!client.coordinator().is_refreshing());
}

#[tokio::test]
async fn timeouts_are_network_errors() {
	let server = MockServer::start_async().await;
	let config = ClientConfig::builder(server.base_url())
		.timeout(StdDuration::from_millis(100))
		.build()
		.expect("Mock server URL should build.");
	let Harness { client, store, notifier } =
		common::reqwest_harness_with_config(config, stale_pair());
	let _slow = server
		.mock_async(|when, then| {
			when.method(GET).path("/coffees");
			then.status(200).delay(StdDuration::from_millis(1_000)).body("{}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).header("content-type", JSON).body(r#"{"token":"B"}"#);
		})
		.await;
	let started = Instant::now();
	let err = client.get::<Value>("/coffees").await.expect_err("Slow responses should time out.");

	// The handshake succeeded and the configured timeout elapsed.
	assert!(started.elapsed() >= StdDuration::from_millis(100));
	assert_eq!(err.kind(), ErrorKind::Network);
	assert_eq!(err.status(), 0);
	assert!(!client.coordinator().is_refreshing());
	assert_eq!(client.coordinator().metrics().attempts(), 0);
	assert_eq!(store.snapshot(), stale_pair());
	assert_eq!(notifier.count(SessionEvent::Revoked), 0);

	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn explicit_refresh_rotates_refresh_token() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let Harness { client, store, notifier } = common::reqwest_harness(&server, stale_pair());
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.header("content-type", JSON)
				.body(r#"{"token":"B","refreshToken":"R2"}"#);
		})
		.await;
	let token = client.refresh_session().await?;

	assert_eq!(token, TokenSecret::new("B"));
	assert_eq!(store.snapshot(), CredentialPair::new("B", "R2"));
	assert_eq!(notifier.count(SessionEvent::Refreshed), 1);

	refresh.assert_async().await;

	Ok(())
}
