//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
#[cfg(feature = "reqwest")] use httpmock::MockServer;
use parking_lot::Mutex;
// self
#[cfg(feature = "reqwest")]
use brewlog_client::{
	auth::CredentialPair,
	client::ReqwestApiClient,
	config::ClientConfig,
	http::ReqwestTransport,
	reqwest::Client as ReqwestClient,
	store::MemoryStore,
};
use brewlog_client::events::{SessionEvent, SessionNotifier};

/// Notifier that records every published event.
#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<SessionEvent>>);
impl RecordingNotifier {
	pub fn count(&self, event: SessionEvent) -> usize {
		self.0.lock().iter().filter(|e| **e == event).count()
	}
}
impl SessionNotifier for RecordingNotifier {
	fn notify(&self, event: SessionEvent) {
		self.0.lock().push(event);
	}
}

#[cfg(feature = "reqwest")]
pub struct Harness {
	pub client: ReqwestApiClient,
	pub store: Arc<MemoryStore>,
	pub notifier: Arc<RecordingNotifier>,
}

/// Builds a reqwest-backed client pointed at `server`, seeded with `pair`.
#[cfg(feature = "reqwest")]
pub fn reqwest_harness(server: &MockServer, pair: CredentialPair) -> Harness {
	let config = ClientConfig::builder(server.base_url())
		.build()
		.expect("Mock server URL should be a valid base URL.");

	reqwest_harness_with_config(config, pair)
}

/// Builds a reqwest transport that accepts the self-signed certificates produced by `httpmock`.
#[cfg(feature = "reqwest")]
pub fn test_reqwest_transport(config: &ClientConfig) -> ReqwestTransport {
	let client = ReqwestClient::builder()
		.timeout(config.timeout)
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestTransport::with_client(client)
}

#[cfg(feature = "reqwest")]
pub fn reqwest_harness_with_config(config: ClientConfig, pair: CredentialPair) -> Harness {
	let store = Arc::new(MemoryStore::with_credentials(pair));
	let notifier = Arc::new(RecordingNotifier::default());
	let transport = test_reqwest_transport(&config);
	let client =
		ReqwestApiClient::with_transport(config, transport, store.clone(), notifier.clone());

	Harness { client, store, notifier }
}

pub const USER_JSON: &str =
	r#"{"id":"u-1","name":"Ana","email":"ana@example.com","role":"USER"}"#;
