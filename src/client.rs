//! Authenticated request pipeline.
//!
//! [`ApiClient::send`] wraps every transport call:
//!
//! 1. the current access token (if any) is attached as `Authorization: Bearer <token>`;
//! 2. the request is dispatched through the [`HttpTransport`];
//! 3. a 2xx response is returned unchanged;
//! 4. a 401 on a request that has not been retried yet engages the
//!    [`RefreshCoordinator`] and, once a new token is available, the request is replayed exactly
//!    once with that token;
//! 5. every other outcome, including a 401 on the replay, is normalized into an [`Error`].

pub mod auth;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	events::SessionNotifier,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::RefreshCoordinator,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestTransport};

/// Client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

const UNAUTHORIZED: u16 = 401;

/// Authenticated API client bound to one application session.
///
/// Owns the transport, credential store, and the session's [`RefreshCoordinator`]; clones share
/// all three, so concurrent requests from any clone coordinate on the same refresh.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	config: ClientConfig,
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over a caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
		notifier: Arc<dyn SessionNotifier>,
	) -> Self {
		let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), notifier));

		Self { config, transport: transport.into(), store, coordinator }
	}

	/// Validated configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Credential store shared with the coordinator.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Session-wide refresh coordinator.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Sends `request` through the authenticated pipeline.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.run(request)).await;

		obs::record_result(KIND, &result);

		result
	}

	/// Sends `request` and decodes the JSON response body.
	pub async fn send_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send(request).await?.json()
	}

	/// `GET path`, decoding the JSON body.
	pub async fn get<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send_json(ApiRequest::get(path)).await
	}

	/// `POST path` with a JSON body, decoding the JSON response.
	pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send_json(ApiRequest::post(path).with_json(body)?).await
	}

	/// `PATCH path` with a JSON body, decoding the JSON response.
	pub async fn patch<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send_json(ApiRequest::patch(path).with_json(body)?).await
	}

	/// `DELETE path`, discarding the response body.
	pub async fn delete(&self, path: &str) -> Result<()> {
		self.send(ApiRequest::delete(path)).await.map(drop)
	}

	async fn run(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		self.authorize(&mut request).await?;

		let response = self.dispatch(&request).await?;

		if response.is_success() {
			return Ok(response);
		}
		if response.status != UNAUTHORIZED || !request.may_refresh() {
			return Err(response.into_error());
		}

		request.mark_retried();

		let token = self.coordinator.obtain_token(self).await?;

		self.replay(request, &token).await
	}

	// Outgoing hook: attach the stored access token, if any.
	async fn authorize(&self, request: &mut ApiRequest) -> Result<()> {
		if let Some(token) = self.store.access_token().await? {
			request.set_bearer(&token);
		}

		Ok(())
	}

	async fn replay(&self, mut request: ApiRequest, token: &TokenSecret) -> Result<ApiResponse> {
		request.set_bearer(token);

		let response = self.dispatch(&request).await?;

		if response.is_success() { Ok(response) } else { Err(response.into_error()) }
	}

	/// Executes one transport call without any authentication handling.
	async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let url = self.config.endpoint(&request.path)?;

		obs::trace_dispatch(request.method, &request.path, request.is_retried());

		let response = self.transport.execute(url, request).await?;

		obs::trace_response(request.method, &request.path, response.status);

		Ok(response)
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client with its own reqwest transport using the configured timeout.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		notifier: Arc<dyn SessionNotifier>,
	) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::new(config.timeout)?;

		Ok(Self::with_transport(config, transport, store, notifier))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("timeout", &self.config.timeout)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}
