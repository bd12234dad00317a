//! Single-flight access-token refresh with waiter fan-out.
//!
//! [`RefreshCoordinator::obtain_token`] is entered by every request that observed a 401. The
//! first caller becomes the leader: it reads the refresh token, performs exactly one refresh
//! call through a [`TokenRefresher`], and settles the outcome. Callers arriving while the leader
//! is in flight register a waiter and suspend until that outcome is delivered to them, in FIFO
//! order. A failed refresh is terminal for the session: the store is cleared, the notifier
//! receives [`SessionEvent::Revoked`] once, and every participant gets
//! [`Error::session_expired`].

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	events::{SessionEvent, SessionNotifier},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::CredentialStore,
};

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<RefreshedTokens>> + 'a + Send>>;

/// Performs the network call that exchanges a refresh token for a new access token.
pub trait TokenRefresher
where
	Self: Send + Sync,
{
	/// Exchanges `refresh_token`. Any error is terminal for the current refresh cycle.
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a>;
}

/// Tokens returned by a successful refresh call.
#[derive(Clone, Debug)]
pub struct RefreshedTokens {
	/// Replacement access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token, when the server issued one.
	pub refresh_token: Option<TokenSecret>,
}
impl RefreshedTokens {
	/// Wraps an access token without rotation.
	pub fn access(token: impl Into<TokenSecret>) -> Self {
		Self { access_token: token.into(), refresh_token: None }
	}
}

type Waiter = oneshot::Sender<Result<TokenSecret>>;

#[derive(Default)]
struct RefreshState {
	refreshing: bool,
	waiters: VecDeque<Waiter>,
}

enum Entry<'a> {
	Leader(LeaderGuard<'a>),
	Waiter(oneshot::Receiver<Result<TokenSecret>>),
}

/// Owns the refresh flag and waiter queue for one application session.
pub struct RefreshCoordinator {
	store: Arc<dyn CredentialStore>,
	notifier: Arc<dyn SessionNotifier>,
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator that writes to `store` and reports to `notifier`.
	pub fn new(store: Arc<dyn CredentialStore>, notifier: Arc<dyn SessionNotifier>) -> Self {
		Self { store, notifier, state: Default::default(), metrics: Default::default() }
	}

	/// `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Number of callers currently suspended on the in-flight refresh.
	pub fn pending_waiters(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Counters describing refresh cycles so far.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns a fresh access token, refreshing at most once across concurrent callers.
	///
	/// Every failure is reported as [`Error::session_expired`]; the underlying cause is only
	/// logged.
	pub async fn obtain_token<R>(&self, refresher: &R) -> Result<TokenSecret>
	where
		R: ?Sized + TokenRefresher,
	{
		const KIND: FlowKind = FlowKind::Refresh;

		let leader = match self.enter() {
			Entry::Leader(guard) => guard,
			Entry::Waiter(receiver) => {
				self.metrics.record_waiter();

				return receiver.await.unwrap_or_else(|_| Err(Self::abandoned()));
			},
		};
		let span = FlowSpan::new(KIND, "obtain_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span
			.instrument(async move {
				match self.refresh_once(refresher).await {
					Ok(token) => {
						self.metrics.record_success();
						leader.settle(Ok(token.clone()));
						self.notifier.notify(SessionEvent::Refreshed);

						Ok(token)
					},
					Err(cause) => {
						obs::trace_refresh_failure(&cause);
						self.metrics.record_failure();

						if let Err(e) = self.store.clear_tokens().await {
							obs::trace_store_failure("clear_tokens", &e.into());
						}

						let expired = Error::session_expired();

						leader.settle(Err(expired.clone()));
						self.notifier.notify(SessionEvent::Revoked);

						Err(expired)
					},
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	async fn refresh_once<R>(&self, refresher: &R) -> Result<TokenSecret>
	where
		R: ?Sized + TokenRefresher,
	{
		let refresh_token = self
			.store
			.refresh_token()
			.await?
			.ok_or_else(|| Error::unknown("No refresh token available"))?;
		let RefreshedTokens { access_token, refresh_token: rotated } =
			refresher.refresh(&refresh_token).await?;

		match rotated {
			Some(rotated) => self.store.set_tokens(access_token.clone(), rotated).await?,
			None => self.store.set_access_token(access_token.clone()).await?,
		}

		Ok(access_token)
	}

	fn enter(&self) -> Entry<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			let (sender, receiver) = oneshot::channel();

			state.waiters.push_back(sender);

			Entry::Waiter(receiver)
		} else {
			state.refreshing = true;

			Entry::Leader(LeaderGuard { coordinator: self, settled: false })
		}
	}

	// The flag is cleared and the queue drained under one lock acquisition.
	fn settle(&self, outcome: Result<TokenSecret>) {
		let waiters = {
			let mut state = self.state.lock();

			state.refreshing = false;

			mem::take(&mut state.waiters)
		};

		for waiter in waiters {
			let _ = waiter.send(outcome.clone());
		}
	}

	fn abandoned() -> Error {
		Error::unknown("Token refresh was abandoned before completing")
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &state.refreshing)
			.field("waiters", &state.waiters.len())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Leader handle; dropping it unsettled releases every waiter with an abandonment error.
struct LeaderGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl LeaderGuard<'_> {
	fn settle(mut self, outcome: Result<TokenSecret>) {
		self.settled = true;
		self.coordinator.settle(outcome);
	}
}
impl Drop for LeaderGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.settle(Err(RefreshCoordinator::abandoned()));
		}
	}
}
