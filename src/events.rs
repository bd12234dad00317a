//! Session lifecycle notifications.
//!
//! The [`RefreshCoordinator`](crate::refresh::RefreshCoordinator) announces session changes
//! through the [`SessionNotifier`] port it is constructed with. [`SessionEvents`] is the
//! in-process listener bus most applications plug into that port; tests usually supply their
//! own recording notifier instead.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Session lifecycle event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionEvent {
	/// Authentication failed permanently; the stored credentials were cleared.
	Revoked,
	/// A new access token was obtained.
	Refreshed,
}
impl SessionEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionEvent::Revoked => "auth:revoked",
			SessionEvent::Refreshed => "auth:refreshed",
		}
	}
}
impl Display for SessionEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outbound port notified about session lifecycle changes.
///
/// Calls are fire-and-forget; implementations must not block and must not panic.
pub trait SessionNotifier
where
	Self: Send + Sync,
{
	/// Publishes `event`.
	fn notify(&self, event: SessionEvent);
}

/// Notifier that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;
impl SessionNotifier for NoopNotifier {
	fn notify(&self, _event: SessionEvent) {}
}

/// Handle returned by [`SessionEvents::on`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Arc<dyn Fn() + Send + Sync>;

struct Listener {
	id: ListenerId,
	event: SessionEvent,
	handler: Handler,
}

/// In-process listener registry implementing [`SessionNotifier`].
#[derive(Default)]
pub struct SessionEvents {
	listeners: RwLock<Vec<Listener>>,
	next_id: AtomicU64,
}
impl SessionEvents {
	/// Registers `handler` for `event`.
	pub fn on(&self, event: SessionEvent, handler: impl Fn() + Send + Sync + 'static) -> ListenerId {
		let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));

		self.listeners.write().push(Listener { id, event, handler: Arc::new(handler) });

		id
	}

	/// Removes a listener; returns `false` if it was already gone.
	pub fn off(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.write();
		let before = listeners.len();

		listeners.retain(|listener| listener.id != id);

		listeners.len() != before
	}

	/// Invokes every handler registered for `event`, in registration order.
	///
	/// Handlers run outside the registry lock, so they may subscribe or unsubscribe.
	pub fn emit(&self, event: SessionEvent) {
		let handlers = self
			.listeners
			.read()
			.iter()
			.filter(|listener| listener.event == event)
			.map(|listener| listener.handler.clone())
			.collect::<Vec<_>>();

		for handler in handlers {
			handler();
		}
	}

	/// Number of handlers registered for `event`.
	pub fn listener_count(&self, event: SessionEvent) -> usize {
		self.listeners.read().iter().filter(|listener| listener.event == event).count()
	}
}
impl SessionNotifier for SessionEvents {
	fn notify(&self, event: SessionEvent) {
		self.emit(event);
	}
}
impl Debug for SessionEvents {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionEvents").field("listeners", &self.listeners.read().len()).finish()
	}
}
