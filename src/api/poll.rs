//! Single-flight polling.
//!
//! Each tick takes a [`Ticket`]. A response is applied only if its ticket is
//! still the newest one when it resolves, so a slow request can never
//! overwrite the result of a later one. Stopping the guard ends the loop and
//! discards anything still in flight.

use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use leptos::task::spawn_local;
use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
struct Inner {
	latest: AtomicU64,
	stopped: AtomicBool,
}

/// Shared sequence guard. Cloning shares the same sequence.
#[derive(Clone, Debug, Default)]
pub struct SingleFlight {
	inner: Arc<Inner>,
}

impl SingleFlight {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a new request, superseding any still in flight. `None` once
	/// stopped.
	pub fn begin(&self) -> Option<Ticket> {
		if self.is_stopped() {
			return None;
		}
		Some(Ticket(self.inner.latest.fetch_add(1, Ordering::AcqRel) + 1))
	}

	pub fn is_current(&self, ticket: Ticket) -> bool {
		!self.is_stopped() && self.inner.latest.load(Ordering::Acquire) == ticket.0
	}

	pub fn stop(&self) {
		self.inner.stopped.store(true, Ordering::Release);
	}

	pub fn is_stopped(&self) -> bool {
		self.inner.stopped.load(Ordering::Acquire)
	}
}

/// Runs `fetch` now and then every `interval` until `guard` is stopped,
/// handing each still-current result to `apply`.
pub fn spawn_polling<T, Fut>(
	interval: Duration,
	guard: SingleFlight,
	fetch: impl Fn() -> Fut + 'static,
	apply: impl Fn(T) + 'static,
) where
	T: 'static,
	Fut: Future<Output = T> + 'static,
{
	let (fetch, apply) = (Rc::new(fetch), Rc::new(apply));
	spawn_local(async move {
		while let Some(ticket) = guard.begin() {
			let (guard, fetch, apply) = (guard.clone(), fetch.clone(), apply.clone());
			spawn_local(async move {
				let value = fetch().await;
				if guard.is_current(ticket) {
					apply(value);
				} else {
					debug!("Dropping stale poll response #{}", ticket.0);
				}
			});
			gloo_timers::future::sleep(interval).await;
		}
		debug!("Polling stopped");
	});
}
