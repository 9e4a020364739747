//! Toast lifecycle manager.
//!
//! Every toast owns two timers: the enter timer (`Entering → Visible`) and
//! the exit timer (`→ Exiting → Removed`). Each timer is a spawned task
//! paired with a [`CancellationToken`] stored on the toast. Timers re-check
//! their token under the manager lock before touching state, so a timer
//! that loses a race with [`ToastManager::dismiss`] does nothing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use taskbell_protocol::Notification;

use crate::toast::{Toast, ToastEvent, ToastPhase, ToastTimings};

const EVENT_CAPACITY: usize = 64;

struct Entry {
    toast: Toast,
    enter: CancellationToken,
    exit: CancellationToken,
}

#[derive(Default)]
struct State {
    toasts: BTreeMap<u64, Entry>,
    next_id: u64,
}

struct Shared {
    state: Mutex<State>,
    events_tx: broadcast::Sender<ToastEvent>,
    timings: ToastTimings,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, id: u64, phase: ToastPhase) {
        trace!(id, phase = phase.label(), "toast phase");
        let _ = self.events_tx.send(ToastEvent { id, phase });
    }

    fn finish_enter(&self, id: u64, token: &CancellationToken) {
        let mut state = self.lock();
        if token.is_cancelled() {
            return;
        }
        match state.toasts.get_mut(&id) {
            Some(entry) if entry.toast.phase == ToastPhase::Entering => {
                entry.toast.phase = ToastPhase::Visible;
                self.emit(id, ToastPhase::Visible);
            }
            _ => {}
        }
    }

    /// Automatic exit. Returns whether the removal delay should follow.
    fn begin_exit(&self, id: u64, token: &CancellationToken) -> bool {
        let mut state = self.lock();
        if token.is_cancelled() {
            return false;
        }
        let Some(entry) = state.toasts.get_mut(&id) else {
            return false;
        };
        entry.enter.cancel();
        entry.toast.phase = ToastPhase::Exiting;
        self.emit(id, ToastPhase::Exiting);
        true
    }

    fn remove(&self, id: u64, token: &CancellationToken) {
        let mut state = self.lock();
        if token.is_cancelled() {
            return;
        }
        if state.toasts.remove(&id).is_some() {
            debug!(id, "toast removed");
            self.emit(id, ToastPhase::Removed);
        }
    }
}

/// Owns the active toasts and their timers.
///
/// Must be used inside a tokio runtime. Dropping the manager disposes it.
pub struct ToastManager {
    shared: Arc<Shared>,
}

impl ToastManager {
    pub fn new(timings: ToastTimings) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                events_tx,
                timings,
            }),
        }
    }

    pub fn timings(&self) -> ToastTimings {
        self.shared.timings
    }

    /// Surfaces `notification` as a new toast in `Entering` and arms both
    /// timers. Returns the toast id.
    pub fn show(&self, notification: Notification) -> u64 {
        let enter = CancellationToken::new();
        let exit = CancellationToken::new();

        let id = {
            let mut state = self.shared.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.toasts.insert(
                id,
                Entry {
                    toast: Toast {
                        id,
                        notification,
                        phase: ToastPhase::Entering,
                        created_at: Instant::now(),
                    },
                    enter: enter.clone(),
                    exit: exit.clone(),
                },
            );
            self.shared.emit(id, ToastPhase::Entering);
            id
        };
        debug!(id, "toast shown");

        let shared = self.shared.clone();
        let delay = self.shared.timings.enter;
        tokio::spawn(async move {
            tokio::select! {
                _ = enter.cancelled() => {}
                _ = tokio::time::sleep(delay) => shared.finish_enter(id, &enter),
            }
        });

        spawn_exit(self.shared.clone(), id, Some(self.shared.timings.display), exit);
        id
    }

    /// Starts the exit of toast `id` now.
    ///
    /// Cancels the pending automatic exit, moves the toast to `Exiting` and
    /// removes it after the exit delay. Returns `false` if the toast is
    /// unknown or already exiting; its removal is then left untouched.
    pub fn dismiss(&self, id: u64) -> bool {
        let token = {
            let mut state = self.shared.lock();
            let Some(entry) = state.toasts.get_mut(&id) else {
                return false;
            };
            if entry.toast.phase == ToastPhase::Exiting {
                return false;
            }
            entry.enter.cancel();
            entry.exit.cancel();
            let token = CancellationToken::new();
            entry.exit = token.clone();
            entry.toast.phase = ToastPhase::Exiting;
            self.shared.emit(id, ToastPhase::Exiting);
            token
        };
        debug!(id, "toast dismissed");
        spawn_exit(self.shared.clone(), id, None, token);
        true
    }

    pub fn get(&self, id: u64) -> Option<Toast> {
        self.shared.lock().toasts.get(&id).map(|e| e.toast.clone())
    }

    /// Active toasts, oldest first.
    pub fn active(&self) -> Vec<Toast> {
        self.shared
            .lock()
            .toasts
            .values()
            .map(|e| e.toast.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().toasts.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ToastEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Cancels every timer and removes every toast.
    pub fn dispose(&self) {
        let mut state = self.shared.lock();
        let count = state.toasts.len();
        for (id, entry) in std::mem::take(&mut state.toasts) {
            entry.enter.cancel();
            entry.exit.cancel();
            self.shared.emit(id, ToastPhase::Removed);
        }
        if count > 0 {
            debug!(count, "toasts disposed");
        }
    }
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new(ToastTimings::default())
    }
}

impl Drop for ToastManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ToastManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastManager")
            .field("active", &self.len())
            .field("timings", &self.shared.timings)
            .finish()
    }
}

/// Arms the exit timer. With a `lead`, waits that long and enters
/// `Exiting` first; then removes after the exit delay.
fn spawn_exit(shared: Arc<Shared>, id: u64, lead: Option<Duration>, token: CancellationToken) {
    tokio::spawn(async move {
        if let Some(lead) = lead {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(lead) => {}
            }
            if !shared.begin_exit(id, &token) {
                return;
            }
        }
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(shared.timings.exit) => shared.remove(id, &token),
        }
    });
}
