//! Connection state machine.
//!
//! Pure transition logic, free of I/O and timers. The driver feeds it
//! transport results and host commands and carries out the returned
//! [`Step`]. Every attempt is tagged with an epoch; results and timer
//! expiries from an older epoch are ignored, which is what makes late
//! timers and stale sockets harmless after `disconnect()`.

use crate::types::ConnectionState;

/// Action the driver must take after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing to do.
    Noop,
    /// Open the transport, tagging results with `epoch`.
    StartAttempt { epoch: u64 },
    /// Arm the single deferred reconnect for `epoch`.
    ScheduleReconnect { epoch: u64, attempt: u32 },
    /// Budget exhausted; the machine is now `Closed`.
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    attempts: u32,
    max_attempts: u32,
    epoch: u64,
    reconnect_pending: bool,
}

impl ConnectionMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            max_attempts,
            epoch: 0,
            reconnect_pending: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current value of the reconnect counter.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Whether `epoch` refers to the live attempt or connection.
    pub fn is_current(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }

    /// Host connect. Idempotent while connecting or connected.
    ///
    /// Leaving `Closed` resets the counter. From `Reconnecting` the pending
    /// timer is superseded and the attempt starts now.
    pub fn begin_connect(&mut self) -> Step {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => Step::Noop,
            ConnectionState::Closed => {
                self.attempts = 0;
                self.start_attempt()
            }
            ConnectionState::Disconnected | ConnectionState::Reconnecting { .. } => {
                self.start_attempt()
            }
        }
    }

    /// Transport opened. Returns `false` for a stale epoch.
    pub fn on_open(&mut self, epoch: u64) -> bool {
        if !self.is_current(epoch) || self.state != ConnectionState::Connecting {
            return false;
        }
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        true
    }

    /// Transport failed before opening, or an open connection closed
    /// without a host `disconnect()`.
    pub fn on_lost(&mut self, epoch: u64) -> Step {
        if !self.is_current(epoch) || self.reconnect_pending {
            return Step::Noop;
        }
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                if self.attempts < self.max_attempts {
                    self.attempts += 1;
                    self.reconnect_pending = true;
                    self.state = ConnectionState::Reconnecting {
                        attempt: self.attempts,
                    };
                    Step::ScheduleReconnect {
                        epoch,
                        attempt: self.attempts,
                    }
                } else {
                    self.state = ConnectionState::Closed;
                    Step::GiveUp
                }
            }
            _ => Step::Noop,
        }
    }

    /// The deferred reconnect fired. No-op unless it is still the pending
    /// timer of the current epoch.
    pub fn on_reconnect_due(&mut self, epoch: u64) -> Step {
        let live = self.is_current(epoch)
            && self.reconnect_pending
            && matches!(self.state, ConnectionState::Reconnecting { .. });
        if !live {
            return Step::Noop;
        }
        self.start_attempt()
    }

    /// Host disconnect: clean, resumable stop.
    pub fn disconnect(&mut self) {
        self.epoch += 1;
        self.reconnect_pending = false;
        self.attempts = 0;
        self.state = ConnectionState::Disconnected;
    }

    /// Host reconnect: drop everything in flight, reset the counter and
    /// connect unconditionally.
    pub fn reset(&mut self) -> Step {
        self.disconnect();
        self.start_attempt()
    }

    fn start_attempt(&mut self) -> Step {
        self.epoch += 1;
        self.reconnect_pending = false;
        self.state = ConnectionState::Connecting;
        Step::StartAttempt { epoch: self.epoch }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(max: u32) -> (ConnectionMachine, u64) {
        let mut m = ConnectionMachine::new(max);
        let Step::StartAttempt { epoch } = m.begin_connect() else {
            panic!("expected attempt");
        };
        assert!(m.on_open(epoch));
        (m, epoch)
    }

    /// Drives one lost → timer → attempt cycle and returns the new epoch.
    fn lose_and_retry(m: &mut ConnectionMachine, epoch: u64) -> u64 {
        let Step::ScheduleReconnect { epoch: e, .. } = m.on_lost(epoch) else {
            panic!("expected reconnect, state {:?}", m.state());
        };
        let Step::StartAttempt { epoch } = m.on_reconnect_due(e) else {
            panic!("expected attempt");
        };
        epoch
    }

    #[test]
    fn connect_then_open() {
        let (m, _) = connected(5);
        assert_eq!(m.state(), ConnectionState::Connected);
        assert_eq!(m.attempts(), 0);
    }

    #[test]
    fn connect_is_idempotent() {
        let mut m = ConnectionMachine::new(5);
        assert!(matches!(m.begin_connect(), Step::StartAttempt { .. }));
        assert_eq!(m.begin_connect(), Step::Noop);
        assert_eq!(m.state(), ConnectionState::Connecting);

        let (mut m, _) = connected(5);
        assert_eq!(m.begin_connect(), Step::Noop);
        assert_eq!(m.state(), ConnectionState::Connected);
    }

    #[test]
    fn unexpected_close_schedules_one_reconnect() {
        let (mut m, epoch) = connected(5);
        assert_eq!(
            m.on_lost(epoch),
            Step::ScheduleReconnect { epoch, attempt: 1 }
        );
        assert_eq!(m.state(), ConnectionState::Reconnecting { attempt: 1 });
        assert!(m.reconnect_pending());

        // Second close while a reconnect is pending.
        assert_eq!(m.on_lost(epoch), Step::Noop);
        assert_eq!(m.attempts(), 1);
    }

    #[test]
    fn recovers_from_fewer_closes_than_budget() {
        for n in 1..5 {
            let (mut m, mut epoch) = connected(5);
            for _ in 0..n {
                epoch = lose_and_retry(&mut m, epoch);
                assert!(m.on_open(epoch));
                assert_eq!(m.state(), ConnectionState::Connected);
                assert_eq!(m.attempts(), 0);
            }
        }
    }

    #[test]
    fn exhausting_budget_closes() {
        let mut m = ConnectionMachine::new(5);
        let Step::StartAttempt { mut epoch } = m.begin_connect() else {
            panic!("expected attempt");
        };
        for attempt in 1..=5 {
            let step = m.on_lost(epoch);
            assert_eq!(step, Step::ScheduleReconnect { epoch, attempt });
            let Step::StartAttempt { epoch: next } = m.on_reconnect_due(epoch) else {
                panic!("expected attempt");
            };
            epoch = next;
        }
        assert_eq!(m.on_lost(epoch), Step::GiveUp);
        assert_eq!(m.state(), ConnectionState::Closed);

        // Closed is never left automatically.
        assert_eq!(m.on_lost(epoch), Step::Noop);
        assert_eq!(m.on_reconnect_due(epoch), Step::Noop);
        assert_eq!(m.state(), ConnectionState::Closed);
    }

    #[test]
    fn reset_leaves_closed() {
        let mut m = ConnectionMachine::new(0);
        let Step::StartAttempt { epoch } = m.begin_connect() else {
            panic!("expected attempt");
        };
        assert_eq!(m.on_lost(epoch), Step::GiveUp);

        assert!(matches!(m.reset(), Step::StartAttempt { .. }));
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert_eq!(m.attempts(), 0);
    }

    #[test]
    fn connect_from_closed_resets_counter() {
        let mut m = ConnectionMachine::new(1);
        let Step::StartAttempt { epoch } = m.begin_connect() else {
            panic!("expected attempt");
        };
        let epoch = lose_and_retry(&mut m, epoch);
        assert_eq!(m.on_lost(epoch), Step::GiveUp);
        assert_eq!(m.attempts(), 1);

        assert!(matches!(m.begin_connect(), Step::StartAttempt { .. }));
        assert_eq!(m.attempts(), 0);
    }

    #[test]
    fn disconnect_invalidates_pending_timer() {
        let (mut m, epoch) = connected(5);
        let Step::ScheduleReconnect { epoch: timer, .. } = m.on_lost(epoch) else {
            panic!("expected reconnect");
        };
        m.disconnect();
        assert_eq!(m.state(), ConnectionState::Disconnected);

        // Timer fires late.
        assert_eq!(m.on_reconnect_due(timer), Step::Noop);
        assert_eq!(m.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn stale_open_and_close_are_ignored() {
        let mut m = ConnectionMachine::new(5);
        let Step::StartAttempt { epoch: old } = m.begin_connect() else {
            panic!("expected attempt");
        };
        m.disconnect();
        let Step::StartAttempt { epoch: new } = m.begin_connect() else {
            panic!("expected attempt");
        };
        assert_ne!(old, new);

        assert!(!m.on_open(old));
        assert_eq!(m.on_lost(old), Step::Noop);
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert!(m.on_open(new));
    }

    #[test]
    fn connect_while_reconnecting_supersedes_timer() {
        let (mut m, epoch) = connected(5);
        let Step::ScheduleReconnect { epoch: timer, .. } = m.on_lost(epoch) else {
            panic!("expected reconnect");
        };
        assert!(matches!(m.begin_connect(), Step::StartAttempt { .. }));
        assert!(!m.reconnect_pending());
        assert_eq!(m.on_reconnect_due(timer), Step::Noop);
        assert_eq!(m.attempts(), 1);
    }
}
