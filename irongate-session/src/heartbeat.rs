//! Heartbeat bookkeeping.
//!
//! The monitor only counts; the session's heartbeat task owns the timer and
//! acts on the returned [`HeartbeatAction`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// What to do on a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Inbound traffic arrived during the interval: nothing to send.
    Idle,
    /// Send a Heartbeat.
    Send,
    /// Too many silent intervals: close the session without sending.
    Expire,
}

/// Per-session heartbeat counters.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    max_missed: u32,
    missed: AtomicU32,
    active: AtomicBool,
    last_activity: Mutex<Option<DateTime<Utc>>>,
}

impl HeartbeatMonitor {
    /// Creates a monitor that expires after `max_missed` silent intervals.
    #[must_use]
    pub fn new(max_missed: u32) -> Self {
        Self {
            max_missed: max_missed.max(1),
            missed: AtomicU32::new(0),
            active: AtomicBool::new(false),
            last_activity: Mutex::new(None),
        }
    }

    /// Records inbound traffic.
    pub fn on_inbound(&self) {
        self.missed.store(0, Ordering::Release);
        self.active.store(true, Ordering::Release);
        *self.last_activity.lock() = Some(Utc::now());
    }

    /// Records one elapsed interval.
    ///
    /// An interval with inbound traffic is not counted and needs no
    /// Heartbeat.
    pub fn on_tick(&self) -> HeartbeatAction {
        if self.active.swap(false, Ordering::AcqRel) {
            self.missed.store(0, Ordering::Release);
            return HeartbeatAction::Idle;
        }
        let missed = self.missed.fetch_add(1, Ordering::AcqRel) + 1;
        if missed >= self.max_missed {
            HeartbeatAction::Expire
        } else {
            HeartbeatAction::Send
        }
    }

    /// Clears the missed counter and the activity flag.
    pub fn reset(&self) {
        self.missed.store(0, Ordering::Release);
        self.active.store(false, Ordering::Release);
    }

    /// Returns the number of consecutive silent intervals.
    #[must_use]
    pub fn missed_count(&self) -> u32 {
        self.missed.load(Ordering::Acquire)
    }

    /// Returns when inbound traffic was last seen.
    #[must_use]
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        *self.last_activity.lock()
    }

    /// Returns the configured limit.
    #[must_use]
    pub const fn max_missed(&self) -> u32 {
        self.max_missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_after_max_silent_ticks() {
        let monitor = HeartbeatMonitor::new(5);
        let actions: Vec<_> = (0..5).map(|_| monitor.on_tick()).collect();
        assert_eq!(
            actions,
            vec![
                HeartbeatAction::Send,
                HeartbeatAction::Send,
                HeartbeatAction::Send,
                HeartbeatAction::Send,
                HeartbeatAction::Expire,
            ]
        );
        assert_eq!(monitor.missed_count(), 5);
    }

    #[test]
    fn test_inbound_resets() {
        let monitor = HeartbeatMonitor::new(2);
        assert_eq!(monitor.on_tick(), HeartbeatAction::Send);
        monitor.on_inbound();
        assert_eq!(monitor.missed_count(), 0);
        assert!(monitor.last_activity().is_some());
        assert_eq!(monitor.on_tick(), HeartbeatAction::Idle);
        assert_eq!(monitor.missed_count(), 0);
        assert_eq!(monitor.on_tick(), HeartbeatAction::Send);
        assert_eq!(monitor.on_tick(), HeartbeatAction::Expire);

        monitor.reset();
        assert_eq!(monitor.missed_count(), 0);
    }

    #[test]
    fn test_active_interval_is_idle() {
        let monitor = HeartbeatMonitor::new(1);
        monitor.on_inbound();
        assert_eq!(monitor.on_tick(), HeartbeatAction::Idle);
        assert_eq!(monitor.missed_count(), 0);
        assert_eq!(monitor.on_tick(), HeartbeatAction::Expire);
    }

    #[test]
    fn test_reset_clears_activity() {
        let monitor = HeartbeatMonitor::new(5);
        monitor.on_inbound();
        monitor.reset();
        assert_eq!(monitor.on_tick(), HeartbeatAction::Send);
        assert_eq!(monitor.missed_count(), 1);
    }
}
