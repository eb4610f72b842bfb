//! Cancellable One-Shot Timers
//!
//! Delayed continuations on a monotonic millisecond clock. A timer never
//! calls back on its own: the owner polls it from its update step and acts on
//! the returned [`TimerHandle`]. Every arm/cancel bumps the generation, so a
//! handle taken before a cancellation can be recognised as stale.

use serde::{Serialize, Deserialize};

/// Monotonic session time in milliseconds.
pub type Millis = u64;

/// Identity of one arming of a [`Timer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle {
    /// Generation of the owning timer when this arming was made.
    pub generation: u32,
    /// Absolute deadline.
    pub deadline: Millis,
}

/// A single cancellable deadline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Millis>,
    generation: u32,
}

impl Timer {
    /// Create a disarmed timer.
    pub const fn new() -> Self {
        Self {
            deadline: None,
            generation: 0,
        }
    }

    /// Arm the timer to fire `delay` after `now`, replacing any previous arming.
    pub fn arm(&mut self, now: Millis, delay: Millis) -> TimerHandle {
        self.arm_at(now.saturating_add(delay))
    }

    /// Arm the timer with an absolute deadline.
    pub fn arm_at(&mut self, deadline: Millis) -> TimerHandle {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = Some(deadline);
        TimerHandle {
            generation: self.generation,
            deadline,
        }
    }

    /// Disarm the timer. Idempotent; returns whether an arming was retired.
    pub fn cancel(&mut self) -> bool {
        if self.deadline.take().is_some() {
            self.generation = self.generation.wrapping_add(1);
            true
        } else {
            false
        }
    }

    /// Is the timer currently armed?
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Absolute deadline of the current arming.
    #[inline]
    pub fn deadline(&self) -> Option<Millis> {
        self.deadline
    }

    /// Has the current arming reached its deadline? Does not disarm.
    #[inline]
    pub fn is_elapsed(&self, now: Millis) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Time left before the deadline, if armed.
    pub fn remaining(&self, now: Millis) -> Option<Millis> {
        self.deadline.map(|d| d.saturating_sub(now))
    }

    /// Fire the timer if its deadline has passed.
    ///
    /// Returns the handle of the arming that fired and disarms the timer.
    pub fn poll(&mut self, now: Millis) -> Option<TimerHandle> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(TimerHandle {
                    generation: self.generation,
                    deadline,
                })
            }
            _ => None,
        }
    }

    /// Does `handle` still describe the live arming of this timer?
    #[inline]
    pub fn is_current(&self, handle: TimerHandle) -> bool {
        self.deadline == Some(handle.deadline) && self.generation == handle.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_once() {
        let mut timer = Timer::new();
        timer.arm(100, 50);

        assert!(timer.poll(149).is_none());
        let fired = timer.poll(150).expect("timer should fire at deadline");
        assert_eq!(fired.deadline, 150);
        assert!(timer.poll(200).is_none());
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut timer = Timer::new();
        timer.arm(0, 10);

        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert!(timer.poll(1_000).is_none());
    }

    #[test]
    fn test_stale_handle_after_cancel() {
        let mut timer = Timer::new();
        let handle = timer.arm(0, 10);
        assert!(timer.is_current(handle));

        timer.cancel();
        assert!(!timer.is_current(handle));

        // Re-arming with the same deadline is still a different arming
        let rearmed = timer.arm(0, 10);
        assert!(!timer.is_current(handle));
        assert!(timer.is_current(rearmed));
    }

    #[test]
    fn test_remaining() {
        let mut timer = Timer::new();
        assert_eq!(timer.remaining(0), None);

        timer.arm(10, 30);
        assert_eq!(timer.remaining(20), Some(20));
        assert_eq!(timer.remaining(90), Some(0));
        assert!(timer.is_elapsed(40));
        assert!(!timer.is_elapsed(39));
    }
}
