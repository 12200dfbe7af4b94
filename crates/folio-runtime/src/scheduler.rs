#![forbid(unsafe_code)]

//! Host-driven task scheduler.
//!
//! The scheduler never reads a wall clock. The host moves time forward with
//! [`Scheduler::pop_due`] (timers) and [`Scheduler::take_frames`] (animation
//! frames); the runtime dispatches what comes out to the owning controller.
//!
//! # Invariants
//!
//! 1. Every scheduling call returns a fresh [`TaskHandle`]; handles are never
//!    reused within a scheduler.
//! 2. A cancelled task never fires.
//! 3. Timers fire in `(due, handle)` order; the clock moves to each task's due
//!    time before it is returned, so tasks scheduled while dispatching land
//!    relative to that time.
//! 4. Interval tasks keep their handle and re-arm at `due + period`.
//! 5. Frame requests made while a frame is being dispatched wait for the next
//!    frame.
//! 6. Delays below [`MIN_TIMER_DELAY`] are raised to it, so a bounded advance
//!    always terminates.

use core::time::Duration;
use std::collections::{BTreeSet, HashMap};

use crate::behavior::Slot;

/// Smallest delay a timer can have.
pub const MIN_TIMER_DELAY: Duration = Duration::from_millis(1);

/// Cancellable handle for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cadence {
    Once,
    Every(Duration),
    Frame,
}

#[derive(Debug, Clone, Copy)]
struct Task {
    owner: Slot,
    due: Duration,
    cadence: Cadence,
}

/// A task that came due, ready for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTask {
    pub handle: TaskHandle,
    pub owner: Slot,
}

/// Deterministic timer and frame queue.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    tasks: HashMap<TaskHandle, Task>,
    timeline: BTreeSet<(Duration, TaskHandle)>,
    frames: Vec<TaskHandle>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Run once after `delay`.
    pub fn set_timeout(&mut self, owner: Slot, delay: Duration) -> TaskHandle {
        self.insert_timer(owner, delay, Cadence::Once)
    }

    /// Run every `period`, first after one period.
    pub fn set_interval(&mut self, owner: Slot, period: Duration) -> TaskHandle {
        let period = period.max(MIN_TIMER_DELAY);
        self.insert_timer(owner, period, Cadence::Every(period))
    }

    /// Run on the next animation frame.
    pub fn request_frame(&mut self, owner: Slot) -> TaskHandle {
        let handle = self.allocate();
        self.tasks.insert(
            handle,
            Task {
                owner,
                due: self.now,
                cadence: Cadence::Frame,
            },
        );
        self.frames.push(handle);
        handle
    }

    /// Cancel a pending task. Returns whether it was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let Some(task) = self.tasks.remove(&handle) else {
            return false;
        };
        match task.cadence {
            Cadence::Frame => self.frames.retain(|&h| h != handle),
            Cadence::Once | Cadence::Every(_) => {
                self.timeline.remove(&(task.due, handle));
            }
        }
        true
    }

    /// Cancel every task owned by `owner`, returning how many were dropped.
    pub fn cancel_owned(&mut self, owner: Slot) -> usize {
        let handles: Vec<TaskHandle> = self
            .tasks
            .iter()
            .filter(|(_, t)| t.owner == owner)
            .map(|(&h, _)| h)
            .collect();
        handles.into_iter().filter(|&h| self.cancel(h)).count()
    }

    /// Drop every pending task.
    pub fn cancel_all(&mut self) {
        self.tasks.clear();
        self.timeline.clear();
        self.frames.clear();
    }

    #[must_use]
    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle)
    }

    /// Number of pending timers and frame requests.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Due time of the earliest timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timeline.first().map(|&(due, _)| due)
    }

    #[must_use]
    pub fn has_pending_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Pop the earliest timer due at or before `limit`, moving the clock to
    /// its due time. Returns `None` (and moves the clock to `limit`) when
    /// nothing else is due.
    pub fn pop_due(&mut self, limit: Duration) -> Option<DueTask> {
        let Some(&(due, handle)) = self.timeline.first() else {
            self.settle(limit);
            return None;
        };
        if due > limit {
            self.settle(limit);
            return None;
        }
        self.timeline.remove(&(due, handle));
        self.now = self.now.max(due);

        let task = self.tasks.get_mut(&handle)?;
        let owner = task.owner;
        match task.cadence {
            Cadence::Every(period) => {
                task.due = due.saturating_add(period);
                let next = task.due;
                self.timeline.insert((next, handle));
            }
            Cadence::Once | Cadence::Frame => {
                self.tasks.remove(&handle);
            }
        }
        Some(DueTask { handle, owner })
    }

    /// Take the frame requests made before this call.
    pub fn take_frames(&mut self) -> Vec<DueTask> {
        let frames = std::mem::take(&mut self.frames);
        frames
            .into_iter()
            .filter_map(|handle| {
                let task = self.tasks.remove(&handle)?;
                Some(DueTask {
                    handle,
                    owner: task.owner,
                })
            })
            .collect()
    }

    fn settle(&mut self, limit: Duration) {
        self.now = self.now.max(limit);
    }

    fn allocate(&mut self) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        handle
    }

    fn insert_timer(&mut self, owner: Slot, delay: Duration, cadence: Cadence) -> TaskHandle {
        let handle = self.allocate();
        let due = self.now.saturating_add(delay.max(MIN_TIMER_DELAY));
        self.tasks.insert(
            handle,
            Task {
                owner,
                due,
                cadence,
            },
        );
        self.timeline.insert((due, handle));
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(s: &mut Scheduler, limit: Duration) -> Vec<(u64, TaskHandle)> {
        let mut fired = Vec::new();
        while let Some(due) = s.pop_due(limit) {
            fired.push((s.now().as_millis() as u64, due.handle));
        }
        fired
    }

    #[test]
    fn timers_fire_in_due_order() {
        let mut s = Scheduler::new();
        let late = s.set_timeout(Slot::Typing, ms(30));
        let early = s.set_timeout(Slot::Theme, ms(10));
        let tie = s.set_timeout(Slot::Stats, ms(10));

        assert_eq!(s.next_deadline(), Some(ms(10)));
        assert_eq!(drain(&mut s, ms(100)), vec![(10, early), (10, tie), (30, late)]);
        assert_eq!(s.now(), ms(100));
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn not_yet_due_timers_stay_pending() {
        let mut s = Scheduler::new();
        let h = s.set_timeout(Slot::Typing, ms(50));
        assert!(drain(&mut s, ms(49)).is_empty());
        assert_eq!(s.now(), ms(49));
        assert!(s.is_pending(h));
        assert_eq!(drain(&mut s, ms(50)), vec![(50, h)]);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut s = Scheduler::new();
        let a = s.set_timeout(Slot::Theme, ms(5));
        let b = s.set_interval(Slot::Stats, ms(5));
        let f = s.request_frame(Slot::SkillBars);
        assert!(s.cancel(a));
        assert!(s.cancel(b));
        assert!(s.cancel(f));
        assert!(!s.cancel(a));

        assert!(drain(&mut s, ms(100)).is_empty());
        assert!(s.take_frames().is_empty());
    }

    #[test]
    fn intervals_rearm_with_the_same_handle() {
        let mut s = Scheduler::new();
        let h = s.set_interval(Slot::Stats, ms(40));
        assert_eq!(drain(&mut s, ms(120)), vec![(40, h), (80, h), (120, h)]);
        assert!(s.is_pending(h));
        assert_eq!(s.next_deadline(), Some(ms(160)));
    }

    #[test]
    fn zero_delays_are_clamped() {
        let mut s = Scheduler::new();
        let h = s.set_timeout(Slot::Typing, Duration::ZERO);
        assert_eq!(s.next_deadline(), Some(MIN_TIMER_DELAY));
        let i = s.set_interval(Slot::Stats, Duration::ZERO);
        s.cancel(h);
        // Bounded: an interval clamped to 1ms fires 10 times in 10ms.
        assert_eq!(drain(&mut s, ms(10)).len(), 10);
        assert!(s.is_pending(i));
    }

    #[test]
    fn frames_requested_during_a_frame_wait() {
        let mut s = Scheduler::new();
        let first = s.request_frame(Slot::SkillBars);
        let taken = s.take_frames();
        assert_eq!(taken, vec![DueTask { handle: first, owner: Slot::SkillBars }]);

        let second = s.request_frame(Slot::SkillBars);
        assert_ne!(first, second);
        assert!(s.has_pending_frames());
        assert_eq!(s.take_frames().len(), 1);
        assert!(!s.has_pending_frames());
    }

    #[test]
    fn cancel_owned_only_touches_that_slot() {
        let mut s = Scheduler::new();
        s.set_timeout(Slot::Typing, ms(5));
        s.set_interval(Slot::Typing, ms(5));
        let keep = s.set_timeout(Slot::Theme, ms(5));
        assert_eq!(s.cancel_owned(Slot::Typing), 2);
        assert_eq!(s.pending(), 1);
        assert!(s.is_pending(keep));

        s.cancel_all();
        assert_eq!(s.pending(), 0);
        assert_eq!(s.next_deadline(), None);
    }
}
