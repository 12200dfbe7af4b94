#![forbid(unsafe_code)]

//! Small animation primitives shared by the controllers.
//!
//! Two shapes cover the page: fixed-step ramps (skill bars, counters), where a
//! value climbs to its target in `n` equal steps and the last step lands on
//! the target exactly, and time-based tweens (the fallback smooth scroll).

use core::time::Duration;

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f64) -> f64;

/// Identity easing (constant velocity).
#[inline]
pub fn linear(t: f64) -> f64 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in-out (slow start and end).
#[inline]
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// A ramp from 0 to `target` in `steps` equal increments.
///
/// # Invariants
///
/// 1. `value()` is non-decreasing across `advance()` calls.
/// 2. After `steps` advances, `value() == target` exactly and the ramp is done.
/// 3. Advancing a finished ramp is a no-op.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRamp {
    target: f64,
    steps: u32,
    step: u32,
}

impl StepRamp {
    /// `steps` of zero behaves as one step.
    #[must_use]
    pub fn new(target: f64, steps: u32) -> Self {
        Self {
            target,
            steps: steps.max(1),
            step: 0,
        }
    }

    /// Move one step; returns the new value.
    pub fn advance(&mut self) -> f64 {
        if self.step < self.steps {
            self.step += 1;
        }
        self.value()
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        if self.step >= self.steps {
            self.target
        } else {
            (self.target * f64::from(self.step) / f64::from(self.steps)).min(self.target)
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.step >= self.steps
    }

    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    #[must_use]
    pub fn step(&self) -> u32 {
        self.step
    }
}

/// Time-based interpolation between two values.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    from: f64,
    to: f64,
    start: Duration,
    duration: Duration,
    easing: EasingFn,
}

impl Tween {
    #[must_use]
    pub fn new(from: f64, to: f64, start: Duration, duration: Duration) -> Self {
        Self {
            from,
            to,
            start,
            duration,
            easing: ease_in_out,
        }
    }

    #[must_use]
    pub fn with_easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Normalized progress at `now`, in [0, 1].
    #[must_use]
    pub fn progress(&self, now: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// Interpolated value at `now`; exactly `to` once finished.
    #[must_use]
    pub fn value_at(&self, now: Duration) -> f64 {
        let p = self.progress(now);
        if p >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * (self.easing)(p)
    }

    #[must_use]
    pub fn is_done(&self, now: Duration) -> bool {
        self.progress(now) >= 1.0
    }
}
