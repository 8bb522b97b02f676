//! Time-bounded linear volume ramp
//!
//! Progress is the ratio of elapsed time to duration, so the ramp lands on
//! its target at or after `duration` no matter how unevenly ticks arrive.

/// Slack for accumulated tick rounding when checking completion
const COMPLETE_EPSILON: f32 = 1e-6;

/// A linear ramp from a start level to a target level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl Fade {
    /// Ramp from `start` down to silence
    pub fn to_zero(start: f32, duration: f32) -> Self {
        Self::new(start, 0.0, duration)
    }

    /// Ramp from silence up to `target`
    pub fn up_to(target: f32, duration: f32) -> Self {
        Self::new(0.0, target, duration)
    }

    fn new(from: f32, to: f32, duration: f32) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Advance by `dt` seconds and return the new level
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += dt.max(0.0);
        self.level()
    }

    /// Current level
    pub fn level(&self) -> f32 {
        if self.is_complete() {
            return self.to;
        }
        let ratio = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * ratio
    }

    /// Whether the ramp has reached its target
    pub fn is_complete(&self) -> bool {
        self.elapsed + COMPLETE_EPSILON >= self.duration
    }
}
