//! crates/discovery_core/src/swipe.rs
//!
//! Turns a continuous horizontal drag into a discrete like/dislike decision.

use crate::domain::ActionKind;

/// Maximum card tilt, reached at the threshold.
const MAX_ROTATION_DEGREES: f32 = 15.0;
/// Lowest card opacity, reached at twice the threshold.
const MIN_ALPHA: f32 = 0.4;

/// Classifies a released drag. Exactly `+threshold` or `-threshold` is a cancel.
pub fn classify_release(offset: f32, threshold: f32) -> Option<ActionKind> {
    if offset > threshold {
        Some(ActionKind::Like)
    } else if offset < -threshold {
        Some(ActionKind::Dislike)
    } else {
        None
    }
}

/// Drag state for the card currently on top.
#[derive(Debug, Clone)]
pub struct SwipeTracker {
    offset: f32,
    threshold: f32,
}

impl SwipeTracker {
    pub fn new(threshold: f32) -> Self {
        Self {
            offset: 0.0,
            threshold: threshold.abs(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn drag_by(&mut self, delta: f32) {
        self.offset += delta;
    }

    /// Tilt proportional to the offset, clamped at the threshold.
    pub fn rotation_degrees(&self) -> f32 {
        if self.threshold == 0.0 {
            return 0.0;
        }
        (self.offset / self.threshold).clamp(-1.0, 1.0) * MAX_ROTATION_DEGREES
    }

    /// Fades the card as it moves away from the centre.
    pub fn alpha(&self) -> f32 {
        if self.threshold == 0.0 {
            return 1.0;
        }
        let progress = (self.offset.abs() / (2.0 * self.threshold)).min(1.0);
        1.0 - progress * (1.0 - MIN_ALPHA)
    }

    /// Ends the gesture. The offset always returns to zero; only a drag past the
    /// threshold yields a decision.
    pub fn release(&mut self) -> Option<ActionKind> {
        let decision = classify_release(self.offset, self.threshold);
        self.offset = 0.0;
        decision
    }
}
