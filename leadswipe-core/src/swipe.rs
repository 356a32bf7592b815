//! Drag-gesture arithmetic for the review card.

use crate::types::{Decision, SwipeDirection};

const PIXELS_PER_DEGREE: f32 = 20.0;
const MAX_ROTATION_DEGREES: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwipeOutcome {
    Swipe(SwipeDirection),
    SuperLike,
    SnapBack,
}

impl SwipeOutcome {
    pub fn decision(self) -> Option<Decision> {
        match self {
            SwipeOutcome::Swipe(direction) => Some(direction.decision()),
            SwipeOutcome::SuperLike => Some(Decision::Superliked),
            SwipeOutcome::SnapBack => None,
        }
    }
}

/// An in-progress drag on the current card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeGesture {
    origin: (f32, f32),
    offset: (f32, f32),
    threshold: f32,
}

impl SwipeGesture {
    pub fn start(x: f32, y: f32, threshold: f32) -> Self {
        Self {
            origin: (x, y),
            offset: (0.0, 0.0),
            threshold,
        }
    }

    pub fn drag_to(&mut self, x: f32, y: f32) {
        self.offset = (x - self.origin.0, y - self.origin.1);
    }

    pub fn offset(&self) -> (f32, f32) {
        self.offset
    }

    /// Card tilt in degrees, positive to the right.
    pub fn rotation_degrees(&self) -> f32 {
        (self.offset.0 / PIXELS_PER_DEGREE).clamp(-MAX_ROTATION_DEGREES, MAX_ROTATION_DEGREES)
    }

    /// Decision the card would receive if released now, ignoring the
    /// threshold, with how close the drag is to committing it (0.0 to 1.0).
    pub fn hint(&self) -> Option<(Decision, f32)> {
        let (dx, dy) = self.offset;
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        if self.is_upward() {
            Some((Decision::Superliked, (-dy / self.threshold).min(1.0)))
        } else if dx > 0.0 {
            Some((Decision::Approved, (dx / self.threshold).min(1.0)))
        } else if dx < 0.0 {
            Some((Decision::Rejected, (-dx / self.threshold).min(1.0)))
        } else {
            None
        }
    }

    pub fn release(self) -> SwipeOutcome {
        let (dx, dy) = self.offset;
        if self.is_upward() && -dy > self.threshold {
            SwipeOutcome::SuperLike
        } else if dx > self.threshold {
            SwipeOutcome::Swipe(SwipeDirection::Right)
        } else if dx < -self.threshold {
            SwipeOutcome::Swipe(SwipeDirection::Left)
        } else {
            SwipeOutcome::SnapBack
        }
    }

    fn is_upward(&self) -> bool {
        let (dx, dy) = self.offset;
        dy < 0.0 && -dy > dx.abs()
    }
}
