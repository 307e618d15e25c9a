//! Immutable 2D point

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A point on the playfield (pixels, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(Vec2);

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.0.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.0.y
    }

    /// Return a new position offset by `(dx, dy)`
    #[inline]
    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self(self.0 + Vec2::new(dx, dy))
    }
}
