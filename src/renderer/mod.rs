//! Rendering-side bookkeeping
//!
//! Drawing itself belongs to the host; this module only tracks which note
//! visuals exist and how they change from one snapshot to the next.

pub mod scene;

pub use scene::{Frame, Hud, SceneCommand, SceneTracker, Sprite, TailRect};
