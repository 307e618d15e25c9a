//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One fixed-interval Tick per step
//! - Seeded pseudo-random sequence only
//! - Snapshots are never mutated after being produced
//! - No rendering, audio or platform dependencies

pub mod action;
pub mod position;
pub mod rng;
pub mod state;

pub use action::Action;
pub use position::Position;
pub use rng::{Draw, RngSequence};
pub use state::{ColumnColour, GHOST_NOTE_ID, GameState, InstrumentEvent, Note};
