//! Lanefall - a four-lane falling-note rhythm game engine
//!
//! Core modules:
//! - `sim`: Deterministic state machine (notes, judgement, scoring)
//! - `stream`: Merges timed input sources and folds them through `sim`
//! - `song`: Chart loading into instrument events
//! - `audio`: Sound commands derived from each snapshot
//! - `renderer`: Scene bookkeeping derived from each snapshot
//! - `autoplay`: Seeded demo player
//! - `settings`: Runtime preferences

pub mod audio;
pub mod autoplay;
pub mod input;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod song;
pub mod stream;

pub use settings::Settings;
pub use sim::{Action, ColumnColour, GameState, InstrumentEvent, Note};
pub use song::{Song, SongError};
pub use stream::{GameRun, KeyEdge, KeyInput, Schedule, Session, TimedAction};

/// Game configuration constants
pub mod consts {
    /// Interval between simulation ticks (ms)
    pub const TICK_RATE_MS: u64 = 10;
    /// Distance a note falls per tick
    pub const PIXEL_PER_TICK: f32 = 1.5;

    /// Playfield dimensions
    pub const CANVAS_WIDTH: f32 = 200.0;
    pub const CANVAS_HEIGHT: f32 = 400.0;

    /// Button row and judgement window
    pub const BUTTON_Y: f32 = 350.0;
    pub const OVERLAP_THRESHOLD: f32 = 20.0;

    /// Lane x coordinates (green, red, blue, yellow)
    pub const COLUMN_X: [f32; 4] = [20.0, 40.0, 60.0, 80.0];

    /// Notes lasting at least this long (seconds) must be held
    pub const LONG_NOTE_MIN_SECS: f64 = 1.0;
    /// Tail pixels per second of hold
    pub const TAIL_LENGTH_MULTIPLIER: f32 = 150.0;

    /// Delay before background notes start sounding (ms)
    pub const INITIAL_DELAY_MS: u64 = 2000;

    /// Scoring
    pub const COMBO_PER_MULTIPLIER_STEP: u32 = 10;
    pub const MULTIPLIER_STEP: f64 = 0.2;
    /// Flat score for each fully held long note
    pub const HOLD_BONUS: f64 = 5.0;

    /// Default seed for the ghost-note sequence
    pub const RNG_SEED: u32 = 1;

    /// Sprite sizes
    pub const NOTE_RADIUS: f32 = 0.07 * CANVAS_WIDTH;
    pub const TAIL_WIDTH: f32 = 15.0;
}
