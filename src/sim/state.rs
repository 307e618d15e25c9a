//! Game state and core domain types
//!
//! Every snapshot is replaced wholesale by each transition. Instrument events
//! are shared by `Arc`, so cloning a snapshot copies note headers only.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::position::Position;
use super::rng::RngSequence;
use crate::consts::*;

/// One of the four fixed lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnColour {
    Green,
    Red,
    Blue,
    Yellow,
}

impl ColumnColour {
    /// All lanes in column order
    pub const ALL: [ColumnColour; 4] = [
        ColumnColour::Green,
        ColumnColour::Red,
        ColumnColour::Blue,
        ColumnColour::Yellow,
    ];

    /// Lane for a MIDI pitch (`pitch mod 4`)
    pub fn from_pitch(pitch: u8) -> Self {
        Self::ALL[(pitch % 4) as usize]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Lane x coordinate
    pub fn x(self) -> f32 {
        COLUMN_X[self.index()]
    }

    /// Fixed button position for this lane
    pub fn button(self) -> Position {
        Position::new(self.x(), BUTTON_Y)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnColour::Green => "green",
            ColumnColour::Red => "red",
            ColumnColour::Blue => "blue",
            ColumnColour::Yellow => "yellow",
        }
    }
}

impl fmt::Display for ColumnColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A musical note from the song, created once when the chart is loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentEvent {
    /// The player must hit this note (otherwise it plays in the background)
    pub user_played: bool,
    pub instrument_name: String,
    /// MIDI velocity (0-127)
    pub velocity: u8,
    /// MIDI pitch
    pub pitch: u8,
    /// Start time (seconds from song start)
    pub start: f64,
    /// End time (seconds from song start)
    pub end: f64,
    /// Synthetic marker event placed after the final sound
    pub is_last_note: bool,
}

impl InstrumentEvent {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Start time in whole milliseconds
    pub fn start_ms(&self) -> u64 {
        (self.start.max(0.0) * 1000.0).round() as u64
    }

    /// Long enough to be played as a held note
    pub fn is_long(&self) -> bool {
        self.duration() >= LONG_NOTE_MIN_SECS
    }

    /// Tail length in pixels
    pub fn tail_length(&self) -> f32 {
        self.duration() as f32 * TAIL_LENGTH_MULTIPLIER
    }
}

/// A falling note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub instrument: Arc<InstrumentEvent>,
    pub pos: Position,
    /// Pixels per tick
    pub vel: f32,
    /// Long note that has to be held
    pub is_tail: bool,
    pub column_colour: ColumnColour,
    /// Tail length in pixels
    pub length: f32,
}

/// Id carried by notes that exist only to make a sound
pub const GHOST_NOTE_ID: &str = "-";
/// Velocity of ghost notes; they are never moved
const GHOST_NOTE_VEL: f32 = 100.0;

impl Note {
    /// Build a playable note for a chart event
    pub fn spawn(id: u64, instrument: Arc<InstrumentEvent>) -> Self {
        let colour = ColumnColour::from_pitch(instrument.pitch);
        Self {
            id: id.to_string(),
            pos: Position::new(colour.x(), 0.0),
            vel: PIXEL_PER_TICK,
            is_tail: instrument.is_long(),
            column_colour: colour,
            length: instrument.tail_length(),
            instrument,
        }
    }

    /// Sound-only note; never falls and never gets judged
    pub fn ghost(instrument: Arc<InstrumentEvent>) -> Self {
        Self {
            id: GHOST_NOTE_ID.to_string(),
            instrument,
            pos: Position::new(0.0, 0.0),
            vel: GHOST_NOTE_VEL,
            is_tail: false,
            column_colour: ColumnColour::Green,
            length: 0.0,
        }
    }

    /// Position after one tick
    pub fn advanced(&self) -> Self {
        Self {
            pos: self.pos.translate(0.0, self.vel),
            ..self.clone()
        }
    }

    /// Fell past the judgement window without being pressed
    pub fn is_missed(&self) -> bool {
        self.pos.y() > BUTTON_Y + OVERLAP_THRESHOLD
    }

    /// Within the judgement window of its lane's button
    pub fn overlaps(&self, button: Position) -> bool {
        self.pos.x() == button.x() && (self.pos.y() - button.y()).abs() <= OVERLAP_THRESHOLD
    }

    /// Held for the whole tail
    pub fn is_fully_pressed(&self) -> bool {
        self.pos.y() >= BUTTON_Y + self.length
    }

    /// Tail has scrolled past the bottom of the playfield
    pub fn is_off_screen(&self) -> bool {
        self.pos.y() - self.length > CANVAS_HEIGHT
    }
}

/// Complete game snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub game_end: bool,
    /// Next note id; never reused
    pub obj_count: u64,
    pub current_score: f64,
    pub multiplier: f64,
    /// Combo counter
    pub current_consecutive: u32,
    /// Falling notes awaiting judgement
    pub all_notes: Vec<Note>,
    /// Notes whose visuals must be removed (this transition only)
    pub exit: Vec<Note>,
    /// Notes whose sound must start (this transition only)
    pub notes_to_play: Vec<Note>,
    /// Long notes currently held down
    pub processing_long_notes: Vec<Note>,
    /// Long notes whose sound must stop (this transition only)
    pub notes_to_release: Vec<Note>,
    /// Render track: spawned notes still on screen
    pub move_long_notes: Vec<Note>,
    pub rng_sequence: RngSequence,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(RNG_SEED)
    }
}

impl GameState {
    /// Start state with the given ghost-note seed
    pub fn new(seed: u32) -> Self {
        Self {
            game_end: false,
            obj_count: 0,
            current_score: 0.0,
            multiplier: 1.0,
            current_consecutive: 0,
            all_notes: Vec::new(),
            exit: Vec::new(),
            notes_to_play: Vec::new(),
            processing_long_notes: Vec::new(),
            notes_to_release: Vec::new(),
            move_long_notes: Vec::new(),
            rng_sequence: RngSequence::new(seed),
        }
    }

    /// Copy of this snapshot with the per-transition outputs emptied
    pub(crate) fn successor(&self) -> Self {
        Self {
            exit: Vec::new(),
            notes_to_play: Vec::new(),
            notes_to_release: Vec::new(),
            ..self.clone()
        }
    }

    /// Multiplier earned by a combo
    pub fn multiplier_for(combo: u32) -> f64 {
        1.0 + MULTIPLIER_STEP * (combo / COMBO_PER_MULTIPLIER_STEP) as f64
    }
}
