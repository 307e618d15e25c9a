//! Scene bookkeeping for a note renderer
//!
//! Tracks one sprite per note id across snapshots and emits the minimal
//! create/move/hold/remove commands a retained-mode renderer needs.

use std::collections::{BTreeMap, HashSet};

use crate::consts::{NOTE_RADIUS, TAIL_WIDTH};
use crate::sim::{ColumnColour, GameState, Note, Position};

/// Rectangle trailing a long note's head
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Visual for one note
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub id: String,
    pub colour: ColumnColour,
    pub head: Position,
    pub radius: f32,
    pub tail: Option<TailRect>,
    /// Being held down by the player
    pub held: bool,
}

impl Sprite {
    fn for_note(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            colour: note.column_colour,
            head: note.pos,
            radius: NOTE_RADIUS,
            tail: note.is_tail.then(|| tail_rect(note)),
            held: false,
        }
    }
}

fn tail_rect(note: &Note) -> TailRect {
    TailRect {
        x: note.pos.x() - TAIL_WIDTH / 2.0,
        y: note.pos.y() - note.length,
        width: TAIL_WIDTH,
        height: note.length,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneCommand {
    Create(Sprite),
    Move { id: String, head: Position },
    Hold { id: String },
    /// Held note let go before its sprite leaves the canvas
    Release { id: String },
    Remove { id: String },
}

/// Score readout
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hud {
    pub score: f64,
    pub multiplier: f64,
    pub combo: u32,
}

/// Everything a renderer needs for one snapshot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub commands: Vec<SceneCommand>,
    pub hud: Hud,
    pub game_over: bool,
}

/// Sprite registry kept in sync with the snapshot sequence
#[derive(Debug, Default)]
pub struct SceneTracker {
    sprites: BTreeMap<String, Sprite>,
}

impl SceneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn sprite(&self, id: &str) -> Option<&Sprite> {
        self.sprites.get(id)
    }

    /// Diff the next snapshot against the live sprites
    pub fn update(&mut self, state: &GameState) -> Frame {
        let mut commands = Vec::new();

        // A fresh start state means the run was restarted
        if state.obj_count == 0 && !self.sprites.is_empty() {
            log::debug!("Clearing {} sprites for a new run", self.sprites.len());
            commands.extend(
                std::mem::take(&mut self.sprites)
                    .into_keys()
                    .map(|id| SceneCommand::Remove { id }),
            );
        }

        let mut seen = HashSet::new();
        for note in state.move_long_notes.iter().chain(&state.all_notes) {
            if !seen.insert(note.id.as_str()) {
                continue;
            }
            match self.sprites.get_mut(&note.id) {
                Some(sprite) => {
                    if sprite.head != note.pos {
                        sprite.head = note.pos;
                        sprite.tail = note.is_tail.then(|| tail_rect(note));
                        commands.push(SceneCommand::Move {
                            id: note.id.clone(),
                            head: note.pos,
                        });
                    }
                }
                None => {
                    let sprite = Sprite::for_note(note);
                    self.sprites.insert(note.id.clone(), sprite.clone());
                    commands.push(SceneCommand::Create(sprite));
                }
            }
        }

        for note in &state.exit {
            if self.sprites.remove(&note.id).is_some() {
                commands.push(SceneCommand::Remove {
                    id: note.id.clone(),
                });
            }
        }

        for note in &state.processing_long_notes {
            if let Some(sprite) = self.sprites.get_mut(&note.id) {
                if !sprite.held {
                    sprite.held = true;
                    commands.push(SceneCommand::Hold {
                        id: note.id.clone(),
                    });
                }
            }
        }

        for note in &state.notes_to_release {
            if let Some(sprite) = self.sprites.get_mut(&note.id) {
                if sprite.held {
                    sprite.held = false;
                    commands.push(SceneCommand::Release {
                        id: note.id.clone(),
                    });
                }
            }
        }

        Frame {
            commands,
            hud: Hud {
                score: state.current_score,
                multiplier: state.multiplier,
                combo: state.current_consecutive,
            },
            game_over: state.game_end,
        }
    }
}
