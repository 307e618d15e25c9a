//! Event-stream composition
//!
//! Independent timed sources (fixed-interval ticks, chart spawns, background
//! notes, lane key edges, the end signal) are merged into one time-ordered
//! action stream and folded through [`Action::apply`]. Time is virtual: every
//! action carries the millisecond it is due, so a whole song can be replayed
//! deterministically without a clock.

use std::iter::Peekable;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::consts::{INITIAL_DELAY_MS, TICK_RATE_MS};
use crate::settings::Settings;
use crate::sim::{Action, ColumnColour, GameState, InstrumentEvent};
use crate::song::Song;

/// Direction of a key edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEdge {
    Down,
    Up,
}

/// A raw key edge on one lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub at_ms: u64,
    pub colour: ColumnColour,
    pub edge: KeyEdge,
}

impl KeyInput {
    pub fn down(at_ms: u64, colour: ColumnColour) -> Self {
        Self {
            at_ms,
            colour,
            edge: KeyEdge::Down,
        }
    }

    pub fn up(at_ms: u64, colour: ColumnColour) -> Self {
        Self {
            at_ms,
            colour,
            edge: KeyEdge::Up,
        }
    }

    /// Edge on the lane bound to a key code, if the key is bound
    pub fn from_code(at_ms: u64, code: &str, edge: KeyEdge, settings: &Settings) -> Option<Self> {
        settings
            .lane_for_key(code)
            .map(|colour| Self { at_ms, colour, edge })
    }
}

/// An action due at a virtual time
#[derive(Debug, Clone, PartialEq)]
pub struct TimedAction {
    pub at_ms: u64,
    pub action: Action,
}

/// Merge order used to break ties between sources at the same millisecond
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Source {
    Ending,
    Tick,
    Spawn,
    Lane(ColumnColour),
    Background,
}

#[derive(Debug, Clone)]
struct Scheduled {
    at_ms: u64,
    source: Source,
    seq: usize,
    action: Action,
}

impl Scheduled {
    fn key(&self) -> (u64, Source, usize) {
        (self.at_ms, self.source, self.seq)
    }
}

/// All finite sources of a run, sorted by due time and merge order
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    queue: Vec<Scheduled>,
}

impl Schedule {
    /// Route chart events and pair key edges into scheduled actions
    pub fn new(events: &[Arc<InstrumentEvent>], keys: &[KeyInput]) -> Self {
        let mut queue = Vec::with_capacity(events.len() + keys.len());

        for event in events {
            let start_ms = event.start_ms();
            let (at_ms, source, action) = if event.is_last_note {
                (start_ms, Source::Ending, Action::Ending)
            } else if event.user_played {
                (start_ms, Source::Spawn, Action::SpawnNote(Arc::clone(event)))
            } else {
                (
                    start_ms.saturating_add(INITIAL_DELAY_MS),
                    Source::Background,
                    Action::PlayBackgroundNote(Arc::clone(event)),
                )
            };
            queue.push(Scheduled {
                at_ms,
                source,
                seq: queue.len(),
                action,
            });
        }

        for (at_ms, action) in pair_key_edges(keys) {
            let colour = match action {
                Action::Press(c) | Action::KeyUp(c) => c,
                _ => continue,
            };
            queue.push(Scheduled {
                at_ms,
                source: Source::Lane(colour),
                seq: queue.len(),
                action,
            });
        }

        queue.sort_by_key(Scheduled::key);
        log::debug!("Scheduled {} actions", queue.len());
        Self { queue }
    }

    /// Schedule for a loaded song
    pub fn for_song(song: &Song, keys: &[KeyInput]) -> Self {
        Self::new(song.events(), keys)
    }

    /// Time of the end signal, if the chart has one
    pub fn end_ms(&self) -> Option<u64> {
        self.queue
            .iter()
            .find(|s| s.source == Source::Ending)
            .map(|s| s.at_ms)
    }

    /// Merged action stream including the infinite tick source
    pub fn actions(&self) -> ActionStream {
        self.clone().into_actions()
    }

    pub fn into_actions(self) -> ActionStream {
        ActionStream {
            next_tick_ms: TICK_RATE_MS,
            queue: self.queue.into_iter().peekable(),
        }
    }
}

/// Turn raw key edges into Press/KeyUp pairs per lane.
///
/// A Down while the lane is already down is an auto-repeat and is dropped, as
/// is an Up with no matching Down.
fn pair_key_edges(keys: &[KeyInput]) -> Vec<(u64, Action)> {
    let mut sorted = keys.to_vec();
    sorted.sort_by_key(|k| k.at_ms);

    let mut down = [false; 4];
    let mut paired = Vec::with_capacity(sorted.len());
    for key in sorted {
        let lane = &mut down[key.colour.index()];
        match (key.edge, *lane) {
            (KeyEdge::Down, false) => {
                *lane = true;
                paired.push((key.at_ms, Action::Press(key.colour)));
            }
            (KeyEdge::Up, true) => {
                *lane = false;
                paired.push((key.at_ms, Action::KeyUp(key.colour)));
            }
            _ => {}
        }
    }
    paired
}

/// Lazy merge of the tick source with a schedule
#[derive(Debug)]
pub struct ActionStream {
    next_tick_ms: u64,
    queue: Peekable<std::vec::IntoIter<Scheduled>>,
}

impl Iterator for ActionStream {
    type Item = TimedAction;

    fn next(&mut self) -> Option<TimedAction> {
        let tick_due = match self.queue.peek() {
            Some(head) => (self.next_tick_ms, Source::Tick) < (head.at_ms, head.source),
            None => true,
        };

        if tick_due {
            let at_ms = self.next_tick_ms;
            self.next_tick_ms += TICK_RATE_MS;
            return Some(TimedAction {
                at_ms,
                action: Action::Tick,
            });
        }

        self.queue.next().map(|s| TimedAction {
            at_ms: s.at_ms,
            action: s.action,
        })
    }
}

/// A fold of an action stream over the state machine.
///
/// Yields every resulting snapshot and stops right after the first one with
/// `game_end` set, so nothing is ever applied to an ended game.
#[derive(Debug)]
pub struct GameRun<I> {
    actions: I,
    pending: Option<TimedAction>,
    state: GameState,
    now_ms: u64,
    applied: u64,
    finished: bool,
}

impl<I: Iterator<Item = TimedAction>> GameRun<I> {
    pub fn new(start: GameState, actions: I) -> Self {
        Self {
            actions,
            pending: None,
            state: start,
            now_ms: 0,
            applied: 0,
            finished: false,
        }
    }

    /// Latest snapshot
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Virtual time of the last applied action
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of actions folded so far
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply every action due up to and including `until_ms`
    pub fn advance_to(&mut self, until_ms: u64) -> Vec<GameState> {
        let mut states = Vec::new();
        while !self.finished {
            let Some(timed) = self.pending.take().or_else(|| self.actions.next()) else {
                break;
            };
            if timed.at_ms > until_ms {
                self.pending = Some(timed);
                break;
            }
            states.push(self.apply(timed));
        }
        states
    }

    /// Fold to the end of the stream and return the final snapshot.
    ///
    /// The tick source never ends on its own; the stream must contain an
    /// Ending for this to return.
    pub fn finish(mut self) -> GameState {
        while self.next().is_some() {}
        self.state
    }

    fn apply(&mut self, timed: TimedAction) -> GameState {
        if timed.at_ms < self.now_ms {
            log::warn!(
                "{} at {}ms arrived after {}ms; stream is out of order",
                timed.action.name(),
                timed.at_ms,
                self.now_ms
            );
        }
        self.now_ms = self.now_ms.max(timed.at_ms);
        self.state = timed.action.apply(&self.state);
        self.applied += 1;
        self.finished = self.state.game_end;
        self.state.clone()
    }
}

impl<I: Iterator<Item = TimedAction>> Iterator for GameRun<I> {
    type Item = GameState;

    fn next(&mut self) -> Option<GameState> {
        if self.finished {
            return None;
        }
        let timed = self.pending.take().or_else(|| self.actions.next())?;
        Some(self.apply(timed))
    }
}

/// A playable song that can be (re)started from scratch.
///
/// Restarting drops the current fold entirely and begins a new one from the
/// start state; nothing from the abandoned run carries over.
#[derive(Debug)]
pub struct Session {
    events: Vec<Arc<InstrumentEvent>>,
    seed: u32,
    run: Option<GameRun<ActionStream>>,
    runs_started: u32,
}

impl Session {
    pub fn new(events: Vec<Arc<InstrumentEvent>>, seed: u32) -> Self {
        Self {
            events,
            seed,
            run: None,
            runs_started: 0,
        }
    }

    pub fn from_song(song: &Song, seed: u32) -> Self {
        Self::new(song.events().to_vec(), seed)
    }

    /// Begin a run with the given key input, replacing any active run
    pub fn start(&mut self, keys: &[KeyInput]) -> &mut GameRun<ActionStream> {
        if self.run.is_some() {
            log::info!("Restarting session (run {})", self.runs_started + 1);
        }
        self.runs_started += 1;
        let actions = Schedule::new(&self.events, keys).into_actions();
        self.run.insert(GameRun::new(GameState::new(self.seed), actions))
    }

    pub fn runs_started(&self) -> u32 {
        self.runs_started
    }
}
