//! State transitions
//!
//! Every action is a total function from one snapshot to the next. The prior
//! snapshot is only borrowed, so the renderer and audio layers may keep reading
//! it while the next one is built.

use std::sync::Arc;

use super::state::{ColumnColour, GameState, InstrumentEvent, Note};
use crate::consts::HOLD_BONUS;

/// Instrument used for the sound of a press that hit nothing
const GHOST_INSTRUMENT: &str = "violin";
const GHOST_VELOCITY: u8 = 100;
const GHOST_PITCH: u8 = 113;

/// Input to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Advance one fixed interval
    Tick,
    /// A user-played chart note reached its start time
    SpawnNote(Arc<InstrumentEvent>),
    /// A background chart note must sound
    PlayBackgroundNote(Arc<InstrumentEvent>),
    /// Lane key went down
    Press(ColumnColour),
    /// Lane key went up
    KeyUp(ColumnColour),
    /// Song is over
    Ending,
}

impl Action {
    /// Apply this action, producing the next snapshot
    pub fn apply(&self, state: &GameState) -> GameState {
        if state.game_end {
            log::warn!("{} applied after the game ended; ignoring", self.name());
            return state.clone();
        }
        match self {
            Action::Tick => tick(state),
            Action::SpawnNote(event) => spawn_note(state, event),
            Action::PlayBackgroundNote(event) => play_background_note(state, event),
            Action::Press(colour) => press(state, *colour),
            Action::KeyUp(colour) => key_up(state, *colour),
            Action::Ending => ending(state),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Tick => "Tick",
            Action::SpawnNote(_) => "SpawnNote",
            Action::PlayBackgroundNote(_) => "PlayBackgroundNote",
            Action::Press(_) => "Press",
            Action::KeyUp(_) => "KeyUp",
            Action::Ending => "Ending",
        }
    }
}

/// Move every note down one step and judge misses
fn tick(state: &GameState) -> GameState {
    let mut next = state.successor();

    let (missed, falling): (Vec<Note>, Vec<Note>) = state
        .all_notes
        .iter()
        .map(Note::advanced)
        .partition(Note::is_missed);

    // Missed tail notes stay on the render track until they scroll away
    let missed_heads: Vec<&Note> = missed.iter().filter(|n| !n.is_tail).collect();

    let mut track = Vec::with_capacity(state.move_long_notes.len());
    for note in state.move_long_notes.iter().map(Note::advanced) {
        if missed_heads.iter().any(|m| m.id == note.id) {
            continue;
        }
        if note.is_off_screen() {
            next.exit.push(note);
        } else {
            track.push(note);
        }
    }
    next.exit.extend(missed_heads.into_iter().cloned());

    if !missed.is_empty() {
        log::debug!("{} note(s) missed, combo reset", missed.len());
        next.current_consecutive = 0;
    }
    next.multiplier = GameState::multiplier_for(next.current_consecutive);
    next.all_notes = falling;
    next.move_long_notes = track;
    next.processing_long_notes = state
        .processing_long_notes
        .iter()
        .map(Note::advanced)
        .collect();
    next
}

fn spawn_note(state: &GameState, event: &Arc<InstrumentEvent>) -> GameState {
    let mut next = state.successor();
    let note = Note::spawn(state.obj_count, Arc::clone(event));
    next.all_notes.push(note.clone());
    next.move_long_notes.push(note);
    next.obj_count += 1;
    next
}

fn play_background_note(state: &GameState, event: &Arc<InstrumentEvent>) -> GameState {
    let mut next = state.successor();
    next.notes_to_play.push(Note::ghost(Arc::clone(event)));
    next
}

/// Judge every note inside the pressed lane's window
fn press(state: &GameState, colour: ColumnColour) -> GameState {
    let button = colour.button();
    let mut next = state.successor();

    let (hit, falling): (Vec<Note>, Vec<Note>) =
        state.all_notes.iter().cloned().partition(|n| n.overlaps(button));

    if hit.is_empty() {
        // Nothing to hit: play a short random-length note as feedback
        let draw = state.rng_sequence.draw();
        let event = InstrumentEvent {
            user_played: false,
            instrument_name: GHOST_INSTRUMENT.to_string(),
            velocity: GHOST_VELOCITY,
            pitch: GHOST_PITCH,
            start: 0.0,
            end: draw.value,
            is_last_note: false,
        };
        next.notes_to_play.push(Note::ghost(Arc::new(event)));
        next.rng_sequence = draw.next;
        return next;
    }

    let (tails, heads): (Vec<Note>, Vec<Note>) = hit.iter().cloned().partition(|n| n.is_tail);
    let count = heads.len();

    next.current_consecutive += count as u32;
    next.current_score += count as f64 * state.multiplier;
    next.move_long_notes.retain(|n| !heads.iter().any(|h| h.id == n.id));
    next.processing_long_notes.extend(tails);
    next.exit.extend(heads);
    next.all_notes = falling;
    next.notes_to_play = hit;
    next
}

/// Finish every hold in the released lane
fn key_up(state: &GameState, colour: ColumnColour) -> GameState {
    let (released, still_held): (Vec<Note>, Vec<Note>) = state
        .processing_long_notes
        .iter()
        .cloned()
        .partition(|n| n.column_colour == colour);

    if released.is_empty() {
        return state.clone();
    }

    let correct = released.iter().filter(|n| n.is_fully_pressed()).count();
    let mut next = state.successor();
    if correct >= 1 {
        next.current_consecutive += correct as u32;
        next.current_score += correct as f64 * HOLD_BONUS;
    } else {
        log::debug!("{colour} hold released early, combo reset");
        next.current_consecutive = 0;
    }
    next.processing_long_notes = still_held;
    next.notes_to_release = released;
    next
}

fn ending(state: &GameState) -> GameState {
    log::info!(
        "Song ended: score {:.1}, combo {}",
        state.current_score,
        state.current_consecutive
    );
    GameState {
        game_end: true,
        ..state.successor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::Position;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn event(pitch: u8, start: f64, end: f64) -> Arc<InstrumentEvent> {
        Arc::new(InstrumentEvent {
            user_played: true,
            instrument_name: "piano".into(),
            velocity: 100,
            pitch,
            start,
            end,
            is_last_note: false,
        })
    }

    fn run(state: &GameState, actions: &[Action]) -> GameState {
        actions.iter().fold(state.clone(), |s, a| a.apply(&s))
    }

    fn ticks(state: &GameState, n: usize) -> GameState {
        (0..n).fold(state.clone(), |s, _| Action::Tick.apply(&s))
    }

    #[test]
    fn test_spawn_green_note() {
        let s = Action::SpawnNote(event(0, 0.0, 0.5)).apply(&GameState::default());
        assert_eq!(s.all_notes.len(), 1);
        let note = &s.all_notes[0];
        assert_eq!(note.column_colour, ColumnColour::Green);
        assert!(!note.is_tail);
        assert_eq!(note.id, "0");
        assert_eq!(note.pos, Position::new(20.0, 0.0));
        assert_eq!(note.vel, 1.5);
        assert_eq!(s.obj_count, 1);
        assert_eq!(s.move_long_notes.len(), 1);
    }

    #[test]
    fn test_miss_boundary_is_tick_247() {
        let s = Action::SpawnNote(event(0, 0.0, 0.5)).apply(&GameState::default());
        // Build a combo so the reset is observable
        let s = GameState {
            current_consecutive: 12,
            ..s
        };

        let before = ticks(&s, 246);
        assert_eq!(before.all_notes.len(), 1);
        assert_eq!(before.all_notes[0].pos.y(), 369.0);
        assert!(before.exit.is_empty());
        assert_eq!(before.current_consecutive, 12);

        let after = Action::Tick.apply(&before);
        assert!(after.all_notes.is_empty());
        assert_eq!(after.exit.len(), 1);
        assert_eq!(after.exit[0].id, "0");
        assert_eq!(after.current_consecutive, 0);
        assert_eq!(after.multiplier, 1.0);
        assert!(after.move_long_notes.is_empty());

        // exit is cleared on the following transition
        let later = Action::Tick.apply(&after);
        assert!(later.exit.is_empty());
    }

    #[test]
    fn test_press_on_empty_lane_plays_ghost() {
        let start = GameState::default();
        let s = Action::Press(ColumnColour::Green).apply(&start);
        assert_eq!(s.notes_to_play.len(), 1);
        let ghost = &s.notes_to_play[0];
        assert_eq!(ghost.id, "-");
        assert_eq!(ghost.instrument.instrument_name, "violin");
        assert_eq!(ghost.instrument.end, start.rng_sequence.value());
        assert_eq!(s.rng_sequence, start.rng_sequence.next());
        assert_eq!(s.all_notes, start.all_notes);
        assert_eq!(s.current_consecutive, 0);
    }

    #[test]
    fn test_ghost_note_always_green() {
        let s = Action::Press(ColumnColour::Yellow).apply(&GameState::default());
        assert_eq!(s.notes_to_play[0].column_colour, ColumnColour::Green);
    }

    #[test]
    fn test_press_does_not_reset_combo() {
        let s = GameState {
            current_consecutive: 7,
            ..GameState::default()
        };
        let s = Action::Press(ColumnColour::Blue).apply(&s);
        assert_eq!(s.current_consecutive, 7);
    }

    #[test]
    fn test_press_hits_note_in_window() {
        let s = Action::SpawnNote(event(1, 0.0, 0.25)).apply(&GameState::default());
        let s = ticks(&s, 234);
        let rng = s.rng_sequence;
        let s = Action::Press(ColumnColour::Red).apply(&s);
        assert!(s.all_notes.is_empty());
        assert_eq!(s.exit.len(), 1);
        assert_eq!(s.notes_to_play.len(), 1);
        assert_eq!(s.notes_to_play[0].id, "0");
        assert_eq!(s.current_consecutive, 1);
        assert_eq!(s.current_score, 1.0);
        assert_eq!(s.rng_sequence, rng);
        assert!(s.move_long_notes.is_empty());
    }

    #[test]
    fn test_press_wrong_lane_misses_nothing() {
        let s = Action::SpawnNote(event(1, 0.0, 0.25)).apply(&GameState::default());
        let s = ticks(&s, 234);
        let s = Action::Press(ColumnColour::Green).apply(&s);
        assert_eq!(s.all_notes.len(), 1);
        assert_eq!(s.notes_to_play[0].id, "-");
    }

    #[test]
    fn test_press_scales_with_multiplier() {
        let s = Action::SpawnNote(event(2, 0.0, 0.25)).apply(&GameState::default());
        let s = ticks(&s, 230);
        let s = GameState {
            multiplier: 1.4,
            current_score: 10.0,
            ..s
        };
        let s = Action::Press(ColumnColour::Blue).apply(&s);
        assert!((s.current_score - 11.4).abs() < 1e-9);
    }

    #[test]
    fn test_multiplier_recomputed_on_tick() {
        let s = GameState {
            current_consecutive: 20,
            ..GameState::default()
        };
        let s = Action::Tick.apply(&s);
        assert!((s.multiplier - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_full_hold_scores_bonus() {
        // 2 second note: length 300, fully pressed once y >= 650
        let s = Action::SpawnNote(event(3, 0.0, 2.0)).apply(&GameState::default());
        let s = ticks(&s, 234);
        let s = Action::Press(ColumnColour::Yellow).apply(&s);
        assert!(s.all_notes.is_empty());
        assert_eq!(s.processing_long_notes.len(), 1);
        assert!(s.exit.is_empty());
        assert_eq!(s.notes_to_play.len(), 1);
        assert!(s.notes_to_play[0].is_tail);
        assert_eq!(s.current_consecutive, 0);

        // Held notes keep moving and are never judged missed
        let s = ticks(&s, 200);
        assert_eq!(s.processing_long_notes[0].pos.y(), 651.0);
        assert_eq!(s.processing_long_notes.len(), 1);

        let s = Action::KeyUp(ColumnColour::Yellow).apply(&s);
        assert!(s.processing_long_notes.is_empty());
        assert_eq!(s.notes_to_release.len(), 1);
        assert_eq!(s.current_consecutive, 1);
        assert_eq!(s.current_score, HOLD_BONUS);
    }

    #[test]
    fn test_early_release_resets_combo() {
        let s = Action::SpawnNote(event(3, 0.0, 2.0)).apply(&GameState::default());
        let s = ticks(&s, 234);
        let s = Action::Press(ColumnColour::Yellow).apply(&s);
        let s = GameState {
            current_consecutive: 15,
            ..s
        };
        let s = ticks(&s, 10);
        let s = Action::KeyUp(ColumnColour::Yellow).apply(&s);
        assert_eq!(s.current_consecutive, 0);
        assert_eq!(s.current_score, 0.0);
        assert_eq!(s.notes_to_release.len(), 1);
    }

    #[test]
    fn test_key_up_without_hold_is_noop() {
        let s = Action::Press(ColumnColour::Red).apply(&GameState::default());
        let again = Action::KeyUp(ColumnColour::Red).apply(&s);
        assert_eq!(again, s);
        // Transients survive the no-op too
        assert_eq!(again.notes_to_play.len(), 1);
    }

    #[test]
    fn test_key_up_other_lane_keeps_hold() {
        let s = Action::SpawnNote(event(0, 0.0, 1.5)).apply(&GameState::default());
        let s = ticks(&s, 234);
        let s = Action::Press(ColumnColour::Green).apply(&s);
        let s = Action::KeyUp(ColumnColour::Red).apply(&s);
        assert_eq!(s.processing_long_notes.len(), 1);
    }

    #[test]
    fn test_missed_tail_stays_on_track() {
        let s = Action::SpawnNote(event(0, 0.0, 1.0)).apply(&GameState::default());
        let s = ticks(&s, 247);
        assert!(s.all_notes.is_empty());
        assert!(s.exit.is_empty());
        assert_eq!(s.move_long_notes.len(), 1);

        // Removed once its tail (150px) leaves the 400px canvas: y > 550
        let s = ticks(&s, 119);
        assert_eq!(s.move_long_notes[0].pos.y(), 549.0);
        assert!(s.exit.is_empty());
        let s = Action::Tick.apply(&s);
        assert!(s.move_long_notes.is_empty());
        assert_eq!(s.exit.len(), 1);
        assert_eq!(s.exit[0].id, "0");
    }

    #[test]
    fn test_background_note_only_sounds() {
        let bg = Arc::new(InstrumentEvent {
            user_played: false,
            ..(*event(60, 1.0, 1.5)).clone()
        });
        let s = Action::PlayBackgroundNote(bg).apply(&GameState::default());
        assert!(s.all_notes.is_empty());
        assert_eq!(s.obj_count, 0);
        assert_eq!(s.notes_to_play.len(), 1);
        assert_eq!(s.notes_to_play[0].instrument.pitch, 60);
        let s = Action::Tick.apply(&s);
        assert!(s.notes_to_play.is_empty());
    }

    #[test]
    fn test_ending_is_terminal() {
        let s = Action::Ending.apply(&GameState::default());
        assert!(s.game_end);
        let after = Action::SpawnNote(event(0, 0.0, 0.5)).apply(&s);
        assert_eq!(after, s);
    }

    #[test]
    fn test_prior_snapshot_untouched() {
        let s = Action::SpawnNote(event(0, 0.0, 0.5)).apply(&GameState::default());
        let copy = s.clone();
        let _ = run(&s, &[Action::Tick, Action::Press(ColumnColour::Green), Action::Tick]);
        assert_eq!(s, copy);
    }

    fn lane() -> impl Strategy<Value = ColumnColour> {
        (0usize..4).prop_map(|i| ColumnColour::ALL[i])
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            6 => Just(Action::Tick),
            2 => (0u8..128, 0u32..3000).prop_map(|(pitch, len)| {
                Action::SpawnNote(event(pitch, 0.0, len as f64 / 1000.0))
            }),
            1 => lane().prop_map(Action::Press),
            1 => lane().prop_map(Action::KeyUp),
        ]
    }

    /// Long runs of ticks between bursts so notes reach the buttons
    fn script() -> impl Strategy<Value = Vec<(Action, usize)>> {
        prop::collection::vec((action(), 0usize..60), 1..60)
    }

    proptest! {
        #[test]
        fn prop_invariants_hold(steps in script()) {
            let mut state = GameState::default();
            for (action, pad) in steps {
                let prev = state.clone();
                state = action.apply(&prev);
                for _ in 0..pad {
                    state = Action::Tick.apply(&state);
                }

                let falling: HashSet<&str> = state.all_notes.iter().map(|n| n.id.as_str()).collect();
                let held: HashSet<&str> = state.processing_long_notes.iter().map(|n| n.id.as_str()).collect();
                prop_assert_eq!(falling.len(), state.all_notes.len());
                prop_assert_eq!(held.len(), state.processing_long_notes.len());
                prop_assert!(falling.is_disjoint(&held));

                prop_assert!(state.obj_count >= prev.obj_count);
                prop_assert!(state.current_score >= prev.current_score);
                prop_assert!(state.multiplier >= 1.0);
            }
        }

        #[test]
        fn prop_tick_multiplier_formula(combo in 0u32..500, spawn in any::<bool>()) {
            let mut s = GameState { current_consecutive: combo, ..GameState::default() };
            if spawn {
                s = Action::SpawnNote(event(0, 0.0, 0.1)).apply(&s);
            }
            let s = Action::Tick.apply(&s);
            prop_assert_eq!(s.multiplier, GameState::multiplier_for(s.current_consecutive));
        }

        #[test]
        fn prop_key_up_idempotent(actions in prop::collection::vec(action(), 0..40), colour in lane()) {
            let s = run(&GameState::default(), &actions);
            let once = Action::KeyUp(colour).apply(&s);
            let twice = Action::KeyUp(colour).apply(&once);
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn prop_empty_press_keeps_combo(combo in 0u32..100, colour in lane()) {
            let s = GameState { current_consecutive: combo, ..GameState::default() };
            let s = Action::Press(colour).apply(&s);
            prop_assert_eq!(s.current_consecutive, combo);
        }
    }
}
