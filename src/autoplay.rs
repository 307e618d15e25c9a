//! Demo player
//!
//! Turns a chart into lane key edges, the way a decent human would play it:
//! press when the note is near the centre of the button, hold long notes until
//! their tail has passed. Timing jitter and mistakes come from a seeded PCG so
//! a demo run is reproducible.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::{BUTTON_Y, OVERLAP_THRESHOLD, PIXEL_PER_TICK, TICK_RATE_MS};
use crate::sim::{ColumnColour, InstrumentEvent};
use crate::stream::KeyInput;

/// Max ticks a press lands early or late
const JITTER_TICKS: i64 = 3;
/// How long a tap is held down (ms)
const TAP_HOLD_MS: u64 = 3 * TICK_RATE_MS;
/// How long a fumbled hold lasts before letting go (ms)
const FUMBLE_HOLD_MS: u64 = 10 * TICK_RATE_MS;

/// Seeded demo player
#[derive(Debug, Clone)]
pub struct Autoplay {
    rng: Pcg32,
    accuracy: f32,
}

impl Autoplay {
    /// `accuracy` is the chance (0.0 - 1.0) each note is played cleanly
    pub fn new(seed: u64, accuracy: f32) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            accuracy: accuracy.clamp(0.0, 1.0),
        }
    }

    /// Key edges for every user-played event
    pub fn keys_for(&mut self, events: &[Arc<InstrumentEvent>]) -> Vec<KeyInput> {
        let mut playable: Vec<&Arc<InstrumentEvent>> = events
            .iter()
            .filter(|e| e.user_played && !e.is_last_note)
            .collect();
        playable.sort_by_key(|e| e.start_ms());

        let mut busy_until = [None::<u64>; 4];
        let mut keys = Vec::with_capacity(playable.len() * 2);
        let mut skipped = 0usize;

        for event in playable {
            let lane = ColumnColour::from_pitch(event.pitch);
            let jitter = self.rng.random_range(-JITTER_TICKS..=JITTER_TICKS);
            let press_ms = tick_ms(event, ticks_to_button() + jitter);

            if busy_until[lane.index()].is_some_and(|t| press_ms <= t) {
                skipped += 1;
                continue;
            }

            let clean = self.rng.random::<f32>() < self.accuracy;
            let release_ms = match (event.is_long(), clean) {
                (false, true) => press_ms.saturating_add(TAP_HOLD_MS),
                (true, true) => tick_ms(event, ticks_to_full_hold(event)),
                (true, false) => press_ms.saturating_add(FUMBLE_HOLD_MS),
                (false, false) => {
                    skipped += 1;
                    continue;
                }
            };

            keys.push(KeyInput::down(press_ms, lane));
            keys.push(KeyInput::up(release_ms, lane));
            busy_until[lane.index()] = Some(release_ms);
        }

        log::debug!("Autoplay: {} key edges, {} notes skipped", keys.len(), skipped);
        keys
    }
}

/// Ticks after spawning until the note is centred on its button
fn ticks_to_button() -> i64 {
    (BUTTON_Y / PIXEL_PER_TICK).ceil() as i64
}

/// Ticks after spawning until the whole tail has passed the button, plus one
/// for float slack in the tail length
fn ticks_to_full_hold(event: &InstrumentEvent) -> i64 {
    ((BUTTON_Y + event.tail_length()) / PIXEL_PER_TICK).ceil() as i64 + 1
}

/// Time of the k-th tick that moves a note spawned for `event`
fn tick_ms(event: &InstrumentEvent, k: i64) -> u64 {
    // Ticks win ties with spawns, so a spawn on a tick boundary first moves on
    // the following tick
    let first = (event.start_ms() / TICK_RATE_MS)
        .saturating_add(1)
        .saturating_mul(TICK_RATE_MS);
    first.saturating_add((k.max(1) as u64 - 1).saturating_mul(TICK_RATE_MS))
}
