//! Sound commands derived from each snapshot
//!
//! The engine never plays anything itself. Each snapshot says which notes must
//! start (`notes_to_play`) and which held notes must stop (`notes_to_release`);
//! this module turns that into sampler commands for whatever backend is wired
//! in.

use crate::sim::{GameState, Note};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const MIDI_VELOCITY_MAX: f32 = 127.0;

/// A request to the sampler
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    /// Play a note for a fixed duration
    AttackRelease {
        instrument: String,
        note: String,
        duration_secs: f64,
        gain: f32,
    },
    /// Start a note and sustain it until released
    Attack {
        instrument: String,
        note: String,
        gain: f32,
    },
    /// Stop a sustained note
    Release { instrument: String, note: String },
}

/// Something that can play sampled instruments
pub trait AudioBackend {
    fn play(&mut self, command: &AudioCommand);
}

/// Scientific pitch name for a MIDI note number (60 -> "C4")
pub fn midi_note_name(pitch: u8) -> String {
    let octave = pitch as i32 / 12 - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

/// Volume control in front of a backend
#[derive(Debug, Clone)]
pub struct AudioMixer {
    master_volume: f32,
    muted: bool,
}

impl Default for AudioMixer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AudioMixer {
    pub fn new(master_volume: f32) -> Self {
        Self {
            master_volume: master_volume.clamp(0.0, 1.0),
            muted: false,
        }
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    fn gain(&self, note: &Note) -> f32 {
        note.instrument.velocity as f32 / MIDI_VELOCITY_MAX * self.effective_volume()
    }

    /// Commands requested by one snapshot, starts before releases
    pub fn commands_for(&self, state: &GameState) -> Vec<AudioCommand> {
        let starts = state.notes_to_play.iter().map(|n| {
            let instrument = n.instrument.instrument_name.clone();
            let note = midi_note_name(n.instrument.pitch);
            if n.is_tail {
                AudioCommand::Attack {
                    instrument,
                    note,
                    gain: self.gain(n),
                }
            } else {
                AudioCommand::AttackRelease {
                    instrument,
                    note,
                    duration_secs: n.instrument.duration(),
                    gain: self.gain(n),
                }
            }
        });
        let stops = state.notes_to_release.iter().map(|n| AudioCommand::Release {
            instrument: n.instrument.instrument_name.clone(),
            note: midi_note_name(n.instrument.pitch),
        });
        starts.chain(stops).collect()
    }

    /// Send one snapshot's commands to a backend; returns how many were sent
    pub fn dispatch(&self, state: &GameState, backend: &mut impl AudioBackend) -> usize {
        if self.effective_volume() <= 0.0 {
            return 0;
        }
        let commands = self.commands_for(state);
        for command in &commands {
            backend.play(command);
        }
        commands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Action, ColumnColour, InstrumentEvent};
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder(Vec<AudioCommand>);

    impl AudioBackend for Recorder {
        fn play(&mut self, command: &AudioCommand) {
            self.0.push(command.clone());
        }
    }

    fn event(pitch: u8, start: f64, end: f64) -> Arc<InstrumentEvent> {
        Arc::new(InstrumentEvent {
            user_played: true,
            instrument_name: "flute".into(),
            velocity: 127,
            pitch,
            start,
            end,
            is_last_note: false,
        })
    }

    fn ticks(state: GameState, n: usize) -> GameState {
        (0..n).fold(state, |s, _| Action::Tick.apply(&s))
    }

    #[test]
    fn test_midi_note_names() {
        assert_eq!(midi_note_name(60), "C4");
        assert_eq!(midi_note_name(69), "A4");
        assert_eq!(midi_note_name(0), "C-1");
        assert_eq!(midi_note_name(113), "F8");
    }

    #[test]
    fn test_short_note_attack_release() {
        let s = Action::PlayBackgroundNote(event(61, 1.0, 1.5)).apply(&GameState::default());
        let cmds = AudioMixer::default().commands_for(&s);
        assert_eq!(
            cmds,
            vec![AudioCommand::AttackRelease {
                instrument: "flute".into(),
                note: "C#4".into(),
                duration_secs: 0.5,
                gain: 1.0,
            }]
        );
    }

    #[test]
    fn test_held_note_attack_then_release() {
        let s = Action::SpawnNote(event(0, 0.0, 2.0)).apply(&GameState::default());
        let s = ticks(s, 234);
        let s = Action::Press(ColumnColour::Green).apply(&s);
        let mixer = AudioMixer::new(0.5);
        let cmds = mixer.commands_for(&s);
        assert!(matches!(&cmds[..], [AudioCommand::Attack { gain, .. }] if *gain == 0.5));

        let s = Action::KeyUp(ColumnColour::Green).apply(&s);
        let cmds = mixer.commands_for(&s);
        assert_eq!(
            cmds,
            vec![AudioCommand::Release {
                instrument: "flute".into(),
                note: "C-1".into(),
            }]
        );
    }

    #[test]
    fn test_muted_mixer_sends_nothing() {
        let s = Action::Press(ColumnColour::Red).apply(&GameState::default());
        let mut mixer = AudioMixer::default();
        let mut rec = Recorder::default();
        assert_eq!(mixer.dispatch(&s, &mut rec), 1);
        mixer.set_muted(true);
        assert_eq!(mixer.dispatch(&s, &mut rec), 0);
        assert_eq!(rec.0.len(), 1);
    }
}
