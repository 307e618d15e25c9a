//! Lanefall entry point
//!
//! Headless driver: loads a chart, plays it with a recorded key log or the demo
//! player, feeds every snapshot to the audio and scene adapters, and prints a
//! JSON run summary.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;

use lanefall::audio::{AudioBackend, AudioCommand, AudioMixer};
use lanefall::autoplay::Autoplay;
use lanefall::input::{self, KeyLogError};
use lanefall::renderer::{SceneCommand, SceneTracker};
use lanefall::{Session, Settings, Song, SongError};

#[derive(Parser, Debug)]
#[command(name = "lanefall", about = "Four-lane falling-note rhythm game (headless)")]
struct Args {
    /// Chart to play (CSV)
    song: PathBuf,

    /// Settings file (JSON); defaults are used when missing
    #[arg(default_value = "lanefall.json")]
    settings: PathBuf,

    /// Recorded key log (JSON) to play instead of the demo player
    #[arg(long)]
    keys: Option<PathBuf>,

    /// Run with audio muted
    #[arg(long)]
    mute: bool,
}

#[derive(Error, Debug)]
enum RunError {
    #[error(transparent)]
    Song(#[from] SongError),

    #[error(transparent)]
    Keys(#[from] KeyLogError),
}

/// Backend that only logs what would have been played
#[derive(Default)]
struct LogBackend {
    played: usize,
}

impl AudioBackend for LogBackend {
    fn play(&mut self, command: &AudioCommand) {
        self.played += 1;
        log::trace!("audio: {command:?}");
    }
}

#[derive(Debug, Serialize)]
struct RunSummary {
    song: String,
    playable_notes: usize,
    score: f64,
    combo: u32,
    best_combo: u32,
    multiplier: f64,
    sprites_created: usize,
    audio_commands: usize,
    actions_applied: u64,
    duration_ms: u64,
}

fn run(args: &Args, settings: &Settings) -> Result<RunSummary, RunError> {
    let song = Song::load(&args.song)?;
    let keys = match &args.keys {
        Some(path) => input::lane_inputs(&input::load_key_log(path)?, settings),
        None => Autoplay::new(settings.autoplay_seed, settings.autoplay_accuracy)
            .keys_for(song.events()),
    };

    let mut mixer = AudioMixer::new(settings.master_volume);
    mixer.set_muted(args.mute);
    let mut backend = LogBackend::default();
    let mut scene = SceneTracker::new();
    let mut sprites_created = 0;
    let mut best_combo = 0;

    let mut session = Session::from_song(&song, settings.rng_seed);
    let run = session.start(&keys);
    while let Some(state) = run.next() {
        mixer.dispatch(&state, &mut backend);
        let frame = scene.update(&state);
        sprites_created += frame
            .commands
            .iter()
            .filter(|c| matches!(c, SceneCommand::Create(_)))
            .count();
        best_combo = best_combo.max(state.current_consecutive);
    }

    let end = run.state();
    Ok(RunSummary {
        song: args.song.display().to_string(),
        playable_notes: song.playable_count(),
        score: end.current_score,
        combo: end.current_consecutive,
        best_combo,
        multiplier: end.multiplier,
        sprites_created,
        audio_commands: backend.played,
        actions_applied: run.applied(),
        duration_ms: run.now_ms(),
    })
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Lanefall (headless) starting...");

    let args = Args::parse();
    let settings = Settings::load(&args.settings);

    match run(&args, &settings) {
        Ok(summary) => {
            log::info!(
                "Finished: score {:.1}, best combo {}",
                summary.score,
                summary.best_combo
            );
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(e) => log::error!("Failed to encode summary: {e}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
