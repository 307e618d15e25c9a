//! Chart loading
//!
//! A chart is CSV with one header line followed by rows of
//! `user_played,instrument_name,velocity,pitch,start,end`. Parsing fails fast:
//! nothing malformed ever reaches the state machine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::sim::InstrumentEvent;

/// Seconds between the last sound and the end signal
const TRAILING_GAP_SECS: f64 = 5.0;
const TRAILING_INSTRUMENT: &str = "violin";
const FIELD_COUNT: usize = 6;
const MIDI_MAX: u8 = 127;
/// Latest accepted start or end time (seconds); one day
pub const MAX_TIME_SECS: f64 = 86_400.0;

#[derive(Error, Debug)]
pub enum SongError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Song has no notes")]
    Empty,

    #[error("Line {line}: expected 6 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("Line {line}: invalid {field} {value:?}")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: note ends at {end}s before it starts at {start}s")]
    NegativeDuration { line: usize, start: f64, end: f64 },
}

/// A parsed chart, terminated by a synthetic last-note marker
#[derive(Debug, Clone)]
pub struct Song {
    events: Vec<Arc<InstrumentEvent>>,
}

impl Song {
    /// Read and parse a chart file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SongError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SongError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let song = Self::parse(&contents)?;
        log::info!(
            "Loaded {} ({} notes, {} playable)",
            path.display(),
            song.events.len() - 1,
            song.playable_count()
        );
        Ok(song)
    }

    /// Parse chart text (header line first)
    pub fn parse(contents: &str) -> Result<Self, SongError> {
        let events = contents
            .lines()
            .enumerate()
            .skip(1)
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| parse_row(idx + 1, line))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_events(events)
    }

    /// Build a song from already-parsed events
    pub fn from_events(mut events: Vec<InstrumentEvent>) -> Result<Self, SongError> {
        if events.is_empty() {
            return Err(SongError::Empty);
        }
        let last_end = events.iter().map(|e| e.end).fold(f64::MIN, f64::max);
        let start = last_end.floor() + TRAILING_GAP_SECS;
        events.push(InstrumentEvent {
            user_played: false,
            instrument_name: TRAILING_INSTRUMENT.to_string(),
            velocity: 0,
            pitch: 0,
            start,
            end: start + 1.0,
            is_last_note: true,
        });
        Ok(Self {
            events: events.into_iter().map(Arc::new).collect(),
        })
    }

    /// Every event, the trailing marker last
    pub fn events(&self) -> &[Arc<InstrumentEvent>] {
        &self.events
    }

    /// Notes the player has to hit
    pub fn playable_count(&self) -> usize {
        self.events.iter().filter(|e| e.user_played).count()
    }

    /// Time of the end signal (seconds)
    pub fn duration(&self) -> f64 {
        self.events.last().map(|e| e.start).unwrap_or(0.0)
    }
}

fn parse_row(line: usize, row: &str) -> Result<InstrumentEvent, SongError> {
    let fields: Vec<&str> = row.trim().split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(SongError::FieldCount {
            line,
            found: fields.len(),
        });
    }

    let invalid = |field: &'static str, value: &str| SongError::InvalidField {
        line,
        field,
        value: value.to_string(),
    };

    let user_played = parse_bool(fields[0]).ok_or_else(|| invalid("user_played", fields[0]))?;
    let instrument_name = fields[1];
    if instrument_name.is_empty() {
        return Err(invalid("instrument_name", fields[1]));
    }
    let velocity = parse_midi(fields[2]).ok_or_else(|| invalid("velocity", fields[2]))?;
    let pitch = parse_midi(fields[3]).ok_or_else(|| invalid("pitch", fields[3]))?;
    let start = parse_time(fields[4]).ok_or_else(|| invalid("start", fields[4]))?;
    let end = parse_time(fields[5]).ok_or_else(|| invalid("end", fields[5]))?;
    if end < start {
        return Err(SongError::NegativeDuration { line, start, end });
    }

    Ok(InstrumentEvent {
        user_played,
        instrument_name: instrument_name.to_string(),
        velocity,
        pitch,
        start,
        end,
        is_last_note: false,
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_midi(s: &str) -> Option<u8> {
    s.parse::<u8>().ok().filter(|v| *v <= MIDI_MAX)
}

fn parse_time(s: &str) -> Option<f64> {
    s.parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && (0.0..=MAX_TIME_SECS).contains(t))
}
