//! Standard MIDI File adapter: flattens every track of an SMF into one
//! absolute-tick `RawTrack` for the normalizer.

use crate::error::DecodeError;
use crate::types::{RawEvent, RawEventKind, RawTrack, Resolution, TickMode};
use log::debug;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::fs;
use std::path::Path;

pub fn load_smf(path: &Path) -> Result<RawTrack, DecodeError> {
    let data = fs::read(path).map_err(|e| DecodeError::Io(format!("{}: {}", path.display(), e)))?;
    parse_smf(&data)
}

pub fn parse_smf(data: &[u8]) -> Result<RawTrack, DecodeError> {
    let smf = Smf::parse(data).map_err(|e| DecodeError::Parse(e.to_string()))?;
    Ok(flatten(&smf))
}

/// Merge all tracks by absolute tick. Events at the same tick keep track
/// order, then file order. A single end-of-track marker closes the merge.
pub fn flatten(smf: &Smf) -> RawTrack {
    let resolution = match smf.header.timing {
        Timing::Metrical(tpb) => Resolution::metrical(tpb.as_int() as u32),
        Timing::Timecode(fps, subframes) => Resolution::TicksPerSecond(fps.as_f32() as f64 * subframes as f64),
    };

    let mut events: Vec<RawEvent> = Vec::new();
    let mut end_tick: u64 = 0;
    for track in &smf.tracks {
        let mut tick: u64 = 0;
        for event in track {
            tick += event.delta.as_int() as u64;
            let kind = match event.kind {
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { key, vel } => Some(RawEventKind::NoteOn {
                        pitch: key.as_int(),
                        velocity: vel.as_int(),
                    }),
                    MidiMessage::NoteOff { key, .. } => Some(RawEventKind::NoteOff { pitch: key.as_int() }),
                    _ => None,
                },
                TrackEventKind::Meta(MetaMessage::Tempo(us)) => Some(RawEventKind::Tempo { us_per_beat: us.as_int() }),
                _ => None,
            };
            if let Some(kind) = kind {
                events.push(RawEvent { ticks: tick, kind });
            }
        }
        end_tick = end_tick.max(tick);
    }

    events.sort_by_key(|e| e.ticks);
    events.push(RawEvent { ticks: end_tick, kind: RawEventKind::EndOfTrack });
    debug!("SMF: {} tracks flattened into {} events", smf.tracks.len(), events.len());

    RawTrack {
        resolution,
        tick_mode: TickMode::Absolute,
        events,
    }
}
