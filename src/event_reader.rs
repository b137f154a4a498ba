//! JSONL event reader: loads raw decoder output dumped one event per line.
//!
//! The header line names the format and the tick resolution; each following
//! line is one serialized `RawEvent`. Works with any `BufRead`: files,
//! in-memory buffers, stdin.

use crate::error::DecodeError;
use crate::types::{RawEvent, RawTrack, Resolution, TickMode};
use std::io::BufRead;

pub const FORMAT_NAME: &str = "midi-waterfall-events";

/// Parsed JSONL header (first line of an event file).
#[derive(Debug)]
pub struct EventHeader {
    pub format: String,
    pub resolution: Resolution,
    pub tick_mode: TickMode,
    pub raw: serde_json::Value,
}

/// Line-by-line JSONL event reader.
pub struct EventReader<R: BufRead> {
    reader: R,
    pub header: EventHeader,
    line_buf: String,
}

impl<R: BufRead> EventReader<R> {
    /// Read and validate the header line. Returns an error if the header
    /// is missing, unparseable, names another format, or carries no usable
    /// resolution (`ticks_per_beat` or `ticks_per_second`).
    pub fn open(mut reader: R) -> Result<Self, DecodeError> {
        let mut first_line = String::new();
        reader
            .read_line(&mut first_line)
            .map_err(|e| DecodeError::Io(format!("read header: {}", e)))?;

        let first_line = first_line.trim();
        if first_line.is_empty() {
            return Err(DecodeError::Empty);
        }

        let raw: serde_json::Value =
            serde_json::from_str(first_line).map_err(|e| DecodeError::Parse(format!("header: {}", e)))?;

        let format = raw["format"]
            .as_str()
            .ok_or_else(|| DecodeError::Parse("missing \"format\" field".into()))?
            .to_string();
        if format != FORMAT_NAME {
            return Err(DecodeError::Parse(format!("unknown format: {}", format)));
        }

        let resolution = if let Some(tpb) = raw["ticks_per_beat"].as_u64() {
            let us_per_beat = raw["us_per_beat"]
                .as_u64()
                .unwrap_or(Resolution::DEFAULT_US_PER_BEAT as u64);
            Resolution::TicksPerBeat {
                ticks_per_beat: tpb as u32,
                us_per_beat: us_per_beat as u32,
            }
        } else if let Some(rate) = raw["ticks_per_second"].as_f64() {
            Resolution::TicksPerSecond(rate)
        } else {
            return Err(DecodeError::InvalidResolution("header has no ticks_per_beat or ticks_per_second".into()));
        };

        let tick_mode = match raw["tick_mode"].as_str() {
            None | Some("delta") => TickMode::Delta,
            Some("absolute") => TickMode::Absolute,
            Some(other) => return Err(DecodeError::Parse(format!("unknown tick_mode: {}", other))),
        };

        Ok(Self {
            reader,
            header: EventHeader {
                format,
                resolution,
                tick_mode,
                raw,
            },
            line_buf: String::new(),
        })
    }

    /// Read the next event. Returns `None` at EOF, `Err` for unparseable lines.
    pub fn next_event(&mut self) -> Option<Result<RawEvent, DecodeError>> {
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None, // EOF
                Ok(_) => {
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str::<RawEvent>(trimmed)
                            .map_err(|e| DecodeError::Parse(format!("event: {}", e))),
                    );
                }
                Err(e) => return Some(Err(DecodeError::Io(format!("read line: {}", e)))),
            }
        }
    }

    /// Read all remaining events into a track, skipping malformed lines.
    pub fn read_all(mut self) -> RawTrack {
        let mut events = Vec::new();
        while let Some(result) = self.next_event() {
            if let Ok(event) = result {
                events.push(event);
            }
        }
        RawTrack {
            resolution: self.header.resolution,
            tick_mode: self.header.tick_mode,
            events,
        }
    }
}
