//! Sliding window of note intervals around the playback time.
//!
//! The window holds every interval whose onset lies in
//! `[cur_time - window_size, cur_time + window_size]`. During steady
//! playback both bounds only move forward, so each update touches just the
//! notes entering or leaving the band.

use crate::types::{Continuity, NoteInterval, WindowBounds};
use log::warn;

/// Smallest window size accepted at runtime. Setup rejects non-positive
/// sizes; this only guards values that slip past it.
pub const MIN_WINDOW_SIZE_SECS: f64 = 1e-3;

pub fn update_window(
    cur_time: f64,
    notes: &[NoteInterval],
    prev: WindowBounds,
    window_size: f64,
    continuity: Continuity,
) -> WindowBounds {
    let window_size = clamp_window_size(window_size);
    let lookback = cur_time - window_size;
    let lookahead = cur_time + window_size;

    let bounds = match continuity {
        Continuity::Discontinuous => WindowBounds {
            start: notes.partition_point(|n| n.onset < lookback),
            end: notes.partition_point(|n| n.onset <= lookahead),
        },
        Continuity::Continuous => {
            let mut start = prev.start.min(notes.len());
            while start < notes.len() && notes[start].onset < lookback {
                start += 1;
            }
            let mut end = prev.end.clamp(start, notes.len());
            while end < notes.len() && notes[end].onset <= lookahead {
                end += 1;
            }
            WindowBounds { start, end }
        }
    };

    // start can only pass end if the band is inverted; show nothing
    if bounds.start > bounds.end {
        return WindowBounds::new(bounds.start, bounds.start);
    }
    bounds
}

fn clamp_window_size(window_size: f64) -> f64 {
    if window_size.is_finite() && window_size >= MIN_WINDOW_SIZE_SECS {
        return window_size;
    }
    warn!("Window size {} out of range, clamping to {}", window_size, MIN_WINDOW_SIZE_SECS);
    MIN_WINDOW_SIZE_SECS
}
