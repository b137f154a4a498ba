//! Raw decoder events → sorted note intervals and onset clusters.
//!
//! Ticks are converted with a single global tempo. Each note-on is paired
//! with the earliest still-unpaired note-off of the same pitch; notes left
//! open are closed at the track's last tick.

use crate::error::DecodeError;
use crate::types::*;
use log::{debug, warn};
use std::collections::{BTreeSet, VecDeque};

/// Onsets closer than this are merged into one cluster.
pub const ONSET_TOLERANCE_SECS: f64 = 1e-6;

/// Build the full sorted sequence and cluster sequence for one track.
/// Either both are produced or an error is returned.
pub fn normalize(track: &RawTrack) -> Result<Timeline, DecodeError> {
    if track.events.is_empty() {
        return Err(DecodeError::Empty);
    }

    let absolute = absolute_ticks(track)?;
    let (scale_num, scale_den) = tick_scale(track)?;
    let to_secs = |tick: u64| tick as f64 * scale_num / scale_den;

    let mut pending: Vec<VecDeque<u64>> = vec![VecDeque::new(); 128];
    let mut intervals: Vec<(Pitch, u64, u64)> = Vec::new();
    let mut unmatched_offs = 0usize;
    let mut zero_length = 0usize;

    for (event, &tick) in track.events.iter().zip(&absolute) {
        match event.kind {
            RawEventKind::NoteOn { pitch, velocity } if velocity > 0 => {
                pending[pitch as usize].push_back(tick);
            }
            RawEventKind::NoteOn { pitch, .. } | RawEventKind::NoteOff { pitch } => {
                match pending[pitch as usize].pop_front() {
                    Some(on) if tick > on => intervals.push((pitch, on, tick)),
                    Some(_) => zero_length += 1,
                    None => unmatched_offs += 1,
                }
            }
            RawEventKind::Tempo { .. } | RawEventKind::EndOfTrack => {}
        }
    }

    let end_tick = absolute.last().copied().unwrap_or(0);
    let mut closed_at_end = 0usize;
    for (pitch, queue) in pending.iter().enumerate() {
        for &on in queue {
            if end_tick > on {
                intervals.push((pitch as Pitch, on, end_tick));
                closed_at_end += 1;
            } else {
                zero_length += 1;
            }
        }
    }

    if unmatched_offs > 0 {
        warn!("Dropped {} note-off(s) with no preceding note-on", unmatched_offs);
    }
    if zero_length > 0 {
        warn!("Dropped {} zero-length note(s)", zero_length);
    }
    if closed_at_end > 0 {
        debug!("Closed {} unreleased note(s) at end of track", closed_at_end);
    }

    let mut notes: Vec<NoteInterval> = intervals
        .into_iter()
        .map(|(pitch, on, off)| NoteInterval {
            pitch,
            onset: to_secs(on),
            offset: to_secs(off),
        })
        .collect();
    if notes.is_empty() {
        return Err(DecodeError::NoNotes);
    }
    notes.sort_by(|a, b| a.onset.total_cmp(&b.onset).then(a.pitch.cmp(&b.pitch)));

    let clusters = build_clusters(&notes);
    debug!("Normalized {} events → {} notes, {} clusters", track.events.len(), notes.len(), clusters.len());

    Ok(Timeline { notes, clusters })
}

/// Group onsets within `ONSET_TOLERANCE_SECS` of a cluster's first onset.
/// `notes` must be sorted by onset.
pub fn build_clusters(notes: &[NoteInterval]) -> Vec<NoteCluster> {
    let mut clusters: Vec<NoteCluster> = Vec::new();
    for note in notes {
        match clusters.last_mut() {
            Some(last) if note.onset - last.time <= ONSET_TOLERANCE_SECS => {
                last.notes.insert(note.pitch);
            }
            _ => clusters.push(NoteCluster {
                time: note.onset,
                notes: BTreeSet::from([note.pitch]),
            }),
        }
    }
    clusters
}

/// Resolve each event's absolute tick, validating pitches and ordering.
fn absolute_ticks(track: &RawTrack) -> Result<Vec<u64>, DecodeError> {
    let mut out = Vec::with_capacity(track.events.len());
    let mut now: u64 = 0;
    for (index, event) in track.events.iter().enumerate() {
        if let RawEventKind::NoteOn { pitch, .. } | RawEventKind::NoteOff { pitch } = event.kind {
            if pitch > 127 {
                return Err(DecodeError::PitchOutOfRange { pitch, index });
            }
        }
        now = match track.tick_mode {
            TickMode::Delta => now.saturating_add(event.ticks),
            TickMode::Absolute => {
                if event.ticks < now {
                    return Err(DecodeError::TickRegression { index });
                }
                event.ticks
            }
        };
        out.push(now);
    }
    Ok(out)
}

/// Seconds per tick as a `(numerator, denominator)` pair under one global
/// tempo: the first Tempo event wins over the resolution's default. Tempo
/// maps are not supported.
fn tick_scale(track: &RawTrack) -> Result<(f64, f64), DecodeError> {
    match track.resolution {
        Resolution::TicksPerSecond(rate) => {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(DecodeError::InvalidResolution(format!("{} ticks per second", rate)));
            }
            Ok((1.0, rate))
        }
        Resolution::TicksPerBeat { ticks_per_beat, us_per_beat } => {
            if ticks_per_beat == 0 {
                return Err(DecodeError::InvalidResolution("0 ticks per beat".into()));
            }
            let mut tempos = track.events.iter().filter_map(|e| match e.kind {
                RawEventKind::Tempo { us_per_beat } => Some(us_per_beat),
                _ => None,
            });
            let tempo = tempos.next().unwrap_or(us_per_beat);
            let ignored = tempos.filter(|&t| t != tempo).count();
            if ignored > 0 {
                warn!("Ignoring {} tempo change(s); using {} µs per beat throughout", ignored, tempo);
            }
            if tempo == 0 {
                return Err(DecodeError::InvalidTempo(tempo));
            }
            Ok((tempo as f64, 1_000_000.0 * ticks_per_beat as f64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 480 ticks per beat at 120 BPM: 960 ticks = 1 second.
    fn track(events: Vec<RawEvent>) -> RawTrack {
        RawTrack {
            resolution: Resolution::metrical(480),
            tick_mode: TickMode::Absolute,
            events,
        }
    }

    fn onsets(t: &Timeline) -> Vec<f64> {
        t.notes.iter().map(|n| n.onset).collect()
    }

    #[test]
    fn test_simultaneous_onsets_merge_into_one_cluster() {
        let t = normalize(&track(vec![
            RawEvent::note_on(960, 60, 100),
            RawEvent::note_on(960, 64, 100),
            RawEvent::note_off(1920, 60),
            RawEvent::note_off(1920, 64),
            RawEvent::note_on(2400, 67, 100),
            RawEvent::note_off(2880, 67),
        ]))
        .unwrap();

        assert_eq!(t.clusters.len(), 2);
        assert_eq!(t.clusters[0].time, 1.0);
        assert_eq!(t.clusters[0].notes, BTreeSet::from([60, 64]));
        assert_eq!(t.clusters[1].time, 2.5);
        assert_eq!(t.clusters[1].notes, BTreeSet::from([67]));
        assert_eq!(onsets(&t), vec![1.0, 1.0, 2.5]);
        assert_eq!(t.notes[2].offset, 3.0);
    }

    #[test]
    fn test_delta_ticks_accumulate() {
        let t = normalize(&RawTrack {
            resolution: Resolution::metrical(480),
            tick_mode: TickMode::Delta,
            events: vec![
                RawEvent::note_on(0, 60, 90),
                RawEvent::note_off(480, 60),
                RawEvent::note_on(480, 62, 90),
                RawEvent::note_off(480, 62),
            ],
        })
        .unwrap();
        assert_eq!(t.notes[0], NoteInterval { pitch: 60, onset: 0.0, offset: 0.5 });
        assert_eq!(t.notes[1], NoteInterval { pitch: 62, onset: 1.0, offset: 1.5 });
    }

    #[test]
    fn test_output_sorted_by_onset() {
        // Long note struck first, short notes interleaved with its release
        let t = normalize(&track(vec![
            RawEvent::note_on(0, 48, 80),
            RawEvent::note_on(100, 72, 80),
            RawEvent::note_off(200, 72),
            RawEvent::note_on(300, 74, 80),
            RawEvent::note_off(350, 74),
            RawEvent::note_off(400, 48),
            RawEvent::note_on(400, 50, 80),
            RawEvent::note_off(500, 50),
        ]))
        .unwrap();
        for pair in t.notes.windows(2) {
            assert!(pair[0].onset <= pair[1].onset);
        }
        for pair in t.clusters.windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }

    #[test]
    fn test_repeated_pitch_pairs_first_in_first_out() {
        let t = normalize(&track(vec![
            RawEvent::note_on(0, 60, 80),
            RawEvent::note_on(480, 60, 80),
            RawEvent::note_off(960, 60),
            RawEvent::note_off(1440, 60),
        ]))
        .unwrap();
        assert_eq!(t.notes.len(), 2);
        assert_eq!((t.notes[0].onset, t.notes[0].offset), (0.0, 1.0));
        assert_eq!((t.notes[1].onset, t.notes[1].offset), (0.5, 1.5));
    }

    #[test]
    fn test_zero_velocity_note_on_releases() {
        let t = normalize(&track(vec![
            RawEvent::note_on(0, 60, 80),
            RawEvent::note_on(960, 60, 0),
        ]))
        .unwrap();
        assert_eq!(t.notes, vec![NoteInterval { pitch: 60, onset: 0.0, offset: 1.0 }]);
    }

    #[test]
    fn test_unreleased_note_closed_at_end_of_track() {
        let t = normalize(&track(vec![
            RawEvent::note_on(0, 60, 80),
            RawEvent::note_on(480, 64, 80),
            RawEvent::note_off(960, 60),
            RawEvent { ticks: 1920, kind: RawEventKind::EndOfTrack },
        ]))
        .unwrap();
        let held = t.notes.iter().find(|n| n.pitch == 64).unwrap();
        assert_eq!(held.offset, 2.0);
    }

    #[test]
    fn test_unmatched_note_off_dropped() {
        let t = normalize(&track(vec![
            RawEvent::note_off(0, 50),
            RawEvent::note_on(480, 60, 80),
            RawEvent::note_off(960, 60),
        ]))
        .unwrap();
        assert_eq!(t.notes.len(), 1);
        assert_eq!(t.notes[0].pitch, 60);
    }

    #[test]
    fn test_zero_length_notes_dropped() {
        let t = normalize(&track(vec![
            RawEvent::note_on(0, 60, 80),
            RawEvent::note_off(0, 60),
            RawEvent::note_on(0, 62, 80),
            RawEvent::note_off(480, 62),
            RawEvent::note_on(480, 64, 80), // open at the very last tick
        ]))
        .unwrap();
        assert_eq!(t.notes.len(), 1);
        assert_eq!(t.notes[0].pitch, 62);
    }

    #[test]
    fn test_tempo_event_overrides_default() {
        let mut events = vec![RawEvent { ticks: 0, kind: RawEventKind::Tempo { us_per_beat: 1_000_000 } }];
        events.push(RawEvent::note_on(0, 60, 80));
        events.push(RawEvent::note_off(480, 60));
        // Later change is ignored
        events.push(RawEvent { ticks: 480, kind: RawEventKind::Tempo { us_per_beat: 250_000 } });
        events.push(RawEvent::note_on(480, 62, 80));
        events.push(RawEvent::note_off(960, 62));
        let t = normalize(&track(events)).unwrap();
        assert_eq!(t.notes[0].offset, 1.0);
        assert_eq!(t.notes[1].onset, 1.0);
        assert_eq!(t.notes[1].offset, 2.0);
    }

    #[test]
    fn test_timecode_resolution() {
        let t = normalize(&RawTrack {
            resolution: Resolution::TicksPerSecond(1000.0),
            tick_mode: TickMode::Absolute,
            events: vec![RawEvent::note_on(250, 60, 80), RawEvent::note_off(750, 60)],
        })
        .unwrap();
        assert_eq!(t.notes[0], NoteInterval { pitch: 60, onset: 0.25, offset: 0.75 });
    }

    #[test]
    fn test_empty_track_fails() {
        assert_eq!(normalize(&track(vec![])), Err(DecodeError::Empty));
    }

    #[test]
    fn test_nothing_resolvable_fails() {
        let err = normalize(&track(vec![RawEvent::note_off(0, 60), RawEvent::note_off(10, 61)]));
        assert_eq!(err, Err(DecodeError::NoNotes));
    }

    #[test]
    fn test_malformed_inputs_fail() {
        assert_eq!(
            normalize(&track(vec![RawEvent::note_on(0, 200, 80)])),
            Err(DecodeError::PitchOutOfRange { pitch: 200, index: 0 })
        );
        assert_eq!(
            normalize(&track(vec![RawEvent::note_on(100, 60, 80), RawEvent::note_off(50, 60)])),
            Err(DecodeError::TickRegression { index: 1 })
        );
        let mut bad = track(vec![RawEvent::note_on(0, 60, 80), RawEvent::note_off(10, 60)]);
        bad.resolution = Resolution::TicksPerBeat { ticks_per_beat: 0, us_per_beat: 500_000 };
        assert!(matches!(normalize(&bad), Err(DecodeError::InvalidResolution(_))));
        bad.resolution = Resolution::TicksPerSecond(0.0);
        assert!(matches!(normalize(&bad), Err(DecodeError::InvalidResolution(_))));
        bad.resolution = Resolution::TicksPerBeat { ticks_per_beat: 480, us_per_beat: 0 };
        assert_eq!(normalize(&bad), Err(DecodeError::InvalidTempo(0)));
    }

    #[test]
    fn test_clusters_tolerate_float_jitter() {
        let notes = vec![
            NoteInterval { pitch: 60, onset: 1.0, offset: 2.0 },
            NoteInterval { pitch: 64, onset: 1.0 + 1e-9, offset: 2.0 },
            NoteInterval { pitch: 67, onset: 1.1, offset: 2.0 },
        ];
        let clusters = build_clusters(&notes);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].notes, BTreeSet::from([60, 64]));
    }
}
