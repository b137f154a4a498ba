use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ─── Raw decoder output ─────────────────────────────────────────────────────

/// MIDI pitch number, 0–127.
pub type Pitch = u8;

/// How tick counts are converted to seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Metrical timing: ticks per quarter note plus the default tempo
    /// (microseconds per quarter note) used until a Tempo event overrides it.
    TicksPerBeat { ticks_per_beat: u32, us_per_beat: u32 },
    /// Timecode timing (SMPTE): a fixed tick rate independent of tempo.
    TicksPerSecond(f64),
}

impl Resolution {
    /// Default MIDI tempo: 120 BPM.
    pub const DEFAULT_US_PER_BEAT: u32 = 500_000;

    pub fn metrical(ticks_per_beat: u32) -> Self {
        Resolution::TicksPerBeat {
            ticks_per_beat,
            us_per_beat: Self::DEFAULT_US_PER_BEAT,
        }
    }
}

/// Whether `RawEvent::ticks` is relative to the previous event or to track start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TickMode {
    #[default]
    Delta,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawEventKind {
    /// A note-on with velocity 0 is treated as a note-off.
    NoteOn { pitch: Pitch, velocity: u8 },
    NoteOff { pitch: Pitch },
    Tempo { us_per_beat: u32 },
    EndOfTrack,
}

/// One decoded track event, timed in native ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub ticks: u64,
    #[serde(flatten)]
    pub kind: RawEventKind,
}

impl RawEvent {
    pub fn note_on(ticks: u64, pitch: Pitch, velocity: u8) -> Self {
        Self { ticks, kind: RawEventKind::NoteOn { pitch, velocity } }
    }

    pub fn note_off(ticks: u64, pitch: Pitch) -> Self {
        Self { ticks, kind: RawEventKind::NoteOff { pitch } }
    }
}

/// A flattened track as delivered by the external decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrack {
    pub resolution: Resolution,
    #[serde(default)]
    pub tick_mode: TickMode,
    pub events: Vec<RawEvent>,
}

// ─── Normalized timeline ────────────────────────────────────────────────────

/// A single note's onset-to-offset span in seconds.
/// Sounding over the half-open interval `[onset, offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteInterval {
    pub pitch: Pitch,
    pub onset: f64,
    /// Always strictly greater than `onset`.
    pub offset: f64,
}

impl NoteInterval {
    pub fn duration(&self) -> f64 {
        self.offset - self.onset
    }

    /// True while the note is held: from its onset instant up to, but not
    /// including, its release instant.
    pub fn is_sounding_at(&self, time: f64) -> bool {
        self.onset <= time && time < self.offset
    }
}

/// All pitches sharing one onset instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteCluster {
    pub time: f64,
    pub notes: BTreeSet<Pitch>,
}

/// The immutable product of a file load: intervals sorted by onset and
/// clusters sorted by strictly increasing time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub notes: Vec<NoteInterval>,
    pub clusters: Vec<NoteCluster>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Latest release instant in the timeline, 0.0 when empty.
    pub fn duration(&self) -> f64 {
        self.notes.iter().map(|n| n.offset).fold(0.0, f64::max)
    }
}

// ─── Playback state ─────────────────────────────────────────────────────────

/// Whether a time update continues steady forward playback or jumps.
/// Selects full versus incremental search in both the index search and
/// the window maintainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Continuity {
    /// Forward-or-equal progress since the previous update.
    Continuous,
    /// Seek, scrub, load, pause/resume or first update.
    Discontinuous,
}

/// A playback clock reading delivered by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeUpdate {
    /// Seconds since the start of the song.
    pub time: f64,
    pub continuity: Continuity,
}

impl TimeUpdate {
    pub fn continuous(time: f64) -> Self {
        Self { time, continuity: Continuity::Continuous }
    }

    pub fn discontinuous(time: f64) -> Self {
        Self { time, continuity: Continuity::Discontinuous }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PlaybackCursor {
    pub cur_time: f64,
    /// Index of the cluster currently sounding; None before the first cluster.
    pub cluster_index: Option<usize>,
}

/// Half-open index range `[start, end)` into the full sorted sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WindowBounds {
    pub start: usize,
    pub end: usize,
}

impl WindowBounds {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only view of the window over `notes`.
    pub fn slice<'a>(&self, notes: &'a [NoteInterval]) -> &'a [NoteInterval] {
        let end = self.end.min(notes.len());
        let start = self.start.min(end);
        &notes[start..end]
    }
}

// ─── Render output ──────────────────────────────────────────────────────────

/// Which palette entry a rectangle is filled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorToken {
    WhiteKeyNote,
    BlackKeyNote,
}

/// A plain axis-aligned rectangle in viewport pixels. y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: ColorToken,
    pub pitch: Pitch,
}

/// Everything downstream consumers need for one time update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: f64,
    pub cluster_index: Option<usize>,
    /// Pitches of the active cluster (empty before the first cluster).
    pub current_notes: Vec<Pitch>,
    /// Pitches of window intervals held at `time`.
    pub sounding: Vec<Pitch>,
    pub window: WindowBounds,
    /// Drawn first.
    pub white: Vec<DrawRect>,
    /// Drawn over the white-key notes.
    pub black: Vec<DrawRect>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cluster = match self.cluster_index {
            Some(i) => i.to_string(),
            None => "---".to_string(),
        };
        write!(
            f,
            "t={:>8.3}s  cluster={:<5} window=[{}, {})  rects={}w/{}b  notes={:?}",
            self.time,
            cluster,
            self.window.start,
            self.window.end,
            self.white.len(),
            self.black.len(),
            self.current_notes,
        )
    }
}

// ─── Inter-thread messages ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A freshly decoded file; replaces the current timeline atomically.
    Load(RawTrack),
    Time(TimeUpdate),
}
