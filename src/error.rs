use thiserror::Error;

/// Failure to turn decoder output into a timeline. Nothing is committed
/// when one of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("track contains no events")]
    Empty,
    #[error("invalid tick resolution: {0}")]
    InvalidResolution(String),
    #[error("invalid tempo: {0} µs per beat")]
    InvalidTempo(u32),
    #[error("event {index}: pitch {pitch} outside 0-127")]
    PitchOutOfRange { pitch: u8, index: usize },
    #[error("event {index}: absolute tick goes backwards")]
    TickRegression { index: usize },
    #[error("no note-on could be resolved into an interval")]
    NoNotes,
    #[error("parse: {0}")]
    Parse(String),
    #[error("read: {0}")]
    Io(String),
}

/// Rejected setup values. Raised once, before any frame is produced.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("window size must be a positive number of seconds, got {0}")]
    WindowSize(f64),
    #[error("key width must be positive, got {0}")]
    KeyWidth(f64),
    #[error("viewport must be non-empty, got {width}x{height}")]
    Viewport { width: f64, height: f64 },
    #[error("key range {lowest}..={highest} is empty or outside 0-127")]
    KeyRange { lowest: u8, highest: u8 },
    #[error("read config: {0}")]
    Read(String),
    #[error("parse config: {0}")]
    Parse(String),
}
