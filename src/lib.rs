pub mod config;
pub mod console_display;
pub mod coordinator;
pub mod error;
pub mod event_reader;
pub mod keyboard;
pub mod normalizer;
pub mod projector;
pub mod search;
pub mod session;
pub mod transport;
pub mod types;
pub mod window;

#[cfg(feature = "smf")]
pub mod midi_file;
