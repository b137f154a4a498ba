use crate::config::WaterfallConfig;
use crate::error::{ConfigError, DecodeError};
use crate::keyboard::KeyLayout;
use crate::normalizer::normalize;
use crate::projector::project;
use crate::search::find_cluster_index;
use crate::types::*;
use crate::window::update_window;
use log::{info, warn};

/// Owns one loaded song and the per-frame playback state derived from it.
///
/// The timeline is replaced only by a successful `load`; the cursor and
/// window are rewritten once per `update`. Updates are applied one at a
/// time, each fully before the next.
pub struct PlaybackSession {
    config: WaterfallConfig,
    layout: KeyLayout,
    timeline: Timeline,
    cursor: PlaybackCursor,
    window: WindowBounds,
    /// Set by load so the first update after it does a full search.
    needs_resync: bool,
}

impl PlaybackSession {
    pub fn new(config: WaterfallConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = KeyLayout::build_for_range(config.key_width, config.key_range);
        Ok(Self {
            config,
            layout,
            timeline: Timeline::default(),
            cursor: PlaybackCursor::default(),
            window: WindowBounds::default(),
            needs_resync: true,
        })
    }

    /// Decode and install a new track. On error the current song and
    /// playback state are left exactly as they were.
    pub fn load(&mut self, track: &RawTrack) -> Result<(), DecodeError> {
        let timeline = normalize(track)?;
        info!(
            "Loaded {} notes in {} clusters ({:.1}s)",
            timeline.notes.len(),
            timeline.clusters.len(),
            timeline.duration()
        );
        self.install(timeline);
        Ok(())
    }

    /// Install an already-normalized timeline.
    pub fn install(&mut self, timeline: Timeline) {
        self.timeline = timeline;
        self.cursor = PlaybackCursor::default();
        self.window = WindowBounds::default();
        self.needs_resync = true;
    }

    /// Advance the cursor and window to `update.time` and project the frame.
    pub fn update(&mut self, update: TimeUpdate) -> Frame {
        let continuity = self.effective_continuity(update);
        let time = update.time;

        let cluster_index = find_cluster_index(time, &self.timeline.clusters, self.cursor.cluster_index, continuity);
        let window = update_window(time, &self.timeline.notes, self.window, self.config.window_size_secs, continuity);

        self.cursor = PlaybackCursor { cur_time: time, cluster_index };
        self.window = window;
        self.needs_resync = false;

        let active = window.slice(&self.timeline.notes);
        let projection = project(
            active,
            time,
            self.config.window_size_secs,
            &self.layout,
            &self.config.style,
            self.config.viewport,
        );

        let mut sounding: Vec<Pitch> = active.iter().filter(|n| n.is_sounding_at(time)).map(|n| n.pitch).collect();
        sounding.sort_unstable();
        sounding.dedup();

        Frame {
            time,
            cluster_index,
            current_notes: self.current_notes(),
            sounding,
            window,
            white: projection.white,
            black: projection.black,
        }
    }

    /// Forward-only search is only valid for forward-or-equal time since
    /// the last update on the same timeline.
    fn effective_continuity(&self, update: TimeUpdate) -> Continuity {
        if self.needs_resync {
            return Continuity::Discontinuous;
        }
        if update.continuity == Continuity::Continuous && update.time < self.cursor.cur_time {
            warn!(
                "Time went backwards ({:.3}s → {:.3}s) without a seek; rescanning",
                self.cursor.cur_time, update.time
            );
            return Continuity::Discontinuous;
        }
        update.continuity
    }

    /// Pitches of the cluster under the cursor, ascending.
    pub fn current_notes(&self) -> Vec<Pitch> {
        self.cursor
            .cluster_index
            .and_then(|i| self.timeline.clusters.get(i))
            .map(|c| c.notes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Read-only view of the intervals near the cursor.
    pub fn active_window(&self) -> &[NoteInterval] {
        self.window.slice(&self.timeline.notes)
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    pub fn window(&self) -> WindowBounds {
        self.window
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn config(&self) -> &WaterfallConfig {
        &self.config
    }
}
