use crate::types::*;
use crossbeam_channel::Sender;
use log::info;
use std::thread;
use std::time::Duration;

/// Stands in for an audio player: walks a script of play/pause/seek steps
/// and emits one TimeUpdate per frame, flagging every jump as a
/// discontinuity the way a real transport would after a seek or resume.
pub struct Transport {
    tx: Sender<PlayerEvent>,
    fps: u32,
    /// Sleep one frame period per update; off for tests and batch runs.
    realtime: bool,
    position: f64,
    /// Next emitted update must be flagged Discontinuous.
    jumped: bool,
    emitted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportStep {
    /// Advance playback for `ms` milliseconds of song time.
    Play { ms: u32 },
    /// Hold position for `ms` milliseconds; emits nothing.
    Pause { ms: u32 },
    /// Jump to an absolute song position.
    Seek { to_secs: f64 },
}

impl Transport {
    pub fn new(tx: Sender<PlayerEvent>, fps: u32) -> Self {
        Self {
            tx,
            fps: fps.max(1),
            realtime: false,
            position: 0.0,
            jumped: true,
            emitted: 0,
        }
    }

    pub fn with_realtime(mut self, enabled: bool) -> Self {
        self.realtime = enabled;
        self
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Updates sent so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Play the whole script. Blocks the calling thread in real-time mode.
    pub fn run(&mut self, script: &[TransportStep]) {
        info!("Transport starting ({} steps at {} fps)", script.len(), self.fps);
        for step in script {
            self.execute(*step);
        }
        info!("Transport finished at {:.2}s after {} updates", self.position, self.emitted);
    }

    fn execute(&mut self, step: TransportStep) {
        match step {
            TransportStep::Play { ms } => {
                info!("  play {}ms from {:.2}s", ms, self.position);
                let frame_secs = 1.0 / self.fps as f64;
                let frames = (ms as u64 * self.fps as u64) / 1000;
                let start = self.position;
                // Emit the starting position so a seek lands on screen immediately
                self.emit();
                for i in 1..=frames {
                    self.position = start + i as f64 * frame_secs;
                    self.emit();
                }
            }

            TransportStep::Pause { ms } => {
                info!("  pause {}ms at {:.2}s", ms, self.position);
                if self.realtime {
                    thread::sleep(Duration::from_millis(ms as u64));
                }
                self.jumped = true;
            }

            TransportStep::Seek { to_secs } => {
                info!("  seek {:.2}s → {:.2}s", self.position, to_secs);
                self.position = to_secs.max(0.0);
                self.jumped = true;
            }
        }
    }

    fn emit(&mut self) {
        let update = if self.jumped {
            TimeUpdate::discontinuous(self.position)
        } else {
            TimeUpdate::continuous(self.position)
        };
        self.jumped = false;
        let _ = self.tx.send(PlayerEvent::Time(update));
        self.emitted += 1;

        if self.realtime {
            thread::sleep(Duration::from_micros(1_000_000 / self.fps as u64));
        }
    }
}

/// Play from the top to `duration_secs`.
pub fn straight_script(duration_secs: f64) -> Vec<TransportStep> {
    vec![TransportStep::Play { ms: secs_to_ms(duration_secs) }]
}

/// Exercise every kind of jump: play, scrub back, pause, skip ahead, play
/// out the rest.
pub fn demo_script(duration_secs: f64) -> Vec<TransportStep> {
    let third = duration_secs / 3.0;
    vec![
        TransportStep::Play { ms: secs_to_ms(third) },
        TransportStep::Seek { to_secs: third / 2.0 },
        TransportStep::Play { ms: secs_to_ms(third / 2.0) },
        TransportStep::Pause { ms: 500 },
        TransportStep::Seek { to_secs: 2.0 * third },
        TransportStep::Play { ms: secs_to_ms(third) },
    ]
}

fn secs_to_ms(secs: f64) -> u32 {
    (secs.max(0.0) * 1000.0).round() as u32
}
