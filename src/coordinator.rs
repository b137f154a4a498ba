use crate::session::PlaybackSession;
use crate::types::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, trace};

/// The coordinator receives PlayerEvents (file loads and time updates),
/// applies them to the playback session one at a time, and fans each
/// resulting Frame out to downstream consumers (display, renderer).
///
/// A load replaces the song atomically; a failed load is logged and the
/// previous song keeps playing. The loop ends when every sender of the
/// input channel has been dropped.
pub struct Coordinator {
    input_rx: Receiver<PlayerEvent>,
    frame_txs: Vec<Sender<Frame>>,
    session: PlaybackSession,
}

impl Coordinator {
    pub fn new(input_rx: Receiver<PlayerEvent>, frame_txs: Vec<Sender<Frame>>, session: PlaybackSession) -> Self {
        Self { input_rx, frame_txs, session }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn run(&mut self) {
        info!(
            "Coordinator running (window ±{:.1}s, {} keys)",
            self.session.config().window_size_secs,
            self.session.layout().len()
        );

        let mut frame_count: u64 = 0;

        for event in self.input_rx.iter() {
            match event {
                PlayerEvent::Load(track) => {
                    if let Err(e) = self.session.load(&track) {
                        error!("Load failed, keeping current song: {}", e);
                    }
                }

                PlayerEvent::Time(update) => {
                    let frame = self.session.update(update);

                    for tx in &self.frame_txs {
                        let _ = tx.send(frame.clone());
                    }

                    frame_count += 1;
                    if frame_count % 1000 == 0 {
                        debug!("Coordinator: {} frames processed", frame_count);
                        trace!("Latest: {}", frame);
                    }
                }
            }
        }

        info!("Coordinator shutting down after {} frames", frame_count);
    }
}
