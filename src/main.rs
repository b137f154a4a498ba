use midi_waterfall::config::WaterfallConfig;
use midi_waterfall::console_display::{self, ConsoleDisplay};
use midi_waterfall::coordinator::Coordinator;
use midi_waterfall::error::DecodeError;
use midi_waterfall::event_reader::EventReader;
#[cfg(feature = "smf")]
use midi_waterfall::midi_file;
use midi_waterfall::session::PlaybackSession;
use midi_waterfall::transport::{self, Transport};
use midi_waterfall::types::*;

use clap::Parser;
use crossbeam_channel::bounded;
use log::{error, info};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

#[derive(Parser)]
#[command(name = "midi-waterfall")]
#[command(about = "Scrolling note waterfall synchronized to a playback clock")]
struct Cli {
    /// Song to play: a Standard MIDI File (.mid/.midi) or a JSONL event dump
    file: PathBuf,

    /// JSON config file (missing fields take defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds of lookback and lookahead shown around the playback time
    #[arg(long)]
    window_size: Option<f64>,

    /// Viewport height in pixels
    #[arg(long)]
    height: Option<f64>,

    /// Transport frame rate (Hz)
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Transport script: "straight" (play through) or "demo" (seek, pause, skip)
    #[arg(long, default_value = "straight")]
    script: String,

    /// Run as fast as possible instead of in real time
    #[arg(long)]
    fast: bool,

    /// Enable console display (terminal waterfall)
    #[arg(long)]
    console: bool,

    /// Console display refresh: render every Nth frame
    #[arg(long, default_value_t = 2)]
    display_every: u64,

    /// Write every frame as a JSON line to stdout
    #[arg(long)]
    dump_frames: bool,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => WaterfallConfig::load(path).unwrap_or_else(|e| {
            error!("{}", e);
            process::exit(2);
        }),
        None => WaterfallConfig::default(),
    };
    if let Some(w) = cli.window_size {
        config.window_size_secs = w;
    }
    if let Some(h) = cli.height {
        config.viewport.height = h;
    }

    let mut session = PlaybackSession::new(config.clone()).unwrap_or_else(|e| {
        error!("Invalid configuration: {}", e);
        process::exit(2);
    });

    let loaded = read_track(&cli.file).and_then(|track| session.load(&track));
    if let Err(e) = loaded {
        error!("Cannot load {:?}: {}", cli.file, e);
        process::exit(1);
    }
    let duration = session.timeline().duration();

    info!("═══════════════════════════════════════════════");
    info!("  MIDI WATERFALL v{}", env!("CARGO_PKG_VERSION"));
    info!("  File: {:?}", cli.file);
    info!("  Notes: {}  Clusters: {}  Length: {:.1}s",
        session.timeline().notes.len(), session.timeline().clusters.len(), duration);
    info!("  Window: ±{:.1}s  Viewport: {}x{}",
        config.window_size_secs, config.viewport.width, config.viewport.height);
    info!("═══════════════════════════════════════════════");

    // Channel: transport → coordinator
    let (input_tx, input_rx) = bounded::<PlayerEvent>(1024);

    // Channels: coordinator → consumers
    let mut frame_txs: Vec<crossbeam_channel::Sender<Frame>> = Vec::new();
    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<Frame>(256);
        frame_txs.push(tx);
        let viewport = config.viewport;
        let every = cli.display_every;
        handles.push(spawn("display", move || {
            ConsoleDisplay::new(rx, viewport, every).run();
        }));
    }

    // ─── Frame dump (external renderer boundary) ────────────────────
    if cli.dump_frames {
        let (tx, rx) = bounded::<Frame>(1024);
        frame_txs.push(tx);
        handles.push(spawn("frame-dump", move || {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for frame in rx.iter() {
                match serde_json::to_string(&frame) {
                    Ok(line) => {
                        if writeln!(out, "{}", line).is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Frame serialization failed: {}", e),
                }
            }
        }));
    }

    if !cli.console && !cli.dump_frames {
        let (tx, rx) = bounded::<Frame>(256);
        frame_txs.push(tx);
        let every = cli.fps.max(1) as u64;
        handles.push(spawn("status", move || {
            for (i, frame) in rx.iter().enumerate() {
                if i as u64 % every == 0 {
                    info!("{}", console_display::status_line(&frame));
                }
            }
        }));
    }

    // ─── Coordinator ────────────────────────────────────────────────
    handles.push(spawn("coordinator", move || {
        Coordinator::new(input_rx, frame_txs, session).run();
    }));

    // ─── Transport ──────────────────────────────────────────────────
    let script = match cli.script.as_str() {
        "demo" => transport::demo_script(duration),
        "straight" => transport::straight_script(duration),
        other => {
            error!("Unknown script {:?}, playing straight through", other);
            transport::straight_script(duration)
        }
    };
    let fps = cli.fps;
    let realtime = !cli.fast;
    handles.push(spawn("transport", move || {
        Transport::new(input_tx, fps).with_realtime(realtime).run(&script);
    }));

    for h in handles {
        let _ = h.join();
    }
}

fn spawn<F>(name: &str, f: F) -> thread::JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new().name(name.into()).spawn(f).unwrap_or_else(|e| {
        error!("Failed to spawn {} thread: {}", name, e);
        process::exit(1);
    })
}

fn read_track(path: &Path) -> Result<RawTrack, DecodeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        #[cfg(feature = "smf")]
        Some("mid") | Some("midi") => midi_file::load_smf(path),
        #[cfg(not(feature = "smf"))]
        Some("mid") | Some("midi") => Err(DecodeError::Parse(
            "MIDI files need the 'smf' feature; pass a JSONL event dump instead".into(),
        )),
        _ => {
            let file = File::open(path).map_err(|e| DecodeError::Io(format!("{}: {}", path.display(), e)))?;
            Ok(EventReader::open(BufReader::new(file))?.read_all())
        }
    }
}
