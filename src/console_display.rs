use crate::config::Viewport;
use crate::keyboard::note_names;
use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

const WHITE_CELL: char = '█';
const BLACK_CELL: char = '▓';
const EMPTY_CELL: char = ' ';

/// Renders frames as a text-mode waterfall with the current notes below it.
pub struct ConsoleDisplay {
    rx: Receiver<Frame>,
    viewport: Viewport,
    /// Render one out of every `skip` frames.
    skip: u64,
    cols: usize,
    rows: usize,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<Frame>, viewport: Viewport, skip: u64) -> Self {
        Self {
            rx,
            viewport,
            skip: skip.max(1),
            cols: 88,
            rows: 24,
        }
    }

    pub fn with_size(mut self, cols: usize, rows: usize) -> Self {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
        self
    }

    pub fn run(&self) {
        let mut count: u64 = 0;
        let mut stdout = io::stdout();

        for frame in self.rx.iter() {
            count += 1;
            if count % self.skip != 0 {
                continue;
            }

            // Clear screen and move cursor home
            print!("\x1b[2J\x1b[H");
            println!("╔{}╗", "═".repeat(self.cols));
            for line in rasterize(&frame, self.viewport, self.cols, self.rows) {
                println!("║{}║", line);
            }
            println!("╚{}╝", "═".repeat(self.cols));
            println!("  {}", status_line(&frame));
            let _ = stdout.flush();
        }
    }
}

/// Paint a frame's rectangles onto a `cols` × `rows` character grid.
/// White-key notes are painted first so black-key notes overwrite them.
pub fn rasterize(frame: &Frame, viewport: Viewport, cols: usize, rows: usize) -> Vec<String> {
    let mut grid = vec![vec![EMPTY_CELL; cols]; rows];
    let to_col = |x: f64| x * cols as f64 / viewport.width;
    let to_row = |y: f64| y * rows as f64 / viewport.height;

    for rect in frame.white.iter().chain(frame.black.iter()) {
        let cell = match rect.color {
            ColorToken::WhiteKeyNote => WHITE_CELL,
            ColorToken::BlackKeyNote => BLACK_CELL,
        };
        let Some((c0, c1)) = span(to_col(rect.x), to_col(rect.x + rect.width), cols) else {
            continue;
        };
        let Some((r0, r1)) = span(to_row(rect.y), to_row(rect.y + rect.height), rows) else {
            continue;
        };
        for row in &mut grid[r0..r1] {
            for c in &mut row[c0..c1] {
                *c = cell;
            }
        }
    }

    grid.into_iter().map(|row| row.into_iter().collect()).collect()
}

/// Cell range covered by `[lo, hi)`, at least one cell wide when visible.
fn span(lo: f64, hi: f64, limit: usize) -> Option<(usize, usize)> {
    if hi <= 0.0 || lo >= limit as f64 || hi <= lo {
        return None;
    }
    let start = lo.max(0.0).floor() as usize;
    let end = (hi.ceil() as usize).clamp(start + 1, limit);
    Some((start, end))
}

pub fn status_line(frame: &Frame) -> String {
    let minutes = (frame.time / 60.0).floor();
    let seconds = frame.time - minutes * 60.0;
    let notes = if frame.current_notes.is_empty() {
        "---".to_string()
    } else {
        note_names(&frame.current_notes)
    };
    format!("{:02}:{:05.2}  Notes: {}", minutes as u64, seconds, notes)
}
