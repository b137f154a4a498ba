use crate::config::{NoteStyle, Viewport};
use crate::keyboard::KeyLayout;
use crate::types::{ColorToken, DrawRect, NoteInterval, Pitch};
use log::trace;
use serde::{Deserialize, Serialize};

/// An interval re-expressed relative to the playback time: negative values
/// are in the past, positive in the future.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeNote {
    pub pitch: Pitch,
    pub rel_onset: f64,
    pub rel_offset: f64,
}

/// Rectangles for one frame. Consumers must draw `white` before `black` so
/// black-key notes sit on top of white-key columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Projection {
    pub white: Vec<DrawRect>,
    pub black: Vec<DrawRect>,
}

impl Projection {
    /// All rectangles in draw order.
    pub fn draw_order(&self) -> impl Iterator<Item = &DrawRect> {
        self.white.iter().chain(self.black.iter())
    }

    pub fn len(&self) -> usize {
        self.white.len() + self.black.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn normalize_to_time(window: &[NoteInterval], cur_time: f64) -> Vec<RelativeNote> {
    window
        .iter()
        .map(|n| RelativeNote {
            pitch: n.pitch,
            rel_onset: n.onset - cur_time,
            rel_offset: n.offset - cur_time,
        })
        .collect()
}

/// Split into (white-key, black-key) notes, keeping relative order within
/// each. Pitches the layout does not cover are dropped.
pub fn partition_by_key_color(notes: &[RelativeNote], layout: &KeyLayout) -> (Vec<RelativeNote>, Vec<RelativeNote>) {
    let mut white = Vec::new();
    let mut black = Vec::new();
    for note in notes {
        match layout.get(note.pitch) {
            Some(entry) if entry.is_white => white.push(*note),
            Some(_) => black.push(*note),
            None => trace!("pitch {} outside keyboard, not drawn", note.pitch),
        }
    }
    (white, black)
}

/// Map the active window onto the viewport.
///
/// The playback line is the bottom edge of the viewport and the future
/// scrolls down toward it: a note `window_size` seconds ahead touches the
/// top edge, a note being played touches the bottom, and past notes fall
/// below the viewport. Rectangle height is proportional to note duration.
pub fn project(
    window: &[NoteInterval],
    cur_time: f64,
    window_size: f64,
    layout: &KeyLayout,
    style: &NoteStyle,
    viewport: Viewport,
) -> Projection {
    let relative = normalize_to_time(window, cur_time);
    let (white, black) = partition_by_key_color(&relative, layout);
    Projection {
        white: to_rects(&white, window_size, layout, style, viewport),
        black: to_rects(&black, window_size, layout, style, viewport),
    }
}

fn to_rects(
    notes: &[RelativeNote],
    window_size: f64,
    layout: &KeyLayout,
    style: &NoteStyle,
    viewport: Viewport,
) -> Vec<DrawRect> {
    let px_per_sec = viewport.height / window_size;
    notes
        .iter()
        .filter_map(|note| {
            let key = layout.get(note.pitch)?;
            let width = style.width(key.is_white);
            let color = if key.is_white {
                ColorToken::WhiteKeyNote
            } else {
                ColorToken::BlackKeyNote
            };
            Some(DrawRect {
                x: key.x_center - width / 2.0,
                y: (window_size - note.rel_offset) * px_per_sec,
                width,
                height: ((note.rel_offset - note.rel_onset) * px_per_sec).floor(),
                color,
                pitch: note.pitch,
            })
        })
        .collect()
}
