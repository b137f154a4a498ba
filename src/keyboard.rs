use crate::types::Pitch;
use serde::{Deserialize, Serialize};

pub const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Pitch classes (C = 0) with a white key.
const WHITE_PITCH_CLASSES: [bool; 12] = [
    true, false, true, false, true, true, false, true, false, true, false, true,
];

/// Inclusive pitch range covered by the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub lowest: Pitch,
    pub highest: Pitch,
}

impl Default for KeyRange {
    /// Standard 88-key piano: A0 (21) to C8 (108).
    fn default() -> Self {
        Self { lowest: 21, highest: 108 }
    }
}

impl KeyRange {
    pub fn is_valid(&self) -> bool {
        self.lowest <= self.highest && self.highest <= 127
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        (self.lowest..=self.highest).contains(&pitch)
    }

    pub fn white_key_count(&self) -> usize {
        (self.lowest..=self.highest).filter(|&p| is_white_key(p)).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyLayoutEntry {
    pub pitch: Pitch,
    /// Horizontal center of the key column in pixels.
    pub x_center: f64,
    pub is_white: bool,
}

/// Pitch → key geometry, built once per session and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyLayout {
    range: KeyRange,
    entries: Vec<KeyLayoutEntry>,
}

impl KeyLayout {
    /// 88-key layout with `key_width_unit` pixels per white key.
    pub fn build(key_width_unit: f64) -> Self {
        Self::build_for_range(key_width_unit, KeyRange::default())
    }

    /// White keys sit side by side, each `key_width_unit` wide. A black key
    /// is centered on the boundary between the white keys on either side.
    /// An invalid range yields an empty layout.
    pub fn build_for_range(key_width_unit: f64, range: KeyRange) -> Self {
        let mut entries = Vec::new();
        if range.is_valid() {
            let mut whites_so_far = 0usize;
            for pitch in range.lowest..=range.highest {
                let is_white = is_white_key(pitch);
                let x_center = if is_white {
                    let x = whites_so_far as f64 * key_width_unit + key_width_unit / 2.0;
                    whites_so_far += 1;
                    x
                } else {
                    whites_so_far as f64 * key_width_unit
                };
                entries.push(KeyLayoutEntry { pitch, x_center, is_white });
            }
        }
        Self { range, entries }
    }

    pub fn get(&self, pitch: Pitch) -> Option<&KeyLayoutEntry> {
        if !self.range.contains(pitch) {
            return None;
        }
        self.entries.get((pitch - self.range.lowest) as usize)
    }

    pub fn range(&self) -> KeyRange {
        self.range
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyLayoutEntry> {
        self.entries.iter()
    }
}

pub fn is_white_key(pitch: Pitch) -> bool {
    WHITE_PITCH_CLASSES[(pitch % 12) as usize]
}

/// Scientific pitch name, sharps only: 60 → "C4", 61 → "C#4", 21 → "A0".
pub fn note_name(pitch: Pitch) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

/// Comma-separated names, in the order given.
pub fn note_names(pitches: &[Pitch]) -> String {
    pitches.iter().map(|&p| note_name(p)).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_piano_has_52_white_keys() {
        let layout = KeyLayout::build(22.0);
        assert_eq!(layout.len(), 88);
        assert_eq!(layout.iter().filter(|e| e.is_white).count(), 52);
        assert_eq!(KeyRange::default().white_key_count(), 52);
    }

    #[test]
    fn test_white_keys_evenly_spaced() {
        let layout = KeyLayout::build(22.0);
        let whites: Vec<f64> = layout.iter().filter(|e| e.is_white).map(|e| e.x_center).collect();
        assert_eq!(whites[0], 11.0); // A0
        for pair in whites.windows(2) {
            assert!((pair[1] - pair[0] - 22.0).abs() < 1e-9);
        }
        assert_eq!(*whites.last().unwrap(), 1144.0 - 11.0); // C8
    }

    #[test]
    fn test_black_keys_between_neighbors() {
        let layout = KeyLayout::build(22.0);
        // A#0 sits between A0 and B0
        let a0 = layout.get(21).unwrap().x_center;
        let a_sharp0 = layout.get(22).unwrap();
        let b0 = layout.get(23).unwrap().x_center;
        assert!(!a_sharp0.is_white);
        assert_eq!(a_sharp0.x_center, (a0 + b0) / 2.0);

        // C#4 between C4 and D4
        let c4 = layout.get(60).unwrap().x_center;
        let d4 = layout.get(62).unwrap().x_center;
        assert_eq!(layout.get(61).unwrap().x_center, (c4 + d4) / 2.0);
    }

    #[test]
    fn test_no_black_key_between_e_f_and_b_c() {
        // E4 (64) → F4 (65) and B3 (59) → C4 (60) are adjacent white keys
        assert!(is_white_key(64) && is_white_key(65));
        assert!(is_white_key(59) && is_white_key(60));
        let layout = KeyLayout::build(10.0);
        let e4 = layout.get(64).unwrap().x_center;
        let f4 = layout.get(65).unwrap().x_center;
        assert_eq!(f4 - e4, 10.0);
    }

    #[test]
    fn test_out_of_range_pitch() {
        let layout = KeyLayout::build(22.0);
        assert!(layout.get(20).is_none());
        assert!(layout.get(109).is_none());
        assert!(layout.get(21).is_some());
        assert!(layout.get(108).is_some());
    }

    #[test]
    fn test_custom_range() {
        let layout = KeyLayout::build_for_range(20.0, KeyRange { lowest: 60, highest: 72 });
        assert_eq!(layout.len(), 13);
        assert_eq!(layout.get(60).unwrap().x_center, 10.0);
        assert_eq!(layout.get(61).unwrap().x_center, 20.0);
        assert_eq!(layout.get(72).unwrap().x_center, 7.0 * 20.0 + 10.0);
    }

    #[test]
    fn test_invalid_range_is_empty() {
        let layout = KeyLayout::build_for_range(20.0, KeyRange { lowest: 72, highest: 60 });
        assert!(layout.is_empty());
        assert!(layout.get(65).is_none());
    }

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(21), "A0");
        assert_eq!(note_name(108), "C8");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_names(&[60, 64, 67]), "C4, E4, G4");
        assert_eq!(note_names(&[]), "");
    }
}
