// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! The instrument's chord layout: which key plays which chord, and where the
//! samples for each chord live.

use std::fmt;

use crate::serial::{ChordEvent, Quality};

/// The keys that play the twelve scale notes of the active chord, in order.
pub const SCALE_KEYS: [char; 12] = ['1', '2', '3', '4', '5', '6', '7', '8', '9', '0', '-', '='];

/// A single chord button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChordMapping {
    key: char,
    root: &'static str,
    quality: Quality,
    folder: &'static str,
    path: &'static str,
}

impl ChordMapping {
    const fn new(
        key: char,
        root: &'static str,
        quality: Quality,
        folder: &'static str,
        path: &'static str,
    ) -> ChordMapping {
        ChordMapping {
            key,
            root,
            quality,
            folder,
            path,
        }
    }

    /// The keyboard key bound to this chord.
    pub fn key(&self) -> char {
        self.key
    }

    pub fn root(&self) -> &'static str {
        self.root
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// The sustained chord sample.
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// The display name, e.g. "Eb MAJ".
    pub fn name(&self) -> String {
        format!("{} {}", self.root, self.quality.code())
    }

    /// Returns the sample for the given scale note of this chord, if the index is
    /// in range.
    pub fn scale_note_path(&self, index: usize) -> Option<String> {
        if index >= SCALE_KEYS.len() {
            return None;
        }
        Some(format!("/Omnichord/{0}/{0}{1}.wav", self.folder, index))
    }
}

impl fmt::Display for ChordMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.key)
    }
}

/// The chord buttons in board order, one row per quality. Eb and G major have no
/// dedicated chord sample, so their first scale note stands in.
pub const CHORDS: [ChordMapping; 27] = [
    ChordMapping::new('q', "Eb", Quality::Major, "eb", "/Omnichord/eb/eb0.wav"),
    ChordMapping::new('w', "Bb", Quality::Major, "bb", "/Omnichord/bb/bb-chord.wav"),
    ChordMapping::new('e', "F", Quality::Major, "f", "/Omnichord/f/f-chord.wav"),
    ChordMapping::new('r', "C", Quality::Major, "c", "/Omnichord/c/c-chord.wav"),
    ChordMapping::new('t', "G", Quality::Major, "g", "/Omnichord/g/g0.wav"),
    ChordMapping::new('y', "D", Quality::Major, "d", "/Omnichord/d/d-chord.wav"),
    ChordMapping::new('u', "A", Quality::Major, "a", "/Omnichord/a/a-chord.wav"),
    ChordMapping::new('i', "E", Quality::Major, "e", "/Omnichord/e/e-chord.wav"),
    ChordMapping::new('o', "B", Quality::Major, "b", "/Omnichord/b/b-chord.wav"),
    ChordMapping::new('a', "Eb", Quality::Minor, "ebm", "/Omnichord/ebm/ebm-chord.wav"),
    ChordMapping::new('s', "Bb", Quality::Minor, "bbm", "/Omnichord/bbm/bbm-chord.wav"),
    ChordMapping::new('d', "F", Quality::Minor, "fm", "/Omnichord/fm/fm-chord.wav"),
    ChordMapping::new('f', "C", Quality::Minor, "cm", "/Omnichord/cm/cm-chord.wav"),
    ChordMapping::new('g', "G", Quality::Minor, "gm", "/Omnichord/gm/gm-chord.wav"),
    ChordMapping::new('h', "D", Quality::Minor, "dm", "/Omnichord/dm/dm-chord.wav"),
    ChordMapping::new('j', "A", Quality::Minor, "am", "/Omnichord/am/am-chord.wav"),
    ChordMapping::new('k', "E", Quality::Minor, "em", "/Omnichord/em/em-chord.wav"),
    ChordMapping::new('l', "B", Quality::Minor, "bm", "/Omnichord/bm/bm-chord.wav"),
    ChordMapping::new('z', "Eb", Quality::Seventh, "eb7", "/Omnichord/eb7/eb7-chord.wav"),
    ChordMapping::new('x', "Bb", Quality::Seventh, "bb7", "/Omnichord/bb7/bb7-chord.wav"),
    ChordMapping::new('c', "F", Quality::Seventh, "f7", "/Omnichord/f7/f7-chord.wav"),
    ChordMapping::new('v', "C", Quality::Seventh, "c7", "/Omnichord/c7/c7-chord.wav"),
    ChordMapping::new('b', "G", Quality::Seventh, "g7", "/Omnichord/g7/g7-chord.wav"),
    ChordMapping::new('n', "D", Quality::Seventh, "d7", "/Omnichord/d7/d7-chord.wav"),
    ChordMapping::new('m', "A", Quality::Seventh, "a7", "/Omnichord/a7/a7-chord.wav"),
    ChordMapping::new(',', "E", Quality::Seventh, "e7", "/Omnichord/e7/e7-chord.wav"),
    ChordMapping::new('.', "B", Quality::Seventh, "b7", "/Omnichord/b7/b7-chord.wav"),
];

/// Looks up the chord bound to a keyboard key. Letters match case-insensitively.
pub fn find_by_key(key: char) -> Option<&'static ChordMapping> {
    let key = key.to_ascii_lowercase();
    CHORDS.iter().find(|chord| chord.key == key)
}

/// Looks up the chord the board reported.
pub fn find_by_event(event: &ChordEvent) -> Option<&'static ChordMapping> {
    CHORDS
        .iter()
        .find(|chord| chord.root == event.root && chord.quality == event.quality)
}

/// Returns one row of the layout in board order.
pub fn by_row(quality: Quality) -> impl Iterator<Item = &'static ChordMapping> {
    CHORDS.iter().filter(move |chord| chord.quality == quality)
}

/// Returns the sustained chord samples, for preloading.
pub fn chord_paths() -> impl Iterator<Item = &'static str> {
    CHORDS.iter().map(|chord| chord.path)
}

/// Maps a scale key to its note index.
pub fn scale_index(key: char) -> Option<usize> {
    SCALE_KEYS.iter().position(|scale_key| *scale_key == key)
}
