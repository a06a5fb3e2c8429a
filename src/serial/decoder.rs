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

//! Line framing for the chord board's serial protocol.
//!
//! The board sends ASCII lines terminated by CR-LF. The only frame we act on is
//! `CHORD <root> <quality>`; every other line (theremin telemetry, readiness
//! announcements, noise) is dropped.

use std::fmt;

use tracing::debug;

/// The line terminator used by the board.
const TERMINATOR: &str = "\r\n";

/// The prefix of a chord frame.
const CHORD_PREFIX: &str = "CHORD ";

/// The chord type reported by the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quality {
    Major,
    Minor,
    Seventh,
}

impl Quality {
    /// Maps a wire code to a quality. Codes are matched exactly.
    pub fn from_code(code: &str) -> Option<Quality> {
        match code {
            "MAJ" => Some(Quality::Major),
            "MIN" => Some(Quality::Minor),
            "7TH" => Some(Quality::Seventh),
            _ => None,
        }
    }

    /// Returns the wire code for this quality.
    pub fn code(&self) -> &'static str {
        match self {
            Quality::Major => "MAJ",
            Quality::Minor => "MIN",
            Quality::Seventh => "7TH",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A chord selected on the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChordEvent {
    pub root: String,
    pub quality: Quality,
}

impl ChordEvent {
    pub fn new(root: &str, quality: Quality) -> ChordEvent {
        ChordEvent {
            root: root.to_string(),
            quality,
        }
    }

    /// Parses a single line without its terminator. Returns None for anything that
    /// is not a well-formed chord frame.
    pub fn parse(line: &str) -> Option<ChordEvent> {
        let line = line.trim();
        let rest = line.strip_prefix(CHORD_PREFIX)?;

        // The quality is always the last token; everything before it is the root,
        // which may itself contain spaces.
        let tokens: Vec<&str> = rest.split(' ').collect();
        if tokens.len() < 2 {
            return None;
        }
        let (root, code) = tokens.split_at(tokens.len() - 1);
        let quality = Quality::from_code(code[0])?;

        Some(ChordEvent {
            root: root.join(" "),
            quality,
        })
    }
}

impl fmt::Display for ChordEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root, self.quality)
    }
}

/// Reassembles CR-LF frames from arbitrary text chunks and parses chord frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// The unterminated tail of the stream since the last frame boundary.
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> FrameDecoder {
        FrameDecoder::default()
    }

    /// Appends a chunk and returns the chord events for every line it completed,
    /// in the order they arrived. An incomplete trailing line stays buffered.
    pub fn feed(&mut self, chunk: &str) -> Vec<ChordEvent> {
        self.buffer.push_str(chunk);

        let consumed = match self.buffer.rfind(TERMINATOR) {
            Some(index) => index + TERMINATOR.len(),
            None => return Vec::new(),
        };

        let mut events = Vec::new();
        for line in self.buffer[..consumed].split_terminator(TERMINATOR) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match ChordEvent::parse(line) {
                Some(event) => events.push(event),
                None => debug!(line, "Discarding frame."),
            }
        }

        self.buffer.drain(..consumed);
        events
    }

    /// Drops any buffered partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the buffered, unterminated tail.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}
