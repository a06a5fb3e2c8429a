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
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use super::FrameDecoder;
use crate::controller::Event;

/// The size of a single read from the serial stream.
const READ_BUFFER_SIZE: usize = 256;

/// Incrementally decodes UTF-8 from byte chunks. A multi-byte character split
/// across chunks is held until the rest of it arrives.
#[derive(Debug, Default)]
pub struct Utf8Stream {
    pending: Vec<u8>,
}

impl Utf8Stream {
    pub fn new() -> Utf8Stream {
        Utf8Stream::default()
    }

    /// Decodes as much of the accumulated input as possible. Invalid sequences are
    /// replaced with U+FFFD.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut text = String::with_capacity(self.pending.len());
        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid_up_to = start + e.valid_up_to();
                    // The prefix was just validated, so this cannot fail.
                    if let Ok(valid) = std::str::from_utf8(&self.pending[start..valid_up_to]) {
                        text.push_str(valid);
                    }
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_up_to + len;
                        }
                        // An incomplete sequence at the end: wait for more bytes.
                        None => {
                            start = valid_up_to;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        text
    }

    /// Drops any incomplete trailing sequence.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Pulls bytes from the board and forwards the chord frames it sends.
#[derive(Debug, Default)]
pub struct Bridge {
    utf8: Utf8Stream,
    decoder: FrameDecoder,
}

impl Bridge {
    pub fn new() -> Bridge {
        Bridge::default()
    }

    /// Reads from the given stream until it closes or fails, sending a chord event
    /// for every complete chord frame. When the stream ends, partial input is dropped
    /// and a disconnect is reported. The read error, if any, is returned.
    pub async fn run<R>(&mut self, mut reader: R, events: &Sender<Event>) -> Result<(), io::Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let result = loop {
            let read = match reader.read(&mut buf).await {
                Ok(0) => {
                    info!("Serial stream closed.");
                    break Ok(());
                }
                Ok(read) => read,
                Err(e) => {
                    warn!(err = %e, "Error reading from serial stream.");
                    break Err(e);
                }
            };

            let text = self.utf8.decode(&buf[..read]);
            for chord in self.decoder.feed(&text) {
                debug!(root = %chord.root, quality = %chord.quality, "Chord frame.");
                if events.send(Event::SerialChord(chord)).await.is_err() {
                    // Nobody is listening any more, so there's no one to tell.
                    self.reset();
                    return Ok(());
                }
            }
        };

        self.reset();
        if events.send(Event::Disconnected).await.is_err() {
            debug!("Event receiver closed before disconnect could be reported.");
        }
        result
    }

    /// Drops all partial input so a torn frame can't leak into the next session.
    pub fn reset(&mut self) {
        self.utf8.reset();
        self.decoder.reset();
    }
}
