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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::chords;

const STOP: &str = "stop";
const QUIT: &str = "quit";

/// A controller that plays the instrument from the terminal. Each line is read as a
/// sequence of keys: chord keys select chords, scale keys play notes of the active
/// chord, and an empty line (or "stop") stops playback.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads and dispatches one line of input. Returns false once the input is
    /// exhausted or the user asks to quit.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "Keys (chords, scale 1-=, empty or {} to stop, {}): ", STOP, QUIT)?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let input = input.trim();
        let send = |event: Event| {
            events_tx
                .blocking_send(event)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
        };

        match input.to_lowercase().as_str() {
            QUIT => return Ok(false),
            "" | STOP => send(Event::Stop)?,
            keys => {
                for key in keys.chars().filter(|key| !key.is_whitespace()) {
                    if let Some(index) = chords::scale_index(key) {
                        send(Event::ScaleNote(index))?;
                    } else if chords::find_by_key(key).is_some() {
                        send(Event::Chord(key))?;
                    } else {
                        warn!(key = %key, "Unrecognized key");
                    }
                }
            }
        }
        Ok(true)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard input closed.");
            Ok(())
        })
    }
}
