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
use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::info;

use super::error::PlaybackError;
use super::sample::Voice;

/// A mock device. Doesn't actually play anything, but remembers what it was asked to play.
#[derive(Clone)]
pub struct Device {
    name: String,
    sample_rate: u32,
    started: Arc<Mutex<Vec<Voice>>>,
    refuse: Arc<AtomicBool>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            sample_rate: 44100,
            started: Arc::new(Mutex::new(Vec::new())),
            refuse: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the device refuse (or accept again) every subsequent start.
    pub fn refuse_starts(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }

    /// Returns every voice the device has been asked to start, in order.
    pub fn started(&self) -> Vec<Voice> {
        self.started.lock().clone()
    }

    /// Returns the voices that would still be audible.
    pub fn audible(&self) -> Vec<Voice> {
        self.started
            .lock()
            .iter()
            .filter(|v| !v.is_paused() && !v.is_finished())
            .cloned()
            .collect()
    }

    /// Returns true if any started voice would still be audible.
    pub fn is_playing(&self) -> bool {
        !self.audible().is_empty()
    }
}

impl super::Device for Device {
    fn start(&self, voice: Voice) -> Result<(), PlaybackError> {
        if self.refuse.load(Ordering::Relaxed) {
            return Err(PlaybackError::Refused(format!(
                "{} is not accepting playback",
                self.name
            )));
        }

        info!(
            device = self.name,
            voice = voice.id(),
            looping = voice.is_looping(),
            "Starting voice."
        );
        self.started.lock().push(voice);
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
