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
use std::{error::Error, fmt, sync::Arc};

use crate::config;

pub mod cpal;
pub mod error;
pub mod loader;
pub mod mixer;
pub mod mock;
pub mod sample;

pub use error::{LoadError, PlaybackError};
pub use loader::{FileLoader, Loader};
pub use sample::{DecodedSample, Voice};

/// An audio output that voices can be started on.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Starts playing the given voice. Playback continues until the voice is paused
    /// or, for non-looping voices, until it runs out of frames.
    fn start(&self, voice: Voice) -> Result<(), PlaybackError>;

    /// The sample rate the device plays at. Samples are decoded to this rate.
    fn sample_rate(&self) -> u32;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device with the given name. Names beginning with "mock" produce a mock device.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
