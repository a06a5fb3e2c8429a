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
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{Audio, ConfigError, Controller};
use crate::soundbank::DEFAULT_GAIN;

/// The top level instrument configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Instrument {
    /// The directory the /Omnichord/... sample paths are resolved against.
    samples: PathBuf,

    /// Playback gain for chords and scale notes (default: 0.7).
    gain: Option<f32>,

    /// The audio output.
    #[serde(default)]
    audio: Audio,

    /// The input surface.
    #[serde(default)]
    controller: Controller,
}

impl Instrument {
    /// Returns the samples root. Relative roots are taken relative to the
    /// config file's directory.
    pub fn samples(&self, config_dir: &Path) -> PathBuf {
        if self.samples.is_absolute() {
            self.samples.clone()
        } else {
            config_dir.join(&self.samples)
        }
    }

    /// Returns the playback gain.
    pub fn gain(&self) -> Result<f32, ConfigError> {
        let gain = self.gain.unwrap_or(DEFAULT_GAIN);
        if !(0.0..=1.0).contains(&gain) {
            return Err(ConfigError::InvalidGain(gain));
        }
        Ok(gain)
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }
}
