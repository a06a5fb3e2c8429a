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
use std::path::PathBuf;

/// Failures while fetching or decoding a sample.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Sample not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("No audio track found in {}", .0.display())]
    NoAudioTrack(PathBuf),

    #[error("Audio decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resampler setup failed: {0}")]
    ResamplerSetup(#[from] rubato::ResamplerConstructionError),

    #[error("Resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),

    #[error("Load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failures reported by an output device when asked to start a voice.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Playback refused: {0}")]
    Refused(String),

    #[error("Output stream error: {0}")]
    Stream(String),

    #[error("Output stream closed")]
    StreamClosed,
}
