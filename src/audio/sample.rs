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

//! In-memory decoded samples and the voices that play them.
//!
//! A [`DecodedSample`] is the immutable template kept in the sound bank's cache.
//! Every playback asks the template for a fresh [`Voice`], so two triggers of the
//! same chord never share a play position.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// A fully decoded sample. The sample data is stored in an Arc so voices can share it.
#[derive(Clone)]
pub struct DecodedSample {
    /// Interleaved f32 samples.
    data: Arc<[f32]>,
    /// Number of channels in the sample.
    channel_count: u16,
    /// Sample rate of the audio data.
    sample_rate: u32,
}

impl DecodedSample {
    /// Creates a new decoded sample from interleaved samples.
    pub fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> DecodedSample {
        DecodedSample {
            data: data.into(),
            channel_count,
            sample_rate,
        }
    }

    /// Creates a new, independent voice for this sample.
    pub fn voice(&self, gain: f32, looping: bool) -> Voice {
        Voice {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst),
            data: self.data.clone(),
            channel_count: self.channel_count,
            gain,
            looping,
            state: Arc::new(Mutex::new(VoiceState::default())),
        }
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        frame_count(&self.data, self.channel_count)
    }

    /// Returns the duration of the sample.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl std::fmt::Debug for DecodedSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedSample")
            .field("channels", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}

fn frame_count(data: &[f32], channel_count: u16) -> usize {
    if channel_count == 0 {
        0
    } else {
        data.len() / channel_count as usize
    }
}

#[derive(Default)]
struct VoiceState {
    /// Current position in frames.
    position: usize,
    paused: bool,
    finished: bool,
}

/// A playable instance of a decoded sample. Clones refer to the same voice, which
/// is how the sound bank keeps control of a voice that the mixer is pulling from.
#[derive(Clone)]
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    data: Arc<[f32]>,
    channel_count: u16,
    gain: f32,
    looping: bool,
    state: Arc<Mutex<VoiceState>>,
}

impl Voice {
    /// Returns the unique ID of this voice.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Pauses the voice. A paused voice produces no audio and is dropped by the mixer.
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    /// Moves the play position back to the first frame.
    pub fn rewind(&self) {
        let mut state = self.state.lock();
        state.position = 0;
        state.finished = false;
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Returns true once a non-looping voice has played its last frame.
    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    /// Returns the current play position in frames.
    pub fn position(&self) -> usize {
        self.state.lock().position
    }

    /// Mixes this voice into an interleaved output buffer, adding to what is already
    /// there. Returns the number of frames written.
    ///
    /// Mono voices are spread across every output channel. Extra source channels
    /// fold onto the output modulo its width.
    pub fn read_into(&self, output: &mut [f32], output_channels: u16) -> usize {
        let mut state = self.state.lock();
        if state.paused || state.finished {
            return 0;
        }

        let out_channels = output_channels as usize;
        let src_channels = self.channel_count as usize;
        let total_frames = frame_count(&self.data, self.channel_count);
        if out_channels == 0 || total_frames == 0 {
            state.finished = true;
            return 0;
        }

        let mut written = 0;
        for frame in output.chunks_exact_mut(out_channels) {
            if state.position >= total_frames {
                if self.looping {
                    state.position = 0;
                } else {
                    state.finished = true;
                    break;
                }
            }

            let start = state.position * src_channels;
            let source = &self.data[start..start + src_channels];
            if src_channels == 1 {
                let sample = source[0] * self.gain;
                frame.iter_mut().for_each(|out| *out += sample);
            } else {
                for (channel, sample) in source.iter().enumerate() {
                    frame[channel % out_channels] += sample * self.gain;
                }
            }

            state.position += 1;
            written += 1;
        }

        if !self.looping && state.position >= total_frames {
            state.finished = true;
        }

        written
    }
}

impl std::fmt::Debug for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("id", &self.id)
            .field("gain", &self.gain)
            .field("looping", &self.looping)
            .finish()
    }
}
