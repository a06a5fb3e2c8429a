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
// Core audio mixing logic shared by the cpal output and tests.
use super::sample::Voice;

/// Mixes active voices into an interleaved output buffer.
pub struct Mixer {
    /// Voices currently producing audio.
    voices: Vec<Voice>,
    /// Number of output channels.
    num_channels: u16,
}

impl Mixer {
    /// Creates a new mixer.
    pub fn new(num_channels: u16) -> Mixer {
        Mixer {
            voices: Vec::new(),
            num_channels,
        }
    }

    /// Adds a voice to the mix.
    pub fn add(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    /// Fills the output buffer with the mix of all active voices. Paused and
    /// finished voices are dropped afterwards.
    pub fn process_into(&mut self, output: &mut [f32]) {
        output.fill(0.0);

        for voice in self.voices.iter() {
            voice.read_into(output, self.num_channels);
        }
        self.voices.retain(|v| !v.is_paused() && !v.is_finished());

        for sample in output.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    /// Returns the number of voices still in the mix.
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sample::DecodedSample;

    #[test]
    fn test_basic_mixing() {
        let mut mixer = Mixer::new(2);
        let sample = DecodedSample::new(vec![0.5, 0.8], 1, 44100);
        mixer.add(sample.voice(1.0, false));

        let mut output = vec![0.0; 4];
        mixer.process_into(&mut output);
        assert_eq!(output, vec![0.5, 0.5, 0.8, 0.8]);
        assert_eq!(mixer.active_count(), 0);
    }

    #[test]
    fn test_multiple_voice_mixing() {
        let mut mixer = Mixer::new(2);
        let first = DecodedSample::new(vec![0.5, 0.25], 2, 44100);
        let second = DecodedSample::new(vec![0.25, 0.125], 2, 44100);
        mixer.add(first.voice(1.0, true));
        mixer.add(second.voice(1.0, true));

        let mut output = vec![0.0; 2];
        mixer.process_into(&mut output);
        assert_eq!(output, vec![0.75, 0.375]);
        assert_eq!(mixer.active_count(), 2);
    }

    #[test]
    fn test_paused_voice_is_dropped() {
        let mut mixer = Mixer::new(1);
        let sample = DecodedSample::new(vec![0.5; 16], 1, 44100);
        let voice = sample.voice(1.0, true);
        mixer.add(voice.clone());

        let mut output = vec![0.0; 4];
        mixer.process_into(&mut output);
        assert_eq!(mixer.active_count(), 1);

        voice.pause();
        mixer.process_into(&mut output);
        assert_eq!(output, vec![0.0; 4]);
        assert_eq!(mixer.active_count(), 0);
    }

    #[test]
    fn test_output_is_clamped() {
        let mut mixer = Mixer::new(1);
        let sample = DecodedSample::new(vec![0.9, -0.9], 1, 44100);
        mixer.add(sample.voice(1.0, false));
        mixer.add(sample.voice(1.0, false));

        let mut output = vec![0.0; 2];
        mixer.process_into(&mut output);
        assert_eq!(output, vec![1.0, -1.0]);
    }
}
