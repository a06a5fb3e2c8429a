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

//! Sample loading for the sound bank.
//!
//! Resource paths are the instrument's logical sample names (for example
//! `/Omnichord/c/c-chord.wav`). The file loader resolves them against a samples
//! root on disk and decodes the whole file into memory.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use super::error::LoadError;
use super::sample::DecodedSample;

/// Produces decoded samples from resource paths.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Fetches and fully decodes the resource at the given path.
    async fn load(&self, path: &str) -> Result<DecodedSample, LoadError>;
}

/// Loads samples from files beneath a root directory.
pub struct FileLoader {
    /// The directory resource paths are resolved against.
    root: PathBuf,
    /// Target sample rate for transcoding (matches audio output).
    target_sample_rate: u32,
}

impl FileLoader {
    /// Creates a new file loader.
    pub fn new(root: PathBuf, target_sample_rate: u32) -> FileLoader {
        FileLoader {
            root,
            target_sample_rate,
        }
    }

    /// Resolves a resource path to a file on disk. Leading slashes are treated as
    /// relative to the samples root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Loader for FileLoader {
    async fn load(&self, path: &str) -> Result<DecodedSample, LoadError> {
        let full_path = self.resolve(path);
        let target_sample_rate = self.target_sample_rate;
        tokio::task::spawn_blocking(move || decode_file(&full_path, target_sample_rate)).await?
    }
}

impl std::fmt::Debug for FileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLoader")
            .field("root", &self.root)
            .field("target_sample_rate", &self.target_sample_rate)
            .finish()
    }
}

/// Decodes an entire audio file into memory, resampling to the target rate.
fn decode_file(path: &Path, target_sample_rate: u32) -> Result<DecodedSample, LoadError> {
    let started = Instant::now();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io(e),
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| LoadError::NoAudioTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channel_count = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = ?path, error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channel_count = spec.channels.count() as u16;

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if channel_count == 0 || sample_rate == 0 {
        return Err(LoadError::NoAudioTrack(path.to_path_buf()));
    }

    let (samples, sample_rate) = if target_sample_rate != 0 && sample_rate != target_sample_rate {
        debug!(
            source_rate = sample_rate,
            target_rate = target_sample_rate,
            "Transcoding sample"
        );
        (
            resample(&samples, channel_count, sample_rate, target_sample_rate)?,
            target_sample_rate,
        )
    } else {
        (samples, sample_rate)
    };

    let sample = DecodedSample::new(samples, channel_count, sample_rate);
    info!(
        path = ?path,
        channels = channel_count,
        sample_rate,
        duration_ms = sample.duration().as_millis(),
        memory_kb = sample.memory_size() / 1024,
        elapsed_ms = started.elapsed().as_millis(),
        "Sample decoded"
    );
    Ok(sample)
}

/// Number of input frames the resampler consumes per block.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Resamples interleaved audio with a windowed sinc resampler. The resampler's
/// delay is trimmed off so the output lines up with the source and holds
/// `ceil(frames * ratio)` frames.
fn resample(
    samples: &[f32],
    channel_count: u16,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, LoadError> {
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    if source_frames == 0 {
        return Ok(Vec::new());
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let target_frames =
        (source_frames as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, INPUT_BLOCK_SIZE, channels)?;

    let mut planar: Vec<Vec<f32>> = vec![Vec::with_capacity(source_frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, value) in frame.iter().enumerate() {
            planar[channel].push(*value);
        }
    }

    let delay = resampler.output_delay();
    let wanted = delay + target_frames;
    let mut resampled: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); channels];
    let mut scratch = resampler.output_buffer_allocate(true);

    let mut position = 0;
    while source_frames - position >= resampler.input_frames_next() {
        let end = position + resampler.input_frames_next();
        let block: Vec<&[f32]> = planar.iter().map(|c| &c[position..end]).collect();
        let (consumed, produced) = resampler.process_into_buffer(&block, &mut scratch, None)?;
        append_frames(&mut resampled, &scratch, produced);
        position += consumed;
    }

    if position < source_frames {
        let tail: Vec<&[f32]> = planar.iter().map(|c| &c[position..]).collect();
        let (_, produced) =
            resampler.process_partial_into_buffer(Some(tail.as_slice()), &mut scratch, None)?;
        append_frames(&mut resampled, &scratch, produced);
    }

    // Drain the filter delay with silence.
    while resampled[0].len() < wanted {
        let (_, produced) =
            resampler.process_partial_into_buffer(None::<&[Vec<f32>]>, &mut scratch, None)?;
        if produced == 0 {
            break;
        }
        append_frames(&mut resampled, &scratch, produced);
    }

    let end = wanted.min(resampled[0].len());
    let mut interleaved = Vec::with_capacity(target_frames * channels);
    for frame in delay..end {
        for channel in resampled.iter() {
            interleaved.push(channel[frame]);
        }
    }
    Ok(interleaved)
}

fn append_frames(resampled: &mut [Vec<f32>], scratch: &[Vec<f32>], frames: usize) {
    for (channel, output) in resampled.iter_mut().zip(scratch) {
        channel.extend_from_slice(&output[..frames]);
    }
}
