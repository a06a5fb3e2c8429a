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
    collections::HashMap,
    error::Error,
    fs::File,
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::audio::{DecodedSample, LoadError, Loader};

/// A loader backed by in-memory samples. Loads of gated paths wait until the
/// test releases them, which lets tests choose the order loads complete in.
pub struct MockLoader {
    samples: HashMap<String, DecodedSample>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    loads: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashMap<String, usize>>,
}

impl MockLoader {
    pub fn new() -> MockLoader {
        MockLoader {
            samples: HashMap::new(),
            gates: Mutex::new(HashMap::new()),
            loads: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a sample under the given path.
    pub fn with_sample(mut self, path: &str, sample: DecodedSample) -> MockLoader {
        self.samples.insert(path.to_string(), sample);
        self
    }

    /// Holds every load of the path until `release` is called.
    pub fn gate(&self, path: &str) {
        self.gates
            .lock()
            .insert(path.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Lets one held load of the path finish.
    pub fn release(&self, path: &str) {
        if let Some(gate) = self.gates.lock().get(path) {
            gate.add_permits(1);
        }
    }

    /// Makes the nth load of the path (counting from 1) fail as if the file held
    /// no audio.
    pub fn fail_load(&self, path: &str, load: usize) {
        self.failing.lock().insert(path.to_string(), load);
    }

    /// Returns how many times the path has been loaded.
    pub fn load_count(&self, path: &str) -> usize {
        self.loads.lock().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Loader for MockLoader {
    async fn load(&self, path: &str) -> Result<DecodedSample, LoadError> {
        let load = {
            let mut loads = self.loads.lock();
            let count = loads.entry(path.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let gate = self.gates.lock().get(path).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self
            .failing
            .lock()
            .get(path)
            .is_some_and(|failing| *failing == load)
        {
            return Err(LoadError::NoAudioTrack(PathBuf::from(path)));
        }

        self.samples
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(PathBuf::from(path)))
    }
}

/// Wait for the given predicate to return true or fail. Yields to the runtime
/// between checks so spawned tasks can make progress.
pub async fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = SystemTime::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        let elapsed = start.elapsed().expect("System time error");
        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate() {
            return;
        }
        tokio::time::sleep(tick).await;
    }
}

/// Writes planar f32 samples to a 32-bit float WAV file.
pub fn write_wav(
    path: PathBuf,
    samples: Vec<Vec<f32>>,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let num_channels = samples.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let frames = samples.iter().map(|c| c.len()).min().unwrap_or(0);
    for frame in 0..frames {
        for channel in samples.iter() {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;

    Ok(())
}
