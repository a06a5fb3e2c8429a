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

//! The sound bank owns the sample cache and the single sustained chord.
//!
//! At most one sustained (looping) session exists at a time. Starting a new one
//! stops the previous one first. Playback starts asynchronously; every `play`
//! takes a generation token and its completion only touches shared state while
//! that token still names the current session.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audio::{DecodedSample, Device, LoadError, Loader, Voice};

/// Default gain for every voice the sound bank starts.
pub const DEFAULT_GAIN: f32 = 0.7;

/// The load status of a registered resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Ready,
    Failed,
}

/// The currently sustained chord.
struct SustainedSession {
    generation: u64,
    path: String,
    /// None while an uncached sample is still loading.
    voice: Option<Voice>,
}

#[derive(Default)]
struct Sessions {
    /// Monotonic counter, bumped by every play.
    generation: u64,
    current: Option<SustainedSession>,
}

impl Sessions {
    fn is_current(&self, generation: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|session| session.generation == generation)
    }

    /// Pauses and rewinds the sustained voice, if any, and clears the slot.
    fn stop(&mut self) {
        if let Some(session) = self.current.take() {
            if let Some(voice) = session.voice {
                voice.pause();
                voice.rewind();
            }
            info!(path = session.path, "Stopped sustained chord.");
        }
    }
}

struct Inner {
    loader: Arc<dyn Loader>,
    device: Arc<dyn Device>,
    gain: f32,
    /// Ready samples by resource path. Failed loads are never inserted.
    cache: RwLock<HashMap<String, DecodedSample>>,
    statuses: RwLock<HashMap<String, LoadStatus>>,
    sessions: Mutex<Sessions>,
}

/// Caches decoded samples and plays them through an output device.
#[derive(Clone)]
pub struct SoundBank {
    inner: Arc<Inner>,
}

impl SoundBank {
    /// Creates a new, empty sound bank.
    pub fn new(loader: Arc<dyn Loader>, device: Arc<dyn Device>, gain: f32) -> SoundBank {
        SoundBank {
            inner: Arc::new(Inner {
                loader,
                device,
                gain,
                cache: RwLock::new(HashMap::new()),
                statuses: RwLock::new(HashMap::new()),
                sessions: Mutex::new(Sessions::default()),
            }),
        }
    }

    /// Loads every path into the cache. Each load succeeds or fails on its own; the
    /// returned future completes once all of them have resolved. When a path is
    /// listed more than once, the last registration wins.
    pub async fn preload<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pending: Vec<(String, JoinHandle<Result<DecodedSample, LoadError>>)> =
            Vec::new();
        for path in paths {
            let path = path.into();
            self.inner
                .statuses
                .write()
                .insert(path.clone(), LoadStatus::Pending);

            let loader = self.inner.loader.clone();
            let task_path = path.clone();
            pending.push((
                path,
                tokio::spawn(async move { loader.load(&task_path).await }),
            ));
        }

        info!(count = pending.len(), "Preloading samples.");

        let mut ready = 0;
        let mut failed = 0;
        for (path, handle) in pending {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(LoadError::Join(e)),
            };

            match result {
                Ok(sample) => {
                    debug!(path, sample = ?sample, "Sample preloaded.");
                    self.inner.cache.write().insert(path.clone(), sample);
                    self.inner.statuses.write().insert(path, LoadStatus::Ready);
                    ready += 1;
                }
                Err(e) => {
                    warn!(path, err = %e, "Failed to preload sample.");
                    self.inner.cache.write().remove(&path);
                    self.inner.statuses.write().insert(path, LoadStatus::Failed);
                    failed += 1;
                }
            }
        }

        info!(
            ready,
            failed,
            memory_kb = self.memory_usage() / 1024,
            "Preload finished."
        );
    }

    /// Stops the current chord and starts the given one, looping at the bank's gain.
    ///
    /// The stop and the registration of the new session happen before this returns.
    /// The audio itself starts on a spawned task; the returned handle can be awaited
    /// or ignored. Failures are logged and leave nothing playing.
    pub fn play(&self, path: &str) -> JoinHandle<()> {
        let (generation, voice) = {
            let mut sessions = self.inner.sessions.lock();
            sessions.stop();
            sessions.generation += 1;

            let voice = self
                .inner
                .cache
                .read()
                .get(path)
                .map(|sample| sample.voice(self.inner.gain, true));
            sessions.current = Some(SustainedSession {
                generation: sessions.generation,
                path: path.to_string(),
                voice: voice.clone(),
            });
            (sessions.generation, voice)
        };

        let bank = self.clone();
        let path = path.to_string();
        tokio::spawn(async move {
            let voice = match voice {
                Some(voice) => {
                    debug!(path, generation, "Using cached sample.");
                    voice
                }
                None => {
                    info!(path, generation, "Sample not cached, loading on the fly.");
                    match bank.inner.loader.load(&path).await {
                        Ok(sample) => sample.voice(bank.inner.gain, true),
                        Err(e) => {
                            bank.abandon(generation, &path, &e);
                            return;
                        }
                    }
                }
            };
            bank.start_sustained(generation, &path, voice);
        })
    }

    /// Starts a sustained voice if its session is still current. The device is
    /// started without the session lock held; a voice whose session was replaced
    /// in the meantime is paused.
    fn start_sustained(&self, generation: u64, path: &str, voice: Voice) {
        if !self.inner.sessions.lock().is_current(generation) {
            debug!(path, generation, "Discarding stale playback start.");
            return;
        }

        let started = self.inner.device.start(voice.clone());

        let mut sessions = self.inner.sessions.lock();
        if !sessions.is_current(generation) {
            voice.pause();
            debug!(path, generation, "Session replaced while starting, silencing voice.");
            return;
        }
        match started {
            Ok(()) => {
                if let Some(session) = sessions.current.as_mut() {
                    session.voice = Some(voice);
                }
                info!(path, generation, "Playing sustained chord.");
            }
            Err(e) => {
                error!(path, err = %e, "Failed to start playback.");
                sessions.current = None;
            }
        }
    }

    /// Clears the session after a failed on-the-fly load, if it is still current.
    fn abandon(&self, generation: u64, path: &str, e: &LoadError) {
        error!(path, err = %e, "Failed to load sample for playback.");
        let mut sessions = self.inner.sessions.lock();
        if sessions.is_current(generation) {
            sessions.current = None;
        }
    }

    /// Stops the sustained chord. Does nothing if nothing is playing.
    pub fn stop(&self) {
        self.inner.sessions.lock().stop();
    }

    /// Plays a sample once, without looping and without tracking it. One-shots
    /// overlap freely with each other and with the sustained chord.
    pub fn play_one_shot(&self, path: &str) -> JoinHandle<()> {
        let cached = self.inner.cache.read().get(path).cloned();
        let bank = self.clone();
        let path = path.to_string();
        tokio::spawn(async move {
            let sample = match cached {
                Some(sample) => sample,
                None => match bank.inner.loader.load(&path).await {
                    Ok(sample) => sample,
                    Err(e) => {
                        error!(path, err = %e, "Failed to load one-shot sample.");
                        return;
                    }
                },
            };

            if let Err(e) = bank.inner.device.start(sample.voice(bank.inner.gain, false)) {
                error!(path, err = %e, "Failed to play one-shot sample.");
            } else {
                debug!(path, "Playing one-shot sample.");
            }
        })
    }

    /// Returns true if the path is cached and ready to play.
    pub fn is_ready(&self, path: &str) -> bool {
        self.inner.cache.read().contains_key(path)
    }

    /// Returns the load status of a path registered through preload.
    pub fn status(&self, path: &str) -> Option<LoadStatus> {
        self.inner.statuses.read().get(path).copied()
    }

    /// Returns the path of the sustained chord, if there is one.
    pub fn current(&self) -> Option<String> {
        self.inner
            .sessions
            .lock()
            .current
            .as_ref()
            .map(|session| session.path.clone())
    }

    /// Returns true if a sustained session exists.
    pub fn is_playing(&self) -> bool {
        self.inner.sessions.lock().current.is_some()
    }

    /// Returns the total memory used by cached samples.
    pub fn memory_usage(&self) -> usize {
        self.inner
            .cache
            .read()
            .values()
            .map(|sample| sample.memory_size())
            .sum()
    }
}

impl fmt::Debug for SoundBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundBank")
            .field("device", &self.inner.device.to_string())
            .field("cached", &self.inner.cache.read().len())
            .field("gain", &self.inner.gain)
            .field("current", &self.current())
            .finish()
    }
}
