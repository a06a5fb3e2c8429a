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
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, span, warn, Level, Span};

use crate::{
    chords::{self, ChordMapping},
    controller::Event,
    soundbank::SoundBank,
};

/// Plays the chord layout through a sound bank and remembers which chord is held,
/// so scale notes know which chord they belong to.
#[derive(Clone)]
pub struct Instrument {
    /// The sound bank that owns every sample and the sustained chord.
    bank: SoundBank,
    /// The chord most recently selected, if it hasn't been stopped.
    active: Arc<Mutex<Option<&'static ChordMapping>>>,
    /// The logging span.
    span: Span,
}

impl Instrument {
    /// Creates a new instrument.
    pub fn new(bank: SoundBank) -> Instrument {
        Instrument {
            bank,
            active: Arc::new(Mutex::new(None)),
            span: span!(Level::INFO, "instrument"),
        }
    }

    /// Loads every chord sample. Scale notes are loaded on demand.
    pub async fn preload(&self) {
        self.bank.preload(chords::chord_paths()).await;

        let ready = chords::chord_paths()
            .filter(|path| self.bank.is_ready(path))
            .count();
        let _enter = self.span.enter();
        info!(
            ready,
            total = chords::CHORDS.len(),
            memory = self.bank.memory_usage(),
            "Chord samples preloaded."
        );
    }

    /// Acts on a controller event. Returns the playback task when one was started.
    pub fn handle(&self, event: Event) -> Option<JoinHandle<()>> {
        let _enter = self.span.enter();

        match event {
            Event::Chord(key) => match chords::find_by_key(key) {
                Some(chord) => Some(self.play_chord(chord)),
                None => {
                    warn!(key = %key, "No chord is bound to key.");
                    None
                }
            },
            Event::SerialChord(chord_event) => match chords::find_by_event(&chord_event) {
                Some(chord) => Some(self.play_chord(chord)),
                None => {
                    warn!(chord = %chord_event, "Board reported an unmapped chord.");
                    None
                }
            },
            Event::ScaleNote(index) => self.play_scale_note(index),
            Event::Stop => {
                self.stop();
                None
            }
            Event::Disconnected => {
                info!("Board disconnected, stopping.");
                self.stop();
                None
            }
        }
    }

    /// Starts the chord, replacing whatever chord was held.
    pub fn play_chord(&self, chord: &'static ChordMapping) -> JoinHandle<()> {
        info!(chord = %chord.name(), path = chord.path(), "Playing chord.");
        *self.active.lock() = Some(chord);
        self.bank.play(chord.path())
    }

    /// Plays one scale note of the active chord over the top of it.
    pub fn play_scale_note(&self, index: usize) -> Option<JoinHandle<()>> {
        let chord = match *self.active.lock() {
            Some(chord) => chord,
            None => {
                debug!(index, "No chord selected, ignoring scale note.");
                return None;
            }
        };

        let path = match chord.scale_note_path(index) {
            Some(path) => path,
            None => {
                warn!(index, "Scale note out of range.");
                return None;
            }
        };

        debug!(chord = %chord.name(), path = %path, "Playing scale note.");
        Some(self.bank.play_one_shot(&path))
    }

    /// Stops the sustained chord and forgets the selection.
    pub fn stop(&self) {
        *self.active.lock() = None;
        self.bank.stop();
    }

    /// Returns the selected chord, if any.
    pub fn active_chord(&self) -> Option<&'static ChordMapping> {
        *self.active.lock()
    }

    pub fn sound_bank(&self) -> &SoundBank {
        &self.bank
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, sync::Arc};

    use super::Instrument;
    use crate::{
        audio::{mock, DecodedSample},
        chords,
        controller::Event,
        serial::{ChordEvent, Quality},
        soundbank::{SoundBank, DEFAULT_GAIN},
        testutil::MockLoader,
    };

    fn sample() -> DecodedSample {
        DecodedSample::new(vec![0.5; 64], 1, 44100)
    }

    fn instrument() -> (Instrument, Arc<MockLoader>, Arc<mock::Device>) {
        let mut loader = MockLoader::new();
        for path in chords::chord_paths() {
            loader = loader.with_sample(path, sample());
        }
        let loader = loader
            .with_sample("/Omnichord/c/c3.wav", sample())
            .with_sample("/Omnichord/cm/cm0.wav", sample());
        let loader = Arc::new(loader);
        let device = Arc::new(mock::Device::get("mock-device"));
        let bank = SoundBank::new(loader.clone(), device.clone(), DEFAULT_GAIN);
        (Instrument::new(bank), loader, device)
    }

    #[tokio::test]
    async fn test_preload_covers_layout() {
        let (instrument, loader, _) = instrument();
        instrument.preload().await;

        for path in chords::chord_paths() {
            assert!(instrument.sound_bank().is_ready(path), "{} not ready", path);
            assert_eq!(loader.load_count(path), 1);
        }
    }

    #[tokio::test]
    async fn test_keyboard_chord() -> Result<(), Box<dyn Error>> {
        let (instrument, _, device) = instrument();
        instrument.preload().await;

        if let Some(handle) = instrument.handle(Event::Chord('r')) {
            handle.await?;
        }
        assert_eq!(
            instrument.sound_bank().current().as_deref(),
            Some("/Omnichord/c/c-chord.wav")
        );
        assert_eq!(instrument.active_chord().map(|c| c.name()), Some("C MAJ".to_string()));
        assert_eq!(device.audible().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_serial_chord_replaces_keyboard_chord() -> Result<(), Box<dyn Error>> {
        let (instrument, _, device) = instrument();
        instrument.preload().await;

        if let Some(handle) = instrument.handle(Event::Chord('q')) {
            handle.await?;
        }
        if let Some(handle) =
            instrument.handle(Event::SerialChord(ChordEvent::new("C", Quality::Minor)))
        {
            handle.await?;
        }

        assert_eq!(
            instrument.sound_bank().current().as_deref(),
            Some("/Omnichord/cm/cm-chord.wav")
        );
        assert_eq!(device.started().len(), 2);
        assert_eq!(device.audible().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unmapped_events() {
        let (instrument, _, device) = instrument();

        assert!(instrument.handle(Event::Chord('p')).is_none());
        assert!(instrument
            .handle(Event::SerialChord(ChordEvent::new("F#", Quality::Major)))
            .is_none());
        assert!(instrument.active_chord().is_none());
        assert!(device.started().is_empty());
    }

    #[tokio::test]
    async fn test_scale_notes_follow_active_chord() -> Result<(), Box<dyn Error>> {
        let (instrument, loader, device) = instrument();
        instrument.preload().await;

        // Nothing selected yet.
        assert!(instrument.handle(Event::ScaleNote(3)).is_none());

        if let Some(handle) = instrument.handle(Event::Chord('r')) {
            handle.await?;
        }
        if let Some(handle) = instrument.handle(Event::ScaleNote(3)) {
            handle.await?;
        }
        assert_eq!(loader.load_count("/Omnichord/c/c3.wav"), 1);

        // The note overlays the chord rather than replacing it.
        assert_eq!(
            instrument.sound_bank().current().as_deref(),
            Some("/Omnichord/c/c-chord.wav")
        );
        assert_eq!(device.started().len(), 2);
        assert!(instrument.handle(Event::ScaleNote(12)).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_and_disconnect() -> Result<(), Box<dyn Error>> {
        let (instrument, _, device) = instrument();
        instrument.preload().await;

        if let Some(handle) = instrument.handle(Event::Chord('f')) {
            handle.await?;
        }
        assert!(instrument.handle(Event::Stop).is_none());
        assert!(instrument.sound_bank().current().is_none());
        assert!(instrument.active_chord().is_none());
        assert!(!device.is_playing());

        // Scale notes need a fresh chord after a stop.
        assert!(instrument.handle(Event::ScaleNote(0)).is_none());

        if let Some(handle) =
            instrument.handle(Event::SerialChord(ChordEvent::new("C", Quality::Minor)))
        {
            handle.await?;
        }
        assert!(device.is_playing());
        instrument.handle(Event::Disconnected);
        assert!(instrument.sound_bank().current().is_none());
        assert!(!device.is_playing());
        Ok(())
    }
}
