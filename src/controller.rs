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
use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Instrument as _, Level};

use crate::instrument::Instrument;
use crate::serial::ChordEvent;

pub mod keyboard;
pub mod multi;
pub mod serial;

/// The number of events that can be queued before drivers wait on the controller.
const EVENT_QUEUE_SIZE: usize = 16;

/// Controller events that will trigger behavior in the instrument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A chord key was pressed on the keyboard.
    Chord(char),

    /// The board reported a chord selection.
    SerialChord(ChordEvent),

    /// Plays a scale note of the active chord. Does nothing if no chord is active.
    ScaleNote(usize),

    /// Stops the sustained chord. If nothing is playing, does nothing.
    Stop,

    /// The board went away. Stops the sustained chord.
    Disconnected,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Drives an instrument from a source of events.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver. Chord samples start loading
    /// immediately; events are handled while they load.
    pub fn new(instrument: Instrument, driver: Arc<dyn Driver>) -> Controller {
        Controller {
            handle: tokio::spawn(
                Controller::trigger_events(instrument, driver)
                    .instrument(span!(Level::INFO, "controller")),
            ),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers instrument events by watching the driver and getting events from it.
    async fn trigger_events(instrument: Instrument, driver: Arc<dyn Driver>) {
        let preload = {
            let instrument = instrument.clone();
            tokio::spawn(async move { instrument.preload().await })
        };

        let (events_tx, mut events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let join_handle = driver.monitor_events(events_tx);

        info!("Controller started.");

        while let Some(event) = events_rx.recv().await {
            info!(event = ?event, "Received event.");
            instrument.handle(event);
        }

        info!("Controller closing.");
        match join_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(err = %e, "Event monitor failed."),
            Err(e) => error!(err = %e, "Error waiting for event monitor to stop."),
        }
        if let Err(e) = preload.await {
            error!(err = %e, "Error waiting for preload to finish.");
        }
        instrument.stop();
    }
}
