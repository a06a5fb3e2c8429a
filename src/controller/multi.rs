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
use std::{io, sync::Arc};

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::error;

use super::Event;
use crate::controller;

pub enum SubDriver {
    Keyboard(Arc<controller::keyboard::Driver>),
    Serial(Arc<controller::serial::Driver>),
}

/// A controller that plays the instrument from multiple other drivers at once.
pub struct Driver {
    /// The drivers whose events are merged.
    sub_drivers: Vec<SubDriver>,
}

impl Driver {
    pub fn new(sub_drivers: Vec<SubDriver>) -> Driver {
        Driver { sub_drivers }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let join_handles = self
            .sub_drivers
            .iter()
            .map(|driver| match driver {
                SubDriver::Keyboard(arc) => arc.as_ref().monitor_events(events_tx.clone()),
                SubDriver::Serial(arc) => arc.as_ref().monitor_events(events_tx.clone()),
            })
            .collect::<Vec<_>>();

        tokio::spawn(async move {
            // Every sub-driver runs to completion; the first failure is reported.
            let mut result = Ok(());
            for handle in join_handles {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
                };
                if let Err(e) = outcome {
                    error!(err = %e, "Sub-driver failed.");
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
            result
        })
    }
}
