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
use std::{collections::HashMap, error::Error, path::PathBuf, sync::Arc};

use serde::Deserialize;
use tracing::error;

use crate::controller::{self, multi::SubDriver, Driver};

/// Allows users to specify various controllers.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Controller {
    #[default]
    Keyboard,
    Serial(SerialController),
    Multi(HashMap<String, Controller>),
}

/// The configuration for the chord board's serial link.
#[derive(Deserialize, Clone, Debug)]
pub struct SerialController {
    /// The serial device node, e.g. /dev/ttyACM0.
    device: PathBuf,
}

impl SerialController {
    /// Gets the device node.
    pub fn device(&self) -> &PathBuf {
        &self.device
    }
}

impl Controller {
    /// Creates the driver described by this configuration.
    pub fn driver(&self) -> Result<Arc<dyn Driver>, Box<dyn Error>> {
        match self {
            Controller::Keyboard => Ok(Arc::new(controller::keyboard::Driver::new())),
            Controller::Serial(config) => Ok(Arc::new(controller::serial::Driver::new(
                config.device().clone(),
            ))),
            Controller::Multi(controllers) => {
                let sub_drivers = controllers
                    .iter()
                    .filter_map(|(name, config)| match config {
                        Controller::Keyboard => Some(SubDriver::Keyboard(Arc::new(
                            controller::keyboard::Driver::new(),
                        ))),
                        Controller::Serial(config) => Some(SubDriver::Serial(Arc::new(
                            controller::serial::Driver::new(config.device().clone()),
                        ))),
                        Controller::Multi(_) => {
                            error!(name, "Recursive multi controllers are not supported");
                            None
                        }
                    })
                    .collect::<Vec<_>>();

                if sub_drivers.is_empty() {
                    return Err("Multi controller has no usable drivers.".into());
                }
                Ok(Arc::new(controller::multi::Driver::new(sub_drivers)))
            }
        }
    }
}
