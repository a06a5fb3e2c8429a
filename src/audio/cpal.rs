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
use std::{error::Error, fmt, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use super::error::PlaybackError;
use super::mixer::Mixer;
use super::sample::Voice;
use crate::config;

/// A small wrapper around a cpal::Device. The output stream is opened when the
/// device is fetched and reopened on the next voice if it dies.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The number of output channels the stream is opened with.
    channels: u16,
    /// The output sample rate.
    sample_rate: u32,
    /// The sample format of the output stream.
    sample_format: cpal::SampleFormat,
    /// The open output stream, if any.
    output: Mutex<Option<Output>>,
}

/// An open output stream. The stream itself lives on its own thread, since cpal
/// streams can't be moved between threads on every platform.
struct Output {
    /// Hands new voices to the audio callback.
    voice_tx: crossbeam_channel::Sender<Voice>,
    /// Dropping this closes the stream.
    shutdown_tx: Option<crossbeam_channel::Sender<()>>,
    /// Handle to the output thread.
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for Output {
    fn drop(&mut self) {
        self.shutdown_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, SampleRate={}) ({})",
            self.name,
            self.channels,
            self.sample_rate,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists cpal output devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn super::Device>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn super::Device> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal output devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                if let Ok(device) = Device::from_cpal(host_id, device, None) {
                    devices.push(device);
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    fn from_cpal(
        host_id: cpal::HostId,
        device: cpal::Device,
        sample_rate: Option<u32>,
    ) -> Result<Device, Box<dyn Error>> {
        let default_config = device.default_output_config()?;
        Ok(Device {
            name: device.name()?,
            host_id,
            channels: default_config.channels(),
            sample_rate: sample_rate.unwrap_or(default_config.sample_rate().0),
            sample_format: default_config.sample_format(),
            device,
            output: Mutex::new(None),
        })
    }

    /// Gets the given cpal device and opens its output stream. The name "default"
    /// selects the default host's default output device.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let device = Device::find(config)?;
        *device.output.lock() = Some(device.open()?);
        Ok(device)
    }

    fn find(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device available")?;
            return Device::from_cpal(host.id(), device, config.sample_rate());
        }

        match Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(device) => {
                Device::from_cpal(device.host_id, device.device, config.sample_rate())
            }
            None => Err(format!("no device found with name {}", name).into()),
        }
    }

    /// Opens the output stream on a dedicated thread and waits until it is playing.
    fn open(&self) -> Result<Output, PlaybackError> {
        let (voice_tx, voice_rx) = crossbeam_channel::unbounded::<Voice>();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        let device = self.device.clone();
        let name = self.name.clone();
        let sample_format = self.sample_format;
        let stream_config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let thread = thread::spawn(move || {
            let span = span!(Level::INFO, "audio output", device = name);
            let _enter = span.enter();

            let mixer = Mixer::new(stream_config.channels);
            let stream = match sample_format {
                cpal::SampleFormat::F32 => {
                    build_stream::<f32>(&device, &stream_config, mixer, voice_rx)
                }
                cpal::SampleFormat::I16 => {
                    build_stream::<i16>(&device, &stream_config, mixer, voice_rx)
                }
                cpal::SampleFormat::I32 => {
                    build_stream::<i32>(&device, &stream_config, mixer, voice_rx)
                }
                cpal::SampleFormat::U16 => {
                    build_stream::<u16>(&device, &stream_config, mixer, voice_rx)
                }
                other => {
                    let _ = ready_tx.send(Err(format!("unsupported sample format {:?}", other)));
                    return;
                }
            };

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }

            info!("Output stream started.");
            let _ = ready_tx.send(Ok(()));

            // Block until the owning Output is dropped.
            let _ = shutdown_rx.recv();
            drop(stream);
            info!("Output stream closed.");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Output {
                voice_tx,
                shutdown_tx: Some(shutdown_tx),
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(PlaybackError::Stream(e))
            }
            Err(_) => {
                let _ = thread.join();
                Err(PlaybackError::StreamClosed)
            }
        }
    }
}

/// Builds an output stream that mixes voices into the device's native sample type.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
    voice_rx: crossbeam_channel::Receiver<Voice>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            while let Ok(voice) = voice_rx.try_recv() {
                mixer.add(voice);
            }

            scratch.resize(data.len(), 0.0);
            mixer.process_into(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

impl super::Device for Device {
    fn start(&self, voice: Voice) -> Result<(), PlaybackError> {
        let mut output = self.output.lock();
        if output.is_none() {
            *output = Some(self.open()?);
        }

        let sent = match output.as_ref() {
            Some(open) => open.voice_tx.send(voice).is_ok(),
            None => false,
        };
        if !sent {
            // The stream thread is gone; reopen on the next start.
            *output = None;
            return Err(PlaybackError::StreamClosed);
        }
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
