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
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use omnichord::audio::{self, FileLoader};
use omnichord::chords;
use omnichord::config::{self, Audio};
use omnichord::serial::{FrameDecoder, Quality, Utf8Stream};
use omnichord::soundbank::{SoundBank, DEFAULT_GAIN};

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=omnichord sample player

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/omnichord
ExecStart=/usr/local/bin/omnichord start "$OMNICHORD_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=omnichord.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A chord pad sample player driven by the keyboard or a serial chord board."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Prints the chord layout.
    Chords {},
    /// Decodes a captured serial log and prints the chord events in it.
    Decode {
        /// The path to the captured serial output.
        path: String,
    },
    /// Plays a single chord through the audio interface.
    Play {
        /// The device name to play through.
        device_name: String,
        /// The directory containing the Omnichord samples.
        samples: String,
        /// The keyboard key of the chord to play.
        key: char,
        /// How long to hold the chord, in seconds.
        #[arg[short, long, default_value_t = 3]]
        seconds: u64,
    },
    /// Start will start the instrument.
    Start {
        /// The path to the instrument config.
        config_path: String,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Chords {} => {
            for (title, quality) in [
                ("Major", Quality::Major),
                ("Minor", Quality::Minor),
                ("7th", Quality::Seventh),
            ] {
                println!("{}:", title);
                for chord in chords::by_row(quality) {
                    println!("- {} -> {}", chord, chord.path());
                }
            }
            println!(
                "Scale keys: {}",
                chords::SCALE_KEYS.iter().collect::<String>()
            );
        }
        Commands::Decode { path } => {
            let bytes = fs::read(&path)?;
            let mut utf8 = Utf8Stream::new();
            let mut decoder = FrameDecoder::new();

            let events = decoder.feed(&utf8.decode(&bytes));
            println!("Chord events (count: {}):", events.len());
            for event in events {
                match chords::find_by_event(&event) {
                    Some(chord) => println!("- {} -> {}", event, chord.path()),
                    None => println!("- {} (unmapped)", event),
                }
            }
            if !decoder.buffered().is_empty() {
                println!("Unterminated trailing data: {:?}", decoder.buffered());
            }
        }
        Commands::Play {
            device_name,
            samples,
            key,
            seconds,
        } => {
            let chord = chords::find_by_key(key)
                .ok_or_else(|| format!("no chord is bound to key '{}'", key))?;
            let device = audio::get_device(&Audio::new(&device_name))?;
            let loader = Arc::new(FileLoader::new(
                PathBuf::from(samples),
                device.sample_rate(),
            ));
            let bank = SoundBank::new(loader, device, DEFAULT_GAIN);

            println!("Playing {}", chord);
            bank.play(chord.path()).await?;
            if !bank.is_playing() {
                return Err(format!("unable to play {}", chord.path()).into());
            }
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            bank.stop();
        }
        Commands::Start { config_path } => {
            config::init_controller(Path::new(&config_path))?
                .join()
                .await?;
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
