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
use std::path::Path;
use std::sync::Arc;

use ::config::{Config, File, FileFormat};
use tracing::info;

use crate::audio::FileLoader;
use crate::soundbank::SoundBank;

mod audio;
mod controller;
mod error;
mod instrument;

pub use self::audio::Audio;
pub use self::controller::{Controller, SerialController};
pub use self::error::ConfigError;
pub use self::instrument::Instrument;

/// Loads the instrument configuration from a YAML file.
pub fn load(path: &Path) -> Result<Instrument, ConfigError> {
    Ok(Config::builder()
        .add_source(File::from(path).format(FileFormat::Yaml))
        .build()?
        .try_deserialize()?)
}

/// Parses the instrument configuration from a YAML string.
pub fn parse(yaml: &str) -> Result<Instrument, ConfigError> {
    Ok(Config::builder()
        .add_source(File::from_str(yaml, FileFormat::Yaml))
        .build()?
        .try_deserialize()?)
}

/// Initializes the instrument and controller from the given config file and returns the
/// controller. The controller owns the instrument and runs until its driver hangs up.
pub fn init_controller(path: &Path) -> Result<crate::controller::Controller, Box<dyn Error>> {
    let config = load(path)?;
    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let device = crate::audio::get_device(config.audio())?;
    let samples = config.samples(config_dir);
    info!(
        device = %device,
        samples = %samples.display(),
        sample_rate = device.sample_rate(),
        "Initializing instrument."
    );

    let loader = Arc::new(FileLoader::new(samples, device.sample_rate()));
    let bank = SoundBank::new(loader, device, config.gain()?);
    let instrument = crate::instrument::Instrument::new(bank);

    Ok(crate::controller::Controller::new(
        instrument,
        config.controller().driver()?,
    ))
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs, io::Write, path::Path};

    use super::{parse, ConfigError, Controller};
    use crate::{soundbank::DEFAULT_GAIN, testutil::write_wav};

    #[test]
    fn test_full_config() -> Result<(), Box<dyn Error>> {
        let config = parse(
            r#"
            samples: /srv/omnichord
            gain: 0.5
            audio:
              device: UMC404HD
              sample_rate: 48000
            controller:
              kind: multi
              board:
                kind: serial
                device: /dev/ttyACM0
              keys:
                kind: keyboard
        "#,
        )?;

        assert_eq!(config.samples(Path::new("/etc")), Path::new("/srv/omnichord"));
        assert_eq!(config.gain()?, 0.5);
        assert_eq!(config.audio().device(), "UMC404HD");
        assert_eq!(config.audio().sample_rate(), Some(48000));

        match config.controller() {
            Controller::Multi(controllers) => {
                assert_eq!(controllers.len(), 2);
                match controllers.get("board") {
                    Some(Controller::Serial(serial)) => {
                        assert_eq!(serial.device(), Path::new("/dev/ttyACM0"))
                    }
                    other => panic!("unexpected board controller: {:?}", other),
                }
                assert!(matches!(controllers.get("keys"), Some(Controller::Keyboard)));
            }
            other => panic!("unexpected controller: {:?}", other),
        }
        assert!(config.controller().driver().is_ok());
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let config = parse("samples: samples")?;

        assert_eq!(
            config.samples(Path::new("/etc/omnichord")),
            Path::new("/etc/omnichord/samples")
        );
        assert_eq!(config.gain()?, DEFAULT_GAIN);
        assert_eq!(config.audio().device(), "default");
        assert_eq!(config.audio().sample_rate(), None);
        assert!(matches!(config.controller(), Controller::Keyboard));
        Ok(())
    }

    #[test]
    fn test_invalid_gain() -> Result<(), Box<dyn Error>> {
        let config = parse("samples: /srv\ngain: 1.5")?;
        assert!(matches!(config.gain(), Err(ConfigError::InvalidGain(_))));
        Ok(())
    }

    #[test]
    fn test_missing_samples() {
        assert!(matches!(parse("gain: 0.5"), Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_recursive_multi_is_rejected() -> Result<(), Box<dyn Error>> {
        let config = parse(
            r#"
            samples: /srv
            controller:
              kind: multi
              inner:
                kind: multi
        "#,
        )?;
        assert!(config.controller().driver().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_init_controller() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let chord_dir = dir.path().join("Omnichord").join("a");
        fs::create_dir_all(&chord_dir)?;
        write_wav(chord_dir.join("a-chord.wav"), vec![vec![0.1; 441]], 44100)?;

        let capture = dir.path().join("capture.txt");
        let mut file = fs::File::create(&capture)?;
        file.write_all(b"READY\r\nCHORD A MAJ\r\n")?;

        let config_path = dir.path().join("omnichord.yaml");
        fs::write(
            &config_path,
            format!(
                "samples: .\naudio:\n  device: mock-device\ncontroller:\n  kind: serial\n  device: {}\n",
                capture.display()
            ),
        )?;

        let mut controller = super::init_controller(&config_path)?;
        controller.join().await?;
        Ok(())
    }
}
