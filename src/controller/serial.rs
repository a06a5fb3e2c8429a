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
    fs::{File, OpenOptions},
    io,
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
};

use nix::{
    errno::Errno,
    fcntl::OFlag,
    sys::termios::{self, SetArg},
};
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, info, span, Instrument, Level};

use super::Event;
use crate::serial::Bridge;

/// A controller that listens to the chord board over its serial device node
/// (e.g. /dev/ttyACM0). The board's USB CDC link ignores baud and framing, but
/// the tty line discipline still applies, so the node is put in raw mode.
pub struct Driver {
    /// The device node to read from.
    device: PathBuf,
}

impl Driver {
    pub fn new(device: PathBuf) -> Driver {
        Driver { device }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let device = self.device.clone();
        let span = span!(Level::INFO, "serial driver", device = %device.display());

        tokio::spawn(
            async move {
                let opened = tokio::task::spawn_blocking(move || open_raw(&device))
                    .await
                    .map_err(io::Error::other)
                    .and_then(|opened| opened);
                let file = match opened {
                    Ok(file) => tokio::fs::File::from_std(file),
                    Err(e) => {
                        // Never connected, but the controller still needs to hear
                        // that the board is gone.
                        let _ = events_tx.send(Event::Disconnected).await;
                        return Err(e);
                    }
                };
                info!("Serial driver started.");

                Bridge::new().run(file, &events_tx).await
            }
            .instrument(span),
        )
    }
}

/// Opens a device node for reading. A tty is switched to raw mode so the line
/// discipline neither rewrites the CR-LF terminators nor echoes bytes back to
/// the board. Anything else, such as a captured session, is read as it is.
fn open_raw(device: &Path) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NOCTTY.bits())
        .open(device)?;

    match termios::tcgetattr(&file) {
        Ok(mut settings) => {
            termios::cfmakeraw(&mut settings);
            termios::tcsetattr(&file, SetArg::TCSANOW, &settings)?;
            debug!("Device switched to raw mode.");
        }
        Err(Errno::ENOTTY) => debug!("Device is not a terminal, reading it as-is."),
        Err(e) => return Err(e.into()),
    }
    Ok(file)
}

#[cfg(test)]
mod test {
    use std::{error::Error, io::Write};

    use tokio::sync::mpsc;

    use super::Driver as SerialDriver;
    use crate::{
        controller::{Driver, Event},
        serial::{ChordEvent, Quality},
    };

    #[tokio::test]
    async fn test_reads_device_until_end() -> Result<(), Box<dyn Error>> {
        let mut capture = tempfile::NamedTempFile::new()?;
        capture.write_all(b"READY\r\nCHORD A MAJ\r\nTHEREMIN 3 9\r\nCHORD E 7")?;
        capture.flush()?;

        let (events_tx, mut events_rx) = mpsc::channel(16);
        let driver = SerialDriver::new(capture.path().to_path_buf());
        driver.monitor_events(events_tx).await??;

        assert_eq!(
            events_rx.recv().await,
            Some(Event::SerialChord(ChordEvent::new("A", Quality::Major)))
        );
        assert_eq!(events_rx.recv().await, Some(Event::Disconnected));
        assert_eq!(events_rx.recv().await, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_device() {
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let driver = SerialDriver::new("/nonexistent/ttyACM9".into());

        let result = driver.monitor_events(events_tx).await;
        assert!(matches!(result, Ok(Err(_))));
        assert_eq!(events_rx.recv().await, Some(Event::Disconnected));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_reads_pty_in_raw_mode() -> Result<(), Box<dyn Error>> {
        use std::{io::Read, time::Duration};

        use nix::{
            fcntl::OFlag,
            pty::{grantpt, posix_openpt, ptsname_r, unlockpt},
            sys::termios::{tcgetattr, LocalFlags},
        };

        use crate::testutil::eventually;

        let mut master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY | OFlag::O_NONBLOCK)?;
        grantpt(&master)?;
        unlockpt(&master)?;
        let board = ptsname_r(&master)?;

        let (events_tx, mut events_rx) = mpsc::channel(16);
        let driver = SerialDriver::new(board.into());
        let handle = driver.monitor_events(events_tx);

        // Both ends of a pty share one set of line settings.
        eventually(
            || {
                tcgetattr(&master)
                    .map(|t| !t.local_flags.contains(LocalFlags::ECHO))
                    .unwrap_or(false)
            },
            "Device was never switched to raw mode",
        )
        .await;

        master.write_all(b"CHORD G MIN\r\n")?;
        assert_eq!(
            events_rx.recv().await,
            Some(Event::SerialChord(ChordEvent::new("G", Quality::Minor)))
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut echoed = [0u8; 64];
        match master.read(&mut echoed) {
            Err(e) => assert_eq!(e.kind(), std::io::ErrorKind::WouldBlock),
            Ok(n) => panic!("board was sent {:?}", &echoed[..n]),
        }

        drop(master);
        assert_eq!(events_rx.recv().await, Some(Event::Disconnected));
        let _ = handle.await?;
        Ok(())
    }
}
