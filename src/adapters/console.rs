//! Serial console command adapter.
//!
//! A small reader thread turns lines typed on the console (`flush`,
//! `snapshot`, `trim`) into [`AppCommand`]s. The main loop drains them with
//! [`SerialConsole::poll`] between ticks, so the history service is still
//! only touched from one task.
//!
//! On the device the console is the UART/USB-CDC stdin, which may report
//! "no data" either as `Ok(0)` or as `WouldBlock`; both just idle the reader.

use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::app::commands::AppCommand;

const READER_STACK_KB: usize = 4;
const IDLE: Duration = Duration::from_millis(200);

pub struct SerialConsole {
    rx: Receiver<AppCommand>,
}

impl SerialConsole {
    /// Start reading commands from stdin.
    pub fn spawn() -> io::Result<Self> {
        Self::spawn_reader(io::stdin())
    }

    pub fn spawn_reader(reader: impl Read + Send + 'static) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        info!("Spawning 'console' (stack={}KB)", READER_STACK_KB);
        thread::Builder::new()
            .name("console".into())
            .stack_size(READER_STACK_KB * 1024)
            .spawn(move || read_loop(BufReader::new(reader), tx))?;
        Ok(Self { rx })
    }

    /// Next pending command, if one was typed.
    pub fn poll(&self) -> Option<AppCommand> {
        self.rx.try_recv().ok()
    }
}

fn read_loop(mut reader: impl BufRead, tx: Sender<AppCommand>) {
    let mut line = String::new();
    loop {
        match reader.read_line(&mut line) {
            Ok(_) if line.ends_with('\n') => {
                let text = line.trim();
                if !text.is_empty() {
                    match text.parse::<AppCommand>() {
                        Ok(cmd) => {
                            info!("CONSOLE | {:?}", cmd);
                            if tx.send(cmd).is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("CONSOLE | {:?}: {}", text, e),
                    }
                }
                line.clear();
            }
            // Nothing buffered, or half a line so far.
            Ok(_) => thread::sleep(IDLE),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => line.clear(),
            Err(_) => thread::sleep(IDLE),
        }
    }
}
