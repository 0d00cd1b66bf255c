//! Line commands read from stdin while the daemon runs.
//!
//! Stdin is read on a detached OS thread, so a read that never completes
//! does not hold up runtime shutdown.

use log::{debug, info, warn};
use std::io::BufRead;
use tokio::sync::mpsc;
use wlankeep::{Poller, WifiKeeper};

const LINE_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Connect to the target now.
    Connect,
    /// Print the current status.
    Status,
    /// Stop the daemon.
    Quit,
    Unknown(String),
}

impl ConsoleCommand {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.trim();
        if word.is_empty() {
            return None;
        }
        Some(match word.to_ascii_lowercase().as_str() {
            "connect" | "c" => Self::Connect,
            "status" | "s" => Self::Status,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(word.to_string()),
        })
    }
}

/// Reads commands from stdin until `quit`.
pub async fn run(keeper: &WifiKeeper, poller: &Poller) {
    serve(keeper, poller, spawn_reader(std::io::BufReader::new(std::io::stdin()))).await;
}

/// Forwards lines from `input` to a channel from a detached thread.
///
/// The channel closes at end of input or on a read error.
pub fn spawn_reader<R>(input: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    let spawned = std::thread::Builder::new()
        .name("wlankeepd-console".into())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read console input: {e}");
                        break;
                    }
                }
            }
            debug!("Console input closed");
        });
    if let Err(e) = spawned {
        warn!("Failed to start the console reader: {e}");
    }
    rx
}

/// Handles console lines until `quit`.
///
/// Once `lines` closes the console goes idle and polling carries on.
pub async fn serve(keeper: &WifiKeeper, poller: &Poller, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.recv().await {
        match ConsoleCommand::parse(&line) {
            None => {}
            Some(ConsoleCommand::Connect) => {
                info!("Manual connect requested");
                // runs in the background so the console stays responsive
                drop(poller.trigger());
            }
            Some(ConsoleCommand::Status) => {
                let status = keeper.status().await;
                println!("{status}");
                println!("{}", status.state.tooltip());
            }
            Some(ConsoleCommand::Quit) => return,
            Some(ConsoleCommand::Unknown(word)) => {
                println!("Unknown command `{word}`; try connect, status or quit");
            }
        }
    }

    std::future::pending::<()>().await;
}
