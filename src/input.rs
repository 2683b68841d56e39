// src/input.rs
//! Bridges blocking stdin onto the async world: a dedicated OS thread reads
//! lines and forwards them into an unbounded channel the event loops can
//! `select!` over. Channel close means end-of-input.

use std::io::BufRead;

use tokio::sync::mpsc;

pub type LineReceiver = mpsc::UnboundedReceiver<String>;

/// Spawn the reader thread. Call once at startup; the single receiver is
/// shared by the menu and every chat session so there is exactly one
/// consumer of the terminal.
pub fn spawn_stdin_reader() -> LineReceiver {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::debug!("stdin read failed, closing input channel: {err}");
                    break;
                }
            };
            if tx.send(line).is_err() {
                break;
            }
        }
        // Dropping the sender closes the channel; consumers treat that as
        // an implicit quit.
    });

    rx
}
