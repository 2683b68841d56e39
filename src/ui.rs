// src/ui.rs
//! Terminal chrome and the message render primitive. All transcript output
//! funnels through `render_message`, so emphasis stays consistent: sent =
//! yellow, received = blue, neutral chrome = default/cyan.

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use std::io::Write;

use crate::models::UserAccount;

/// How a rendered message relates to the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Sent,
    Received,
    Neutral,
}

/// The single transcript render primitive: speaker label, body (may span
/// lines), server timestamp, emphasis class.
pub fn render_message(label: &str, body: &str, timestamp: DateTime<Utc>, emphasis: Emphasis) {
    let line = format!("{label}: {body}");
    let styled = match emphasis {
        Emphasis::Sent => line.yellow(),
        Emphasis::Received => line.blue(),
        Emphasis::Neutral => line.normal(),
    };
    println!("{styled}");
    println!("{}", format!("  [{}]", local_timestamp(timestamp)).dimmed());
}

pub fn local_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

pub fn clear_screen() {
    print!("\x1b[2J\x1b[1;1H");
    let _ = std::io::stdout().flush();
}

pub fn banner(user: Option<&UserAccount>) {
    println!("{}", "════════════════════════════════════".magenta());
    println!("{}", "  CATAPULT — polling terminal chat".magenta().bold());
    println!("{}", "════════════════════════════════════".magenta());
    if let Some(user) = user {
        println!("Logged in as: {} (ID: {})", user.username, user.user_id);
    }
}

/// Print a prompt without a trailing newline and flush, so the answer is
/// typed on the same line.
pub fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

pub fn notice(text: &str) {
    println!("{}", text.cyan());
}

pub fn success(text: &str) {
    println!("{}", text.green());
}

pub fn error(text: &str) {
    println!("{}", text.red());
}
