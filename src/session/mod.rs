// src/session/mod.rs
//! Live chat session engine. One foreground event loop owns the terminal
//! and all render state; one background poller per session discovers new
//! rows and hands them over on a channel. The two tasks share nothing else,
//! so "render each message exactly once" reduces to a single-writer check
//! in [`transcript::Transcript`].

pub mod compose;
pub mod poller;
pub mod transcript;

use std::sync::Arc;

use crate::config::Config;
use crate::input::LineReceiver;
use crate::models::{Message, UserAccount};
use crate::store::{MessageFeed, MessageStore};
use crate::ui::{self, Emphasis};

use compose::{Composer, Entry};
use poller::ChatPoller;
use transcript::Transcript;

/// Run a chat session until the user quits or the input stream ends.
/// Control returns to the caller (the menu layer); all failures inside the
/// session are reported inline and absorbed.
pub async fn open_session(
    store: &MessageStore,
    config: &Config,
    user: &UserAccount,
    partner_id: &str,
    partner_label: &str,
    lines: &mut LineReceiver,
) {
    ChatSession {
        store,
        config,
        user,
        partner_id,
        partner_label,
        transcript: Transcript::new(),
    }
    .run(lines)
    .await;
}

struct ChatSession<'a> {
    store: &'a MessageStore,
    config: &'a Config,
    user: &'a UserAccount,
    partner_id: &'a str,
    partner_label: &'a str,
    transcript: Transcript,
}

impl ChatSession<'_> {
    async fn run(mut self, lines: &mut LineReceiver) {
        ui::clear_screen();
        ui::banner(Some(self.user));
        ui::notice(&format!(
            "Chat with {} ({})",
            self.partner_label, self.partner_id
        ));
        ui::notice("Commands on an empty entry: [r] reload  [c] clear chat  [q] quit");
        ui::notice("Single ENTER = new line, double ENTER = send");

        // Initializing: render the full history and seed the watermark and
        // dedup set from it, then start polling above that point.
        match self.store.fetch_all(&self.user.user_id, self.partner_id).await {
            Ok(history) if history.is_empty() => println!("(No history)"),
            Ok(history) => {
                for message in history {
                    self.deliver(&message);
                }
            }
            Err(err) => ui::error(&format!("Could not load history: {err}")),
        }

        let (chat_poller, mut incoming) = ChatPoller::spawn(
            Arc::new(self.store.clone()),
            self.user.user_id.clone(),
            self.partner_id.to_string(),
            self.transcript.watermark(),
            self.config.poll_interval,
        );

        let mut composer = Composer::new();
        let mut poller_open = true;

        // Active: one select loop merges poller deliveries, input lines and
        // ctrl-c. Rendering happens only here, never on the poller task.
        loop {
            tokio::select! {
                delivered = incoming.recv(), if poller_open => match delivered {
                    Some(message) => self.deliver(&message),
                    None => poller_open = false,
                },
                line = lines.recv() => {
                    let Some(line) = line else {
                        // End of input is an implicit quit; a half-typed
                        // message is discarded.
                        break;
                    };
                    let Some(entry) = composer.push_line(&line) else {
                        continue;
                    };
                    match entry {
                        Entry::Reload => self.reload().await,
                        Entry::Clear => self.clear(lines).await,
                        Entry::Quit => break,
                        Entry::Send(body) => self.send(&body).await,
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        // Terminating: the poller observes cancellation at its next loop
        // check; don't wait longer than the grace period for it.
        chat_poller.stop(self.config.shutdown_grace).await;
    }

    /// Dedup gate plus render. Called for history rows, poller deliveries
    /// and manual reloads alike; the send path goes through
    /// [`Transcript::observe`] too, so an id can never render twice no
    /// matter which path sees it first.
    fn deliver(&mut self, message: &Message) {
        if !self.transcript.observe(message.id) {
            return;
        }
        if message.is_from(&self.user.user_id) {
            ui::render_message("You", &message.body, message.created_at, Emphasis::Sent);
        } else {
            ui::render_message(
                self.partner_label,
                &message.body,
                message.created_at,
                Emphasis::Received,
            );
        }
    }

    /// Manual reload: append anything above the watermark right now instead
    /// of waiting out the poll interval. Never clears what is already on
    /// screen. The poller may hand us some of the same rows again later;
    /// the dedup gate absorbs that.
    async fn reload(&mut self) {
        let since = self.transcript.watermark();
        match self
            .store
            .fetch_since(&self.user.user_id, self.partner_id, since)
            .await
        {
            Ok(batch) if batch.is_empty() => ui::notice("(no new messages)"),
            Ok(batch) => {
                for message in batch {
                    self.deliver(&message);
                }
            }
            Err(err) => ui::error(&format!("Reload failed: {err}")),
        }
    }

    async fn clear(&mut self, lines: &mut LineReceiver) {
        ui::prompt("Clear chat with this user? This deletes messages for both sides (y/n): ");
        let confirm = match lines.recv().await {
            Some(line) => line,
            None => return,
        };
        if !confirm.trim().eq_ignore_ascii_case("y") {
            ui::notice("Not cleared.");
            return;
        }

        match self
            .store
            .clear_conversation(&self.user.user_id, self.partner_id)
            .await
        {
            Ok(removed) => {
                // Rendered transcript stays on screen; only future render
                // decisions are affected.
                self.transcript.reset_seen();
                ui::success(&format!("Chat cleared ({removed} messages)."));
            }
            Err(err) => ui::error(&format!("Clear chat failed: {err}")),
        }
    }

    async fn send(&mut self, body: &str) {
        match self
            .store
            .insert(&self.user.user_id, self.partner_id, body)
            .await
        {
            Ok((id, created_at)) => {
                // Mark the id seen before the event loop can drain the
                // poller's independent discovery of the same row, then echo
                // it immediately instead of waiting a poll interval.
                if self.transcript.observe(id) {
                    ui::render_message("You", body, created_at, Emphasis::Sent);
                }
            }
            Err(err) => {
                // Composer is already back at an empty entry, so the user
                // can retype and retry without leaving the session.
                ui::error(&format!("Send failed: {err}"));
            }
        }
    }
}
