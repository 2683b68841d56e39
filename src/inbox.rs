// src/inbox.rs
//! Inbox view: one line per conversation, newest first, with a flattened
//! preview of the latest message and a relative timestamp.

use colored::Colorize;

use crate::accounts::AccountService;
use crate::contacts::ContactBook;
use crate::models::{ConversationPreview, UserAccount};
use crate::store::MessageStore;
use crate::ui;

const PREVIEW_WIDTH: usize = 50;

/// Render the inbox and return the rows in display order so the caller can
/// resolve a numbered selection against them.
pub async fn render_inbox(
    store: &MessageStore,
    accounts: &AccountService,
    contacts: &ContactBook,
    user: &UserAccount,
    limit: i64,
) -> Vec<ConversationPreview> {
    let rows = match store.latest_per_partner(&user.user_id, limit).await {
        Ok(rows) => rows,
        Err(err) => {
            ui::error(&format!("Could not load inbox: {err}"));
            return Vec::new();
        }
    };

    ui::notice("Inbox (conversations):");
    if rows.is_empty() {
        println!("(No conversations yet)");
        return rows;
    }

    for (index, row) in rows.iter().enumerate() {
        let name = resolve_name(accounts, contacts, &row.partner_id).await;
        println!(
            "{} {:<16} {:<width$} {}",
            format!("{:>2})", index + 1).cyan(),
            name,
            preview_line(&row.body, PREVIEW_WIDTH),
            format_relative_time(&row.created_at).dimmed(),
            width = PREVIEW_WIDTH,
        );
    }
    rows
}

/// Contact cache, then server lookup, then the raw id.
pub async fn resolve_name(
    accounts: &AccountService,
    contacts: &ContactBook,
    partner_id: &str,
) -> String {
    if let Some(name) = contacts.get(partner_id) {
        return name.to_string();
    }
    match accounts.lookup_username(partner_id).await {
        Ok(Some(name)) => name,
        Ok(None) => partner_id.to_string(),
        Err(err) => {
            tracing::debug!("name lookup failed, using raw id: {err}");
            partner_id.to_string()
        }
    }
}

/// Flatten line breaks and clamp to `width` characters for list display.
pub fn preview_line(body: &str, width: usize) -> String {
    let flat = body.replace('\n', " ");
    let mut preview: String = flat.chars().take(width).collect();
    if flat.chars().count() > width {
        preview.push('…');
    }
    preview
}

// Helper to format timestamps in a human-readable relative format.
pub fn format_relative_time(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let duration = now.signed_duration_since(*timestamp);

    if duration.num_seconds() < 60 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        let mins = duration.num_minutes();
        if mins == 1 {
            "1 minute ago".to_string()
        } else {
            format!("{} minutes ago", mins)
        }
    } else if duration.num_hours() < 24 {
        let hours = duration.num_hours();
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else if duration.num_days() < 30 {
        let days = duration.num_days();
        if days == 1 {
            "1 day ago".to_string()
        } else {
            format!("{} days ago", days)
        }
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview_line("hello\nworld", 50), "hello world");

        let long = "x".repeat(60);
        let preview = preview_line(&long, 50);
        assert_eq!(preview.chars().count(), 51);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn preview_respects_multibyte_boundaries() {
        let body = "héllo wörld ünïcode ".repeat(5);
        let preview = preview_line(&body, 50);
        assert!(preview.chars().count() <= 51);
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&(now - Duration::seconds(5))), "just now");
        assert_eq!(
            format_relative_time(&(now - Duration::minutes(1))),
            "1 minute ago"
        );
        assert_eq!(
            format_relative_time(&(now - Duration::minutes(45))),
            "45 minutes ago"
        );
        assert_eq!(
            format_relative_time(&(now - Duration::hours(3))),
            "3 hours ago"
        );
        assert_eq!(format_relative_time(&(now - Duration::days(2))), "2 days ago");

        let old = now - Duration::days(90);
        assert_eq!(
            format_relative_time(&old),
            old.format("%Y-%m-%d").to_string()
        );
    }
}
