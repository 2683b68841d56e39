// src/accounts.rs
//! Account service (users table) and the local profile file. Registration
//! is interactive and idempotent: an existing server account with the same
//! username is adopted instead of duplicated.

use std::path::Path;

use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;

use crate::input::LineReceiver;
use crate::models::UserAccount;
use crate::ui;

const PROFILE_FILE: &str = "user.json";

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("account store error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("profile file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("profile file encode: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn lookup_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, AccountError> {
        let row = sqlx::query_as::<_, UserAccount>(
            "SELECT user_id, username FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Display-name resolution for a partner id.
    pub async fn lookup_username(&self, user_id: &str) -> Result<Option<String>, AccountError> {
        let row = sqlx::query_as::<_, (String,)>("SELECT username FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(username,)| username))
    }

    /// Create the account, or adopt the existing one if the username is
    /// already registered.
    pub async fn register(&self, account: &UserAccount) -> Result<UserAccount, AccountError> {
        if let Some(existing) = self.lookup_by_username(&account.username).await? {
            return Ok(existing);
        }

        sqlx::query("INSERT INTO users (user_id, username) VALUES ($1, $2)")
            .bind(&account.user_id)
            .bind(&account.username)
            .execute(&self.pool)
            .await?;

        Ok(account.clone())
    }

    /// Remove the user and every message they sent or received.
    /// Irreversible.
    pub async fn delete_account(&self, user_id: &str) -> Result<(), AccountError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE from_user_id = $1 OR to_user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id, "account deleted");
        Ok(())
    }
}

/// Fixed-format 8-digit id, leading zeros allowed.
pub fn generate_user_id() -> String {
    let mut rng = rand::thread_rng();
    (0..8).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

pub fn load_profile(data_dir: &Path) -> Option<UserAccount> {
    let raw = std::fs::read_to_string(data_dir.join(PROFILE_FILE)).ok()?;
    match serde_json::from_str(&raw) {
        Ok(profile) => Some(profile),
        Err(err) => {
            tracing::warn!("profile file unreadable, re-registering: {err}");
            None
        }
    }
}

pub fn save_profile(data_dir: &Path, account: &UserAccount) -> Result<(), AccountError> {
    std::fs::create_dir_all(data_dir)?;
    let raw = serde_json::to_string_pretty(account)?;
    std::fs::write(data_dir.join(PROFILE_FILE), raw)?;
    Ok(())
}

pub fn delete_profile(data_dir: &Path) {
    let _ = std::fs::remove_file(data_dir.join(PROFILE_FILE));
}

/// Startup identity flow: local profile if present, otherwise prompt for a
/// name and adopt-or-register. Returns None when the input stream ends or
/// registration cannot reach the store.
pub async fn create_or_load(
    service: &AccountService,
    data_dir: &Path,
    lines: &mut LineReceiver,
) -> Option<UserAccount> {
    if let Some(profile) = load_profile(data_dir) {
        ui::notice(&format!(
            "Loaded local user: {} ({})",
            profile.username, profile.user_id
        ));
        return Some(profile);
    }

    loop {
        ui::prompt("Enter your name: ");
        let username = lines.recv().await?.trim().to_string();
        if username.is_empty() {
            ui::error("Name cannot be empty.");
            continue;
        }

        match service.lookup_by_username(&username).await {
            Ok(Some(existing)) => {
                ui::notice(&format!(
                    "Using existing account: {} ({})",
                    existing.username, existing.user_id
                ));
                if let Err(err) = save_profile(data_dir, &existing) {
                    tracing::warn!("could not save profile locally: {err}");
                }
                return Some(existing);
            }
            Ok(None) => {}
            Err(err) => {
                ui::error(&format!("Registration failed: {err}"));
                return None;
            }
        }

        let account = UserAccount {
            user_id: generate_user_id(),
            username,
        };
        match service.register(&account).await {
            Ok(registered) => {
                if let Err(err) = save_profile(data_dir, &registered) {
                    tracing::warn!("could not save profile locally: {err}");
                }
                ui::success(&format!(
                    "Registered and saved locally: {} ({})",
                    registered.username, registered.user_id
                ));
                return Some(registered);
            }
            Err(err) => {
                ui::error(&format!("Registration failed: {err}"));
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_eight_digits() {
        for _ in 0..100 {
            let id = generate_user_id();
            assert_eq!(id.len(), 8);
            assert!(id.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn profile_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let account = UserAccount {
            user_id: "01234567".into(),
            username: "ada".into(),
        };

        save_profile(dir.path(), &account).unwrap();
        let loaded = load_profile(dir.path()).unwrap();
        assert_eq!(loaded.user_id, account.user_id);
        assert_eq!(loaded.username, account.username);

        delete_profile(dir.path());
        assert!(load_profile(dir.path()).is_none());
    }

    #[test]
    fn corrupt_profile_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROFILE_FILE), "{broken").unwrap();
        assert!(load_profile(dir.path()).is_none());
    }
}
