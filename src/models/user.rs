// src/models/user.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered account. `user_id` is a fixed 8-digit string chosen at
/// registration; `username` is unique server-side. The same struct is
/// persisted as the local profile file.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub user_id: String,
    pub username: String,
}
