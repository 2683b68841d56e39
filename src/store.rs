// src/store.rs
//! Typed client for the remote message log. Every method opens its own
//! round-trip on the shared pool; nothing here pins a connection across
//! calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

use crate::models::{ConversationPreview, Message};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("message store unreachable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("write failed: {0}")]
    WriteFailed(#[source] sqlx::Error),
    #[error("query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),
}

impl StoreError {
    fn write(err: sqlx::Error) -> Self {
        if is_connection_error(&err) {
            StoreError::Unavailable(err)
        } else {
            StoreError::WriteFailed(err)
        }
    }

    fn query(err: sqlx::Error) -> Self {
        if is_connection_error(&err) {
            StoreError::Unavailable(err)
        } else {
            StoreError::QueryFailed(err)
        }
    }
}

fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// The one store operation the background poller needs. A trait seam so the
/// poller can run against a scripted feed in tests.
#[async_trait]
pub trait MessageFeed: Send + Sync + 'static {
    /// Messages of the conversation `{user_id, partner_id}` with
    /// `id > after_id`, ascending by id.
    async fn fetch_since(
        &self,
        user_id: &str,
        partner_id: &str,
        after_id: i64,
    ) -> Result<Vec<Message>, StoreError>;
}

#[derive(Clone)]
pub struct MessageStore {
    pool: PgPool,
}

impl MessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a message and return its server-assigned (id, created_at).
    /// Never partially applies: either the row exists with its id, or the
    /// error is returned and nothing was written.
    pub async fn insert(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        body: &str,
    ) -> Result<(i64, DateTime<Utc>), StoreError> {
        let row = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "INSERT INTO messages (from_user_id, to_user_id, body)
             VALUES ($1, $2, $3)
             RETURNING id, created_at",
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::write)?;

        Ok(row)
    }

    /// Full conversation history, ascending by id.
    pub async fn fetch_all(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> Result<Vec<Message>, StoreError> {
        sqlx::query_as::<_, Message>(
            "SELECT id, from_user_id, to_user_id, body, created_at
             FROM messages
             WHERE (from_user_id = $1 AND to_user_id = $2)
                OR (from_user_id = $2 AND to_user_id = $1)
             ORDER BY id ASC",
        )
        .bind(user_id)
        .bind(partner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query)
    }

    /// Delete every message between the two users, both directions.
    /// Irreversible. Returns the number of rows removed.
    pub async fn clear_conversation(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM messages
             WHERE (from_user_id = $1 AND to_user_id = $2)
                OR (from_user_id = $2 AND to_user_id = $1)",
        )
        .bind(user_id)
        .bind(partner_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::write)?;

        Ok(result.rows_affected())
    }

    /// Delete every message addressed to the user, across all partners.
    pub async fn clear_inbox(&self, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE to_user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::write)?;

        Ok(result.rows_affected())
    }

    /// For every conversation the user participates in, the single most
    /// recent message, newest conversation first, truncated to `limit`.
    pub async fn latest_per_partner(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationPreview>, StoreError> {
        sqlx::query_as::<_, ConversationPreview>(
            "SELECT partner_id, body, created_at FROM (
                 SELECT DISTINCT ON (partner)
                        partner AS partner_id, body, created_at
                 FROM (
                     SELECT CASE WHEN from_user_id = $1 THEN to_user_id
                                 ELSE from_user_id END AS partner,
                            body, created_at
                     FROM messages
                     WHERE from_user_id = $1 OR to_user_id = $1
                 ) pairs
                 ORDER BY partner, created_at DESC
             ) latest
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query)
    }
}

#[async_trait]
impl MessageFeed for MessageStore {
    async fn fetch_since(
        &self,
        user_id: &str,
        partner_id: &str,
        after_id: i64,
    ) -> Result<Vec<Message>, StoreError> {
        sqlx::query_as::<_, Message>(
            "SELECT id, from_user_id, to_user_id, body, created_at
             FROM messages
             WHERE ((from_user_id = $1 AND to_user_id = $2)
                 OR (from_user_id = $2 AND to_user_id = $1))
               AND id > $3
             ORDER BY id ASC",
        )
        .bind(user_id)
        .bind(partner_id)
        .bind(after_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_classify_as_unavailable() {
        let err = StoreError::write(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Unavailable(_)));

        let err = StoreError::query(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        )));
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn non_connection_failures_keep_their_operation() {
        let err = StoreError::write(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::WriteFailed(_)));

        let err = StoreError::query(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }
}
