use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{QueueEntry, QueueEntryState};

/// Repository for song-request queue entries
pub struct QueueRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> QueueRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        event_id: Uuid,
        requester_id: Uuid,
        song_id: Uuid,
    ) -> Result<QueueEntry> {
        let entry = QueueEntry {
            entry_id: Uuid::new_v4(),
            event_id,
            requester_id,
            song_id,
            state: QueueEntryState::Pending,
            score: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO queue_entries (entry_id, event_id, requester_id, song_id, state, score, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.event_id)
        .bind(entry.requester_id)
        .bind(entry.song_id)
        .bind(entry.state)
        .bind(entry.score)
        .bind(entry.created_at)
        .execute(self.pool)
        .await?;

        Ok(entry)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<QueueEntry> {
        sqlx::query_as::<_, QueueEntry>(
            r#"
            SELECT entry_id, event_id, requester_id, song_id, state, score, created_at
            FROM queue_entries
            WHERE entry_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)
    }

    pub async fn count_pending(&self, event_id: Uuid, requester_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM queue_entries
            WHERE event_id = ? AND requester_id = ? AND state = ?
            "#,
        )
        .bind(event_id)
        .bind(requester_id)
        .bind(QueueEntryState::Pending)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Whether a pending entry for this song already sits in the event's
    /// queue. Scoped to pending entries only; history does not count.
    pub async fn pending_exists_for_song(&self, event_id: Uuid, song_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM queue_entries
            WHERE event_id = ? AND song_id = ? AND state = ?
            "#,
        )
        .bind(event_id)
        .bind(song_id)
        .bind(QueueEntryState::Pending)
        .fetch_one(self.pool)
        .await?;

        Ok(count > 0)
    }

    /// The requester's most recent entry for the event, in any state.
    pub async fn latest_for_requester(
        &self,
        event_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Option<QueueEntry>> {
        let entry = sqlx::query_as::<_, QueueEntry>(
            r#"
            SELECT entry_id, event_id, requester_id, song_id, state, score, created_at
            FROM queue_entries
            WHERE event_id = ? AND requester_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(requester_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(entry)
    }

    pub async fn finish(&self, id: Uuid, score: Option<i64>) -> Result<QueueEntry> {
        let result = sqlx::query(
            r#"
            UPDATE queue_entries
            SET state = ?, score = ?
            WHERE entry_id = ?
            "#,
        )
        .bind(QueueEntryState::Finished)
        .bind(score)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.find_by_id(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM queue_entries WHERE entry_id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    /// The event's queue, pending entries first, oldest first within a state.
    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<QueueEntry>> {
        let entries = sqlx::query_as::<_, QueueEntry>(
            r#"
            SELECT entry_id, event_id, requester_id, song_id, state, score, created_at
            FROM queue_entries
            WHERE event_id = ?
            ORDER BY state = 'pending' DESC, created_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }
}
