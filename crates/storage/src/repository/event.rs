use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::Event;

/// Repository for Event database operations
pub struct EventRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> EventRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str, organizer_id: Uuid) -> Result<Event> {
        let event = Event {
            event_id: Uuid::new_v4(),
            name: name.to_string(),
            organizer_id,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO events (event_id, name, organizer_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(event.event_id)
        .bind(&event.name)
        .bind(event.organizer_id)
        .bind(event.created_at)
        .execute(self.pool)
        .await?;

        Ok(event)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Event> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT event_id, name, organizer_id, created_at
            FROM events
            WHERE event_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)
    }
}
