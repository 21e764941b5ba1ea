use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueEntryState {
    Pending,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueueEntry {
    pub entry_id: Uuid,
    pub event_id: Uuid,
    pub requester_id: Uuid,
    pub song_id: Uuid,
    pub state: QueueEntryState,
    pub score: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
