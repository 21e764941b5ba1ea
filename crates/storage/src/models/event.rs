use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub event_id: Uuid,
    pub name: String,
    pub organizer_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
