use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Song {
    pub song_id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub approved: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
