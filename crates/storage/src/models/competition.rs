use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompetitionState {
    Registration,
    InProgress,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompetitionFormat {
    Individual,
    Team,
    Mixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Competition {
    pub competition_id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub kind: String,
    pub format: CompetitionFormat,
    pub state: CompetitionState,
    pub max_participants: i64,
    pub current_participants: i64,
    pub starts_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ends_at: Option<chrono::DateTime<chrono::Utc>>,
    pub rules: Option<String>,
    /// JSON serialization of the engine's `Bracket`; present once the
    /// competition has left `registration`.
    pub bracket: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
