use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeamState {
    Forming,
    Full,
    /// Locked into a competition; no further joins or leaves.
    Active,
    Dissolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub team_id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub leader_id: Uuid,
    pub max_members: i64,
    pub invite_code: String,
    pub state: TeamState,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
