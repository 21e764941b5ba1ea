use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Individual,
    Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Registered,
    Confirmed,
    Eliminated,
    Winner,
    Withdrawn,
}

/// A competition entry is exactly one of a user or a team. The storage row
/// keeps two nullable columns, but every write goes through this sum type,
/// so "exactly one populated" holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ParticipantEntry {
    Individual(Uuid),
    Team(Uuid),
}

impl ParticipantEntry {
    pub fn kind(&self) -> ParticipantKind {
        match self {
            Self::Individual(_) => ParticipantKind::Individual,
            Self::Team(_) => ParticipantKind::Team,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Individual(id) => Some(*id),
            Self::Team(_) => None,
        }
    }

    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            Self::Team(id) => Some(*id),
            Self::Individual(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetitionParticipant {
    pub participant_id: Uuid,
    pub competition_id: Uuid,
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub kind: ParticipantKind,
    pub status: ParticipantStatus,
    pub final_rank: Option<i64>,
    pub total_score: Option<i64>,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

impl CompetitionParticipant {
    /// Reconstructs the sum-type view of this row. `None` only for rows that
    /// predate the CHECK constraint or were written outside the engine.
    pub fn entry(&self) -> Option<ParticipantEntry> {
        match (self.kind, self.user_id, self.team_id) {
            (ParticipantKind::Individual, Some(user_id), _) => {
                Some(ParticipantEntry::Individual(user_id))
            }
            (ParticipantKind::Team, _, Some(team_id)) => Some(ParticipantEntry::Team(team_id)),
            _ => None,
        }
    }
}
