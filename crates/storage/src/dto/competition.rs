use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CompetitionFormat, ParticipantEntry, ParticipantStatus};

/// Request payload for creating a new competition
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCompetitionRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// Free-form discipline label, e.g. "dance_battle" or "freestyle".
    #[validate(length(min = 1, max = 100))]
    pub kind: String,

    pub format: CompetitionFormat,

    #[validate(range(
        min = 2,
        max = 128,
        message = "Max participants must be between 2 and 128"
    ))]
    pub max_participants: i64,

    pub starts_at: Option<DateTime<Utc>>,

    #[validate(length(max = 4000))]
    pub rules: Option<String>,
}

/// One reported match outcome
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportResultRequest {
    pub match_id: Uuid,

    pub winner_id: Uuid,

    /// Display score, e.g. "3-2".
    #[validate(length(max = 50))]
    pub score: Option<String>,
}

/// One row of the final ranking supplied to `finish`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FinalRankingEntry {
    pub participant_id: Uuid,

    #[validate(range(min = 1, message = "Position must be at least 1"))]
    pub position: i64,

    pub score: Option<i64>,
}

/// Response row of the `ranking` read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRow {
    /// Synthetic 1-based position: stored rank where present, otherwise the
    /// row's position in the sorted listing.
    pub position: i64,
    pub participant_id: Uuid,
    pub entry: Option<ParticipantEntry>,
    pub status: ParticipantStatus,
    pub final_rank: Option<i64>,
    pub total_score: Option<i64>,
}
