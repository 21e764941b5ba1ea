use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::dto::competition::CreateCompetitionRequest;
use crate::error::{Result, StorageError, is_unique_violation};
use crate::models::{
    Competition, CompetitionParticipant, CompetitionState, ParticipantEntry, ParticipantStatus,
    TeamState,
};

const PARTICIPANT_COLUMNS: &str = "participant_id, competition_id, user_id, team_id, kind, status, final_rank, total_score, registered_at";
const COMPETITION_COLUMNS: &str = "competition_id, event_id, name, kind, format, state, max_participants, current_participants, starts_at, ends_at, rules, bracket, created_at";

/// Repository for Competition database operations
pub struct CompetitionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CompetitionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, event_id: Uuid, req: &CreateCompetitionRequest) -> Result<Competition> {
        let competition = Competition {
            competition_id: Uuid::new_v4(),
            event_id,
            name: req.name.clone(),
            kind: req.kind.clone(),
            format: req.format,
            state: CompetitionState::Registration,
            max_participants: req.max_participants,
            current_participants: 0,
            starts_at: req.starts_at,
            ends_at: None,
            rules: req.rules.clone(),
            bracket: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO competitions (competition_id, event_id, name, kind, format, state,
                                      max_participants, current_participants, starts_at, ends_at,
                                      rules, bracket, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(competition.competition_id)
        .bind(competition.event_id)
        .bind(&competition.name)
        .bind(&competition.kind)
        .bind(competition.format)
        .bind(competition.state)
        .bind(competition.max_participants)
        .bind(competition.current_participants)
        .bind(competition.starts_at)
        .bind(competition.ends_at)
        .bind(&competition.rules)
        .bind(&competition.bracket)
        .bind(competition.created_at)
        .execute(self.pool)
        .await?;

        Ok(competition)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Competition> {
        sqlx::query_as::<_, Competition>(&format!(
            "SELECT {COMPETITION_COLUMNS} FROM competitions WHERE competition_id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)
    }

    pub async fn find_participant(
        &self,
        competition_id: Uuid,
        entry: &ParticipantEntry,
    ) -> Result<Option<CompetitionParticipant>> {
        let (column, id) = match entry {
            ParticipantEntry::Individual(id) => ("user_id", *id),
            ParticipantEntry::Team(id) => ("team_id", *id),
        };

        let participant = sqlx::query_as::<_, CompetitionParticipant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM competition_participants
             WHERE competition_id = ? AND {column} = ?"
        ))
        .bind(competition_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(participant)
    }

    pub async fn participants_with_status(
        &self,
        competition_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<Vec<CompetitionParticipant>> {
        let participants = sqlx::query_as::<_, CompetitionParticipant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM competition_participants
             WHERE competition_id = ? AND status = ?
             ORDER BY registered_at ASC"
        ))
        .bind(competition_id)
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        Ok(participants)
    }

    /// Inserts the participant, bumps the admission counter and, for team
    /// entries, locks the team into the competition — all in one transaction.
    pub async fn register_participant(
        &self,
        competition_id: Uuid,
        entry: &ParticipantEntry,
    ) -> Result<CompetitionParticipant> {
        let participant = CompetitionParticipant {
            participant_id: Uuid::new_v4(),
            competition_id,
            user_id: entry.user_id(),
            team_id: entry.team_id(),
            kind: entry.kind(),
            status: ParticipantStatus::Registered,
            final_rank: None,
            total_score: None,
            registered_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO competition_participants (participant_id, competition_id, user_id, team_id,
                                                  kind, status, final_rank, total_score, registered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(participant.participant_id)
        .bind(participant.competition_id)
        .bind(participant.user_id)
        .bind(participant.team_id)
        .bind(participant.kind)
        .bind(participant.status)
        .bind(participant.final_rank)
        .bind(participant.total_score)
        .bind(participant.registered_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::ConstraintViolation("Already registered".to_string())
            } else {
                StorageError::from(e)
            }
        })?;

        sqlx::query(
            r#"
            UPDATE competitions
            SET current_participants = current_participants + 1
            WHERE competition_id = ?
            "#,
        )
        .bind(competition_id)
        .execute(&mut *tx)
        .await?;

        if let Some(team_id) = entry.team_id() {
            sqlx::query("UPDATE teams SET state = ? WHERE team_id = ?")
                .bind(TeamState::Active)
                .bind(team_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(participant)
    }

    /// Transitions the competition to `in_progress` with its freshly built
    /// bracket and confirms every registered participant.
    pub async fn start(&self, competition_id: Uuid, bracket: &str) -> Result<Competition> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE competitions
            SET state = ?, bracket = ?, starts_at = COALESCE(starts_at, ?)
            WHERE competition_id = ?
            "#,
        )
        .bind(CompetitionState::InProgress)
        .bind(bracket)
        .bind(Utc::now())
        .bind(competition_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r#"
            UPDATE competition_participants
            SET status = ?
            WHERE competition_id = ? AND status = ?
            "#,
        )
        .bind(ParticipantStatus::Confirmed)
        .bind(competition_id)
        .bind(ParticipantStatus::Registered)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_by_id(competition_id).await
    }

    pub async fn update_bracket(&self, competition_id: Uuid, bracket: &str) -> Result<()> {
        let result = sqlx::query("UPDATE competitions SET bracket = ? WHERE competition_id = ?")
            .bind(bracket)
            .bind(competition_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    /// Applies the final ranking and closes the competition. Rolls back in
    /// full if any supplied participant id does not belong to it.
    pub async fn apply_final_ranking(
        &self,
        competition_id: Uuid,
        ranking: &[(Uuid, i64, Option<i64>, ParticipantStatus)],
    ) -> Result<Competition> {
        let mut tx = self.pool.begin().await?;

        for (participant_id, rank, score, status) in ranking {
            let result = sqlx::query(
                r#"
                UPDATE competition_participants
                SET final_rank = ?, total_score = ?, status = ?
                WHERE participant_id = ? AND competition_id = ?
                "#,
            )
            .bind(rank)
            .bind(score)
            .bind(status)
            .bind(participant_id)
            .bind(competition_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StorageError::NotFound);
            }
        }

        sqlx::query(
            r#"
            UPDATE competitions
            SET state = ?, ends_at = ?
            WHERE competition_id = ?
            "#,
        )
        .bind(CompetitionState::Finished)
        .bind(Utc::now())
        .bind(competition_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_by_id(competition_id).await
    }

    /// Cancels the competition and withdraws every participant.
    pub async fn cancel(&self, competition_id: Uuid, rules: Option<&str>) -> Result<Competition> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE competitions
            SET state = ?, rules = ?
            WHERE competition_id = ?
            "#,
        )
        .bind(CompetitionState::Cancelled)
        .bind(rules)
        .bind(competition_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r#"
            UPDATE competition_participants
            SET status = ?
            WHERE competition_id = ?
            "#,
        )
        .bind(ParticipantStatus::Withdrawn)
        .bind(competition_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_by_id(competition_id).await
    }

    /// Ranking order: stored rank first (nulls last), then score descending,
    /// then registration time. SQLite sorts NULL smallest, so `DESC` already
    /// pushes score-less rows to the back.
    pub async fn participants_ranked(
        &self,
        competition_id: Uuid,
    ) -> Result<Vec<CompetitionParticipant>> {
        let participants = sqlx::query_as::<_, CompetitionParticipant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM competition_participants
             WHERE competition_id = ?
             ORDER BY final_rank IS NULL ASC, final_rank ASC, total_score DESC, registered_at ASC"
        ))
        .bind(competition_id)
        .fetch_all(self.pool)
        .await?;

        Ok(participants)
    }
}
