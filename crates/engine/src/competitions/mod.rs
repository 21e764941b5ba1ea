//! Competition lifecycle: registration, bracket play, ranking, cancellation.

pub mod bracket;

use rand::SeedableRng;
use rand::rngs::StdRng;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use storage::dto::competition::{CreateCompetitionRequest, FinalRankingEntry, RankingRow, ReportResultRequest};
use storage::error::StorageError;
use storage::models::{
    Competition, CompetitionFormat, CompetitionParticipant, CompetitionState, MembershipStatus,
    ParticipantEntry, ParticipantStatus, TeamState, UserRole,
};
use storage::repository::{CompetitionRepository, TeamRepository, UserRepository};

use crate::access;
use crate::error::{EngineError, Result};
use crate::modules::{ModuleGate, ModuleKind};
use crate::sync::KeyedLock;
use bracket::Bracket;

/// Drives a competition through
/// `registration -> in_progress -> finished` with cancellation possible from
/// either live state. All other transitions are rejected.
pub struct CompetitionLifecycle {
    pool: SqlitePool,
    gate: ModuleGate,
    /// Serializes admission-counter updates per competition.
    locks: KeyedLock<Uuid>,
}

impl CompetitionLifecycle {
    pub fn new(pool: SqlitePool) -> Self {
        let gate = ModuleGate::new(pool.clone());
        Self {
            pool,
            gate,
            locks: KeyedLock::new(),
        }
    }

    async fn find_competition(&self, competition_id: Uuid) -> Result<Competition> {
        CompetitionRepository::new(&self.pool)
            .find_by_id(competition_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => {
                    EngineError::NotFound("competition not found".to_string())
                }
                other => other.into(),
            })
    }

    fn parse_bracket(competition: &Competition) -> Result<Bracket> {
        let raw = competition.bracket.as_deref().ok_or_else(|| {
            tracing::error!(competition_id = %competition.competition_id, "in-progress competition has no bracket");
            EngineError::Internal
        })?;

        Ok(serde_json::from_str(raw)?)
    }

    /// Organizer/admin creates a competition for an event whose `tournament`
    /// module has been switched on.
    pub async fn create(
        &self,
        event_id: Uuid,
        acting_user_id: Uuid,
        req: &CreateCompetitionRequest,
    ) -> Result<Competition> {
        req.validate()?;

        if !self.gate.is_active(event_id, ModuleKind::Tournament).await? {
            return Err(EngineError::Forbidden(
                "the tournament module is not active for this event".to_string(),
            ));
        }
        access::require_event_manager(&self.pool, event_id, acting_user_id).await?;

        let competition = CompetitionRepository::new(&self.pool)
            .create(event_id, req)
            .await?;
        tracing::info!(competition_id = %competition.competition_id, %event_id, "competition created");
        Ok(competition)
    }

    /// Registers a user or a team, depending on the competition's format.
    /// Admission is serialized per competition so the participant counter
    /// can never pass `max_participants`.
    pub async fn register(
        &self,
        competition_id: Uuid,
        acting_user_id: Uuid,
        entry: ParticipantEntry,
    ) -> Result<CompetitionParticipant> {
        let _guard = self.locks.acquire(competition_id).await;
        let competition = self.find_competition(competition_id).await?;

        if competition.state != CompetitionState::Registration {
            return Err(EngineError::InvalidState(
                "registration is closed".to_string(),
            ));
        }
        if competition.current_participants >= competition.max_participants {
            return Err(EngineError::Conflict("competition is full".to_string()));
        }

        match entry {
            ParticipantEntry::Individual(user_id) => {
                // Both team and mixed formats take team entries only.
                if competition.format != CompetitionFormat::Individual {
                    return Err(EngineError::Validation(
                        "this competition requires a team entry".to_string(),
                    ));
                }

                let user = UserRepository::new(&self.pool)
                    .find_by_id(user_id)
                    .await
                    .map_err(|e| match e {
                        StorageError::NotFound => {
                            EngineError::NotFound("user not found".to_string())
                        }
                        other => other.into(),
                    })?;

                if user.user_id != acting_user_id {
                    let acting = UserRepository::new(&self.pool)
                        .find_by_id(acting_user_id)
                        .await
                        .map_err(|e| match e {
                            StorageError::NotFound => {
                                EngineError::NotFound("user not found".to_string())
                            }
                            other => other.into(),
                        })?;
                    let manager = acting.role == UserRole::Admin
                        || access::is_event_manager(&self.pool, competition.event_id, acting_user_id)
                            .await?;
                    if !manager {
                        return Err(EngineError::Forbidden(
                            "players may only register themselves".to_string(),
                        ));
                    }
                }
            }
            ParticipantEntry::Team(team_id) => {
                if competition.format == CompetitionFormat::Individual {
                    return Err(EngineError::Validation(
                        "this competition requires an individual entry".to_string(),
                    ));
                }

                let team = TeamRepository::new(&self.pool)
                    .find_by_id(team_id)
                    .await
                    .map_err(|e| match e {
                        StorageError::NotFound => {
                            EngineError::NotFound("team not found".to_string())
                        }
                        other => other.into(),
                    })?;
                if team.state == TeamState::Dissolved {
                    return Err(EngineError::NotFound("team not found".to_string()));
                }
                if team.event_id != competition.event_id {
                    return Err(EngineError::Conflict(
                        "team belongs to a different event".to_string(),
                    ));
                }

                let membership = TeamRepository::new(&self.pool)
                    .find_membership(team_id, acting_user_id)
                    .await?
                    .filter(|m| m.status == MembershipStatus::Active);
                if membership.is_none() {
                    return Err(EngineError::Forbidden(
                        "only an active team member may register the team".to_string(),
                    ));
                }
            }
        }

        let repo = CompetitionRepository::new(&self.pool);
        if repo.find_participant(competition_id, &entry).await?.is_some() {
            return Err(EngineError::Conflict("already registered".to_string()));
        }

        let participant = repo.register_participant(competition_id, &entry).await?;
        tracing::info!(%competition_id, participant_id = %participant.participant_id, "participant registered");
        Ok(participant)
    }

    /// Closes registration, builds the round-1 bracket from a uniform
    /// shuffle and confirms all registered participants. The shuffle draws
    /// from entropy; results are not reproducible across calls.
    pub async fn start(&self, competition_id: Uuid, acting_user_id: Uuid) -> Result<Competition> {
        let competition = self.find_competition(competition_id).await?;
        access::require_event_manager(&self.pool, competition.event_id, acting_user_id).await?;

        if competition.state != CompetitionState::Registration {
            return Err(EngineError::InvalidState(
                "only a competition in registration can be started".to_string(),
            ));
        }
        if competition.current_participants < 2 {
            return Err(EngineError::Precondition(
                "insufficient participants".to_string(),
            ));
        }

        let repo = CompetitionRepository::new(&self.pool);
        let participants = repo
            .participants_with_status(competition_id, ParticipantStatus::Registered)
            .await?;
        let ids: Vec<Uuid> = participants.iter().map(|p| p.participant_id).collect();

        let bracket = bracket::build(&ids, &mut StdRng::from_entropy());
        let competition = repo
            .start(competition_id, &serde_json::to_string(&bracket)?)
            .await?;

        tracing::info!(
            %competition_id,
            participants = ids.len(),
            rounds = bracket.total_rounds,
            "competition started"
        );
        Ok(competition)
    }

    /// Records a match outcome. Organizer, staff and admin only. Does not
    /// advance the bracket; see `advance_round`.
    pub async fn report_result(
        &self,
        competition_id: Uuid,
        acting_user_id: Uuid,
        req: &ReportResultRequest,
    ) -> Result<Bracket> {
        req.validate()?;

        let competition = self.find_competition(competition_id).await?;
        access::require_event_staff(&self.pool, competition.event_id, acting_user_id).await?;

        if competition.state != CompetitionState::InProgress {
            return Err(EngineError::InvalidState(
                "competition is not in progress".to_string(),
            ));
        }

        let mut bracket = Self::parse_bracket(&competition)?;
        let entry = bracket
            .find_match_mut(req.match_id)
            .ok_or_else(|| EngineError::NotFound("match not found in bracket".to_string()))?;
        if !entry.has_slot(req.winner_id) {
            return Err(EngineError::Validation(
                "winner is not part of this match".to_string(),
            ));
        }

        entry.winner_id = Some(req.winner_id);
        entry.score = req.score.clone();
        entry.completed = true;

        CompetitionRepository::new(&self.pool)
            .update_bracket(competition_id, &serde_json::to_string(&bracket)?)
            .await?;

        Ok(bracket)
    }

    /// Populates the next round from the current round's winners. Requires
    /// every current-round match to be reported first.
    pub async fn advance_round(
        &self,
        competition_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<Bracket> {
        let competition = self.find_competition(competition_id).await?;
        access::require_event_manager(&self.pool, competition.event_id, acting_user_id).await?;

        if competition.state != CompetitionState::InProgress {
            return Err(EngineError::InvalidState(
                "competition is not in progress".to_string(),
            ));
        }

        let mut bracket = Self::parse_bracket(&competition)?;
        if bracket.is_final_round() {
            return Err(EngineError::InvalidState(
                "the bracket is already at its final round".to_string(),
            ));
        }
        if !bracket.current_round_complete() {
            return Err(EngineError::Precondition(
                "unreported matches remain in the current round".to_string(),
            ));
        }

        bracket.advance();
        CompetitionRepository::new(&self.pool)
            .update_bracket(competition_id, &serde_json::to_string(&bracket)?)
            .await?;

        tracing::info!(%competition_id, round = bracket.current_round, "bracket advanced");
        Ok(bracket)
    }

    /// Applies the final ranking and closes the competition. Participants
    /// absent from the supplied ranking keep their current status (partial
    /// rankings are allowed).
    pub async fn finish(
        &self,
        competition_id: Uuid,
        acting_user_id: Uuid,
        ranking: &[FinalRankingEntry],
    ) -> Result<Competition> {
        for entry in ranking {
            entry.validate()?;
        }

        let competition = self.find_competition(competition_id).await?;
        access::require_event_manager(&self.pool, competition.event_id, acting_user_id).await?;

        if competition.state != CompetitionState::InProgress {
            return Err(EngineError::InvalidState(
                "only a competition in progress can be finished".to_string(),
            ));
        }

        let updates: Vec<(Uuid, i64, Option<i64>, ParticipantStatus)> = ranking
            .iter()
            .map(|entry| {
                let status = if entry.position == 1 {
                    ParticipantStatus::Winner
                } else {
                    ParticipantStatus::Eliminated
                };
                (entry.participant_id, entry.position, entry.score, status)
            })
            .collect();

        let competition = CompetitionRepository::new(&self.pool)
            .apply_final_ranking(competition_id, &updates)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => {
                    EngineError::NotFound("participant not found in this competition".to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(%competition_id, ranked = updates.len(), "competition finished");
        Ok(competition)
    }

    /// Terminal cancellation from `registration` or `in_progress`. The
    /// reason is appended to the rules text and every participant is
    /// withdrawn.
    pub async fn cancel(
        &self,
        competition_id: Uuid,
        acting_user_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Competition> {
        let competition = self.find_competition(competition_id).await?;
        access::require_event_manager(&self.pool, competition.event_id, acting_user_id).await?;

        if matches!(
            competition.state,
            CompetitionState::Finished | CompetitionState::Cancelled
        ) {
            return Err(EngineError::InvalidState(
                "competition is already closed".to_string(),
            ));
        }

        let note = match reason {
            Some(reason) => format!("[cancelled] {reason}"),
            None => "[cancelled]".to_string(),
        };
        let rules = match competition.rules.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
            _ => note,
        };

        let competition = CompetitionRepository::new(&self.pool)
            .cancel(competition_id, Some(&rules))
            .await?;

        tracing::info!(%competition_id, "competition cancelled");
        Ok(competition)
    }

    /// Stable standings, available in every state. Stored ranks come first
    /// (nulls last), then score, then registration order; unranked rows get
    /// their list position as a synthetic rank.
    pub async fn ranking(&self, competition_id: Uuid) -> Result<Vec<RankingRow>> {
        self.find_competition(competition_id).await?;

        let participants = CompetitionRepository::new(&self.pool)
            .participants_ranked(competition_id)
            .await?;

        let rows = participants
            .iter()
            .enumerate()
            .map(|(i, p)| RankingRow {
                position: p.final_rank.unwrap_or(i as i64 + 1),
                participant_id: p.participant_id,
                entry: p.entry(),
                status: p.status,
                final_rank: p.final_rank,
                total_score: p.total_score,
            })
            .collect();

        Ok(rows)
    }
}
