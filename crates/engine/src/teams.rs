//! Team creation, joining and leadership, for events running team mode.

use rand::Rng;
use rand::distributions::Alphanumeric;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use storage::dto::team::CreateTeamRequest;
use storage::error::StorageError;
use storage::models::{MembershipStatus, Team, TeamRole, TeamState};
use storage::repository::{TeamRepository, UserRepository};

use crate::error::{EngineError, Result};
use crate::modules::{ModuleGate, ModuleKind};
use crate::sync::KeyedLock;

const INVITE_CODE_LEN: usize = 6;
const INVITE_CODE_ATTEMPTS: usize = 5;

fn invite_code<R: Rng>(rng: &mut R) -> String {
    (0..INVITE_CODE_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_uppercase())
        .collect()
}

/// Team formation state machine: forming -> full (and back), locked to
/// `active` on competition registration, `dissolved` terminal.
pub struct TeamFormation {
    pool: SqlitePool,
    gate: ModuleGate,
    /// Serializes membership-count transitions per team.
    locks: KeyedLock<Uuid>,
}

impl TeamFormation {
    pub fn new(pool: SqlitePool) -> Self {
        let gate = ModuleGate::new(pool.clone());
        Self {
            pool,
            gate,
            locks: KeyedLock::new(),
        }
    }

    /// Founds a team with the founder as sole leader. One non-dissolved team
    /// per user per event.
    pub async fn create(
        &self,
        event_id: Uuid,
        founder_id: Uuid,
        req: &CreateTeamRequest,
    ) -> Result<Team> {
        req.validate()?;

        if !self.gate.is_active(event_id, ModuleKind::TeamMode).await? {
            return Err(EngineError::Forbidden(
                "team mode is not active for this event".to_string(),
            ));
        }

        UserRepository::new(&self.pool)
            .find_by_id(founder_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EngineError::NotFound("user not found".to_string()),
                other => other.into(),
            })?;

        let team_mode = self
            .gate
            .resolved_settings(event_id, ModuleKind::TeamMode)
            .await?
            .into_team_mode();
        if req.max_members < team_mode.min_members || req.max_members > team_mode.max_members {
            return Err(EngineError::Validation(format!(
                "team size must be between {} and {} for this event",
                team_mode.min_members, team_mode.max_members
            )));
        }

        let repo = TeamRepository::new(&self.pool);
        if repo.user_team_in_event(event_id, founder_id).await?.is_some() {
            return Err(EngineError::Conflict(
                "user already belongs to a team in this event".to_string(),
            ));
        }

        // Invite codes are short; regenerate on the rare collision.
        for _ in 0..INVITE_CODE_ATTEMPTS {
            let code = invite_code(&mut rand::thread_rng());
            match repo
                .create_with_leader(event_id, &req.name, founder_id, req.max_members, &code)
                .await
            {
                Ok(team) => {
                    tracing::info!(team_id = %team.team_id, %event_id, "team created");
                    return Ok(team);
                }
                Err(StorageError::ConstraintViolation(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(%event_id, "exhausted invite code attempts");
        Err(EngineError::Internal)
    }

    /// Joins via invite code. Only `forming` teams accept new members; a
    /// full team resolves but conflicts, anything else is as good as absent.
    pub async fn join(&self, invite_code: &str, user_id: Uuid) -> Result<Team> {
        let repo = TeamRepository::new(&self.pool);
        let team = repo
            .find_by_invite_code(invite_code)
            .await?
            .ok_or_else(|| EngineError::NotFound("no team matches this invite code".to_string()))?;

        UserRepository::new(&self.pool)
            .find_by_id(user_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EngineError::NotFound("user not found".to_string()),
                other => other.into(),
            })?;

        let _guard = self.locks.acquire(team.team_id).await;
        // Re-read under the lock; the state may have moved since resolution.
        let team = repo.find_by_id(team.team_id).await?;
        match team.state {
            TeamState::Forming => {}
            TeamState::Full => {
                return Err(EngineError::Conflict("team is already full".to_string()));
            }
            TeamState::Active | TeamState::Dissolved => {
                return Err(EngineError::NotFound(
                    "no team matches this invite code".to_string(),
                ));
            }
        }

        if repo.find_membership(team.team_id, user_id).await?.is_some() {
            return Err(EngineError::Conflict(
                "already a member of this team".to_string(),
            ));
        }
        if repo.user_team_in_event(team.event_id, user_id).await?.is_some() {
            return Err(EngineError::Conflict(
                "user already belongs to a team in this event".to_string(),
            ));
        }

        let count = repo.member_count(team.team_id).await?;
        if count >= team.max_members {
            return Err(EngineError::Conflict("team is already full".to_string()));
        }

        repo.add_member(team.team_id, user_id).await?;
        if count + 1 == team.max_members {
            repo.set_state(team.team_id, TeamState::Full).await?;
        }

        Ok(repo.find_by_id(team.team_id).await?)
    }

    /// Members may leave freely; leaders must promote a replacement first or
    /// dissolve the team.
    pub async fn leave(&self, team_id: Uuid, user_id: Uuid) -> Result<()> {
        let repo = TeamRepository::new(&self.pool);
        let _guard = self.locks.acquire(team_id).await;

        let team = repo.find_by_id(team_id).await.map_err(|e| match e {
            StorageError::NotFound => EngineError::NotFound("team not found".to_string()),
            other => other.into(),
        })?;
        if matches!(team.state, TeamState::Active | TeamState::Dissolved) {
            return Err(EngineError::InvalidState(
                "team is locked into a competition or dissolved".to_string(),
            ));
        }

        let membership = repo
            .find_membership(team_id, user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("not a member of this team".to_string()))?;
        if membership.role == TeamRole::Leader {
            return Err(EngineError::InvalidState(
                "the leader must promote another member or dissolve the team".to_string(),
            ));
        }

        repo.remove_member(team_id, user_id).await?;
        if team.state == TeamState::Full {
            repo.set_state(team_id, TeamState::Forming).await?;
        }

        Ok(())
    }

    /// Swaps leadership to another active member.
    pub async fn promote(
        &self,
        team_id: Uuid,
        current_leader_id: Uuid,
        new_leader_id: Uuid,
    ) -> Result<Team> {
        let repo = TeamRepository::new(&self.pool);
        let team = repo.find_by_id(team_id).await.map_err(|e| match e {
            StorageError::NotFound => EngineError::NotFound("team not found".to_string()),
            other => other.into(),
        })?;
        if team.state == TeamState::Dissolved {
            return Err(EngineError::NotFound("team not found".to_string()));
        }
        if team.leader_id != current_leader_id {
            return Err(EngineError::Forbidden(
                "only the team leader may promote".to_string(),
            ));
        }
        if new_leader_id == current_leader_id {
            return Err(EngineError::Conflict("already the team leader".to_string()));
        }

        let target = repo
            .find_membership(team_id, new_leader_id)
            .await?
            .filter(|m| m.status == MembershipStatus::Active)
            .ok_or_else(|| {
                EngineError::NotFound("target is not an active member of this team".to_string())
            })?;
        debug_assert_eq!(target.role, TeamRole::Member);

        repo.swap_leader(team_id, current_leader_id, new_leader_id)
            .await?;
        tracing::info!(%team_id, %new_leader_id, "team leadership transferred");

        Ok(repo.find_by_id(team_id).await?)
    }

    /// Leader-only. Removes every membership and retires the team for good.
    pub async fn dissolve(&self, team_id: Uuid, leader_id: Uuid) -> Result<()> {
        let repo = TeamRepository::new(&self.pool);
        let team = repo.find_by_id(team_id).await.map_err(|e| match e {
            StorageError::NotFound => EngineError::NotFound("team not found".to_string()),
            other => other.into(),
        })?;
        if team.state == TeamState::Dissolved {
            return Err(EngineError::InvalidState(
                "team is already dissolved".to_string(),
            ));
        }
        if team.leader_id != leader_id {
            return Err(EngineError::Forbidden(
                "only the team leader may dissolve the team".to_string(),
            ));
        }

        repo.dissolve(team_id).await?;
        tracing::info!(%team_id, "team dissolved");
        Ok(())
    }
}
