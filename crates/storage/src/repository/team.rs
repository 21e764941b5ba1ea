use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Result, StorageError, is_unique_violation};
use crate::models::{MembershipStatus, Team, TeamMembership, TeamRole, TeamState};

/// Repository for teams and their memberships
pub struct TeamRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TeamRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the team together with the founder's leader membership in one
    /// transaction. A duplicate invite code surfaces as ConstraintViolation
    /// so the caller can regenerate and retry.
    pub async fn create_with_leader(
        &self,
        event_id: Uuid,
        name: &str,
        founder_id: Uuid,
        max_members: i64,
        invite_code: &str,
    ) -> Result<Team> {
        let team = Team {
            team_id: Uuid::new_v4(),
            event_id,
            name: name.to_string(),
            leader_id: founder_id,
            max_members,
            invite_code: invite_code.to_string(),
            state: TeamState::Forming,
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO teams (team_id, event_id, name, leader_id, max_members, invite_code, state, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(team.team_id)
        .bind(team.event_id)
        .bind(&team.name)
        .bind(team.leader_id)
        .bind(team.max_members)
        .bind(&team.invite_code)
        .bind(team.state)
        .bind(team.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::ConstraintViolation("Invite code already exists".to_string())
            } else {
                StorageError::from(e)
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO team_memberships (team_id, user_id, role, status, joined_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(team.team_id)
        .bind(founder_id)
        .bind(TeamRole::Leader)
        .bind(MembershipStatus::Active)
        .bind(team.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(team)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Team> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT team_id, event_id, name, leader_id, max_members, invite_code, state, created_at
            FROM teams
            WHERE team_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)
    }

    pub async fn find_by_invite_code(&self, invite_code: &str) -> Result<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT team_id, event_id, name, leader_id, max_members, invite_code, state, created_at
            FROM teams
            WHERE invite_code = ?
            "#,
        )
        .bind(invite_code)
        .fetch_optional(self.pool)
        .await?;

        Ok(team)
    }

    pub async fn find_membership(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TeamMembership>> {
        let membership = sqlx::query_as::<_, TeamMembership>(
            r#"
            SELECT team_id, user_id, role, status, joined_at
            FROM team_memberships
            WHERE team_id = ? AND user_id = ?
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(membership)
    }

    pub async fn member_count(&self, team_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM team_memberships
            WHERE team_id = ? AND status = ?
            "#,
        )
        .bind(team_id)
        .bind(MembershipStatus::Active)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// The non-dissolved team (if any) the user actively belongs to within
    /// this event. Users hold at most one active membership per event.
    pub async fn user_team_in_event(&self, event_id: Uuid, user_id: Uuid) -> Result<Option<Uuid>> {
        let team_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT t.team_id
            FROM teams t
            INNER JOIN team_memberships m ON m.team_id = t.team_id
            WHERE t.event_id = ? AND m.user_id = ? AND m.status = ? AND t.state <> ?
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(MembershipStatus::Active)
        .bind(TeamState::Dissolved)
        .fetch_optional(self.pool)
        .await?;

        Ok(team_id)
    }

    pub async fn add_member(&self, team_id: Uuid, user_id: Uuid) -> Result<TeamMembership> {
        let membership = TeamMembership {
            team_id,
            user_id,
            role: TeamRole::Member,
            status: MembershipStatus::Active,
            joined_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO team_memberships (team_id, user_id, role, status, joined_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(membership.team_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.status)
        .bind(membership.joined_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::ConstraintViolation("Already a member of this team".to_string())
            } else {
                StorageError::from(e)
            }
        })?;

        Ok(membership)
    }

    pub async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM team_memberships
            WHERE team_id = ? AND user_id = ?
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    pub async fn set_state(&self, team_id: Uuid, state: TeamState) -> Result<()> {
        let result = sqlx::query("UPDATE teams SET state = ? WHERE team_id = ?")
            .bind(state)
            .bind(team_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    /// Atomically demotes the old leader, promotes the new one and repoints
    /// `teams.leader_id`.
    pub async fn swap_leader(
        &self,
        team_id: Uuid,
        old_leader_id: Uuid,
        new_leader_id: Uuid,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE team_memberships SET role = ?
            WHERE team_id = ? AND user_id = ?
            "#,
        )
        .bind(TeamRole::Member)
        .bind(team_id)
        .bind(old_leader_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE team_memberships SET role = ?
            WHERE team_id = ? AND user_id = ?
            "#,
        )
        .bind(TeamRole::Leader)
        .bind(team_id)
        .bind(new_leader_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE teams SET leader_id = ? WHERE team_id = ?")
            .bind(new_leader_id)
            .bind(team_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Removes every membership and marks the team dissolved (terminal).
    pub async fn dissolve(&self, team_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM team_memberships WHERE team_id = ?")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE teams SET state = ? WHERE team_id = ?")
            .bind(TeamState::Dissolved)
            .bind(team_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
