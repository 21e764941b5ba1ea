//! Admission control for the shared song-request queue.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use storage::dto::queue::MarkPlayedRequest;
use storage::error::StorageError;
use storage::models::{QueueEntry, QueueEntryState, UserRole};
use storage::repository::{QueueRepository, SongRepository, UserRepository};

use crate::access;
use crate::error::{EngineError, Result};
use crate::modules::{ModuleGate, ModuleKind};
use crate::sync::KeyedLock;

/// Applies quota, duplicate-suppression and cooldown rules before a song
/// request enters an event's queue.
pub struct QueueAdmission {
    pool: SqlitePool,
    gate: ModuleGate,
    /// Serializes the check-then-act window per (event, requester).
    locks: KeyedLock<(Uuid, Uuid)>,
}

impl QueueAdmission {
    pub fn new(pool: SqlitePool) -> Self {
        let gate = ModuleGate::new(pool.clone());
        Self {
            pool,
            gate,
            locks: KeyedLock::new(),
        }
    }

    /// Admission pipeline: module gate, song lookup, quota, duplicate,
    /// cooldown, insert. Concurrent submissions from one requester cannot
    /// slip past the quota together; distinct requesters proceed in
    /// parallel.
    pub async fn submit(
        &self,
        event_id: Uuid,
        requester_id: Uuid,
        song_id: Uuid,
    ) -> Result<QueueEntry> {
        if !self.gate.is_active(event_id, ModuleKind::Queue).await? {
            return Err(EngineError::Forbidden(
                "the queue module is not active for this event".to_string(),
            ));
        }

        let song = SongRepository::new(&self.pool)
            .find_by_id(song_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EngineError::NotFound("song not found".to_string()),
                other => other.into(),
            })?;
        if !song.approved {
            return Err(EngineError::InvalidState(
                "song is not yet approved for requests".to_string(),
            ));
        }

        let settings = self
            .gate
            .resolved_settings(event_id, ModuleKind::Queue)
            .await?
            .into_queue();

        let _guard = self.locks.acquire((event_id, requester_id)).await;
        let repo = QueueRepository::new(&self.pool);

        let pending = repo.count_pending(event_id, requester_id).await?;
        if pending >= settings.max_songs_per_user {
            return Err(EngineError::QuotaExceeded(format!(
                "at most {} pending requests per user",
                settings.max_songs_per_user
            )));
        }

        if !settings.allow_duplicates && repo.pending_exists_for_song(event_id, song_id).await? {
            return Err(EngineError::Conflict(
                "this song is already in the queue".to_string(),
            ));
        }

        if settings.cooldown_minutes > 0 {
            // Cooldown throttles request frequency, so it looks at the most
            // recent entry in any state; the duplicate check above is
            // pending-only.
            if let Some(last) = repo.latest_for_requester(event_id, requester_id).await? {
                let elapsed = Utc::now() - last.created_at;
                let cooldown = Duration::minutes(settings.cooldown_minutes);
                if elapsed < cooldown {
                    let wait_seconds = (cooldown - elapsed).num_seconds().max(1);
                    return Err(EngineError::RateLimited {
                        wait_minutes: (wait_seconds as u64).div_ceil(60) as i64,
                    });
                }
            }
        }

        let entry = repo.create(event_id, requester_id, song_id).await?;
        tracing::info!(%event_id, %requester_id, %song_id, entry_id = %entry.entry_id, "queue entry admitted");
        Ok(entry)
    }

    /// Organizer/admin action: transitions a pending entry to `finished`
    /// with an optional performance score. `finished` is terminal.
    pub async fn mark_played(
        &self,
        event_id: Uuid,
        entry_id: Uuid,
        acting_user_id: Uuid,
        req: &MarkPlayedRequest,
    ) -> Result<QueueEntry> {
        req.validate()?;
        access::require_event_manager(&self.pool, event_id, acting_user_id).await?;

        let repo = QueueRepository::new(&self.pool);
        let entry = repo.find_by_id(entry_id).await.map_err(|e| match e {
            StorageError::NotFound => EngineError::NotFound("queue entry not found".to_string()),
            other => other.into(),
        })?;
        if entry.event_id != event_id {
            return Err(EngineError::NotFound("queue entry not found".to_string()));
        }
        if entry.state != QueueEntryState::Pending {
            return Err(EngineError::InvalidState(
                "only pending entries can be marked played".to_string(),
            ));
        }

        Ok(repo.finish(entry_id, req.score).await?)
    }

    /// Deletes an entry in any state. Permitted for the entry's owner, the
    /// event's organizer, or an administrator.
    pub async fn remove(&self, entry_id: Uuid, acting_user_id: Uuid) -> Result<()> {
        let repo = QueueRepository::new(&self.pool);
        let entry = repo.find_by_id(entry_id).await.map_err(|e| match e {
            StorageError::NotFound => EngineError::NotFound("queue entry not found".to_string()),
            other => other.into(),
        })?;

        if entry.requester_id != acting_user_id {
            let user = UserRepository::new(&self.pool)
                .find_by_id(acting_user_id)
                .await
                .map_err(|e| match e {
                    StorageError::NotFound => EngineError::NotFound("user not found".to_string()),
                    other => other.into(),
                })?;
            let is_manager = user.role == UserRole::Admin
                || access::is_event_manager(&self.pool, entry.event_id, acting_user_id).await?;
            if !is_manager {
                return Err(EngineError::Forbidden(
                    "only the owner, the organizer or an administrator may remove this entry"
                        .to_string(),
                ));
            }
        }

        Ok(repo.delete(entry_id).await?)
    }

    /// The event's queue, pending entries first.
    pub async fn list(&self, event_id: Uuid) -> Result<Vec<QueueEntry>> {
        Ok(QueueRepository::new(&self.pool).list_for_event(event_id).await?)
    }
}
