//! Role/relationship checks shared by the lifecycle services.

use sqlx::SqlitePool;
use uuid::Uuid;

use storage::error::StorageError;
use storage::models::{Event, User, UserRole};
use storage::repository::{EventRepository, UserRepository};

use crate::error::{EngineError, Result};

async fn load_event_and_user(pool: &SqlitePool, event_id: Uuid, user_id: Uuid) -> Result<(Event, User)> {
    let event = EventRepository::new(pool)
        .find_by_id(event_id)
        .await
        .map_err(|e| match e {
            StorageError::NotFound => EngineError::NotFound("event not found".to_string()),
            other => other.into(),
        })?;
    let user = UserRepository::new(pool)
        .find_by_id(user_id)
        .await
        .map_err(|e| match e {
            StorageError::NotFound => EngineError::NotFound("user not found".to_string()),
            other => other.into(),
        })?;

    Ok((event, user))
}

/// The acting user must be the event's organizer or an administrator.
pub(crate) async fn require_event_manager(
    pool: &SqlitePool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Event> {
    let (event, user) = load_event_and_user(pool, event_id, user_id).await?;

    if event.organizer_id == user.user_id || user.role == UserRole::Admin {
        Ok(event)
    } else {
        Err(EngineError::Forbidden(
            "requires the event organizer or an administrator".to_string(),
        ))
    }
}

/// As `require_event_manager`, but staff accounts also qualify.
pub(crate) async fn require_event_staff(
    pool: &SqlitePool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Event> {
    let (event, user) = load_event_and_user(pool, event_id, user_id).await?;

    if event.organizer_id == user.user_id
        || matches!(user.role, UserRole::Admin | UserRole::Staff)
    {
        Ok(event)
    } else {
        Err(EngineError::Forbidden(
            "requires organizer, staff or administrator".to_string(),
        ))
    }
}

/// Whether this user may act on someone else's behalf for the event.
pub(crate) async fn is_event_manager(
    pool: &SqlitePool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<bool> {
    Ok(require_event_manager(pool, event_id, user_id).await.map(|_| true)
        .or_else(|e| match e {
            EngineError::Forbidden(_) => Ok(false),
            other => Err(other),
        })?)
}
