use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Result, StorageError, is_unique_violation};
use crate::models::{User, UserRole};

/// Repository for User database operations
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, username: &str, role: UserRole) -> Result<User> {
        let user = User {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            role,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, role, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(user.role)
        .bind(user.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::ConstraintViolation("Username already exists".to_string())
            } else {
                StorageError::from(e)
            }
        })?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, role, created_at
            FROM users
            WHERE user_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)
    }
}
