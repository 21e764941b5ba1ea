use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::ModuleSetting;

/// Repository for per-event module configuration records
pub struct ModuleSettingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ModuleSettingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert(
        &self,
        event_id: Uuid,
        module: &str,
        active: bool,
        settings: &str,
    ) -> Result<ModuleSetting> {
        let row = ModuleSetting {
            event_id,
            module: module.to_string(),
            active,
            settings: settings.to_string(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO module_settings (event_id, module, active, settings, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (event_id, module) DO UPDATE SET
                active = excluded.active,
                settings = excluded.settings,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(row.event_id)
        .bind(&row.module)
        .bind(row.active)
        .bind(&row.settings)
        .bind(row.updated_at)
        .execute(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find(&self, event_id: Uuid, module: &str) -> Result<Option<ModuleSetting>> {
        let row = sqlx::query_as::<_, ModuleSetting>(
            r#"
            SELECT event_id, module, active, settings, updated_at
            FROM module_settings
            WHERE event_id = ? AND module = ?
            "#,
        )
        .bind(event_id)
        .bind(module)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<ModuleSetting>> {
        let rows = sqlx::query_as::<_, ModuleSetting>(
            r#"
            SELECT event_id, module, active, settings, updated_at
            FROM module_settings
            WHERE event_id = ?
            ORDER BY module
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn delete_for_event(&self, event_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM module_settings WHERE event_id = ?")
            .bind(event_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
