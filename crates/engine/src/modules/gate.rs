//! Per-event module activation and configuration resolution.

use sqlx::SqlitePool;
use uuid::Uuid;

use storage::error::StorageError;
use storage::models::ModuleSetting;
use storage::repository::{EventRepository, ModuleSettingRepository};

use super::registry::{self, ModuleKind};
use super::settings::ModuleSettings;
use crate::error::{EngineError, Result};

/// Decision point for "is this module on for this event, and how is it
/// configured". Resolution is two-layered: persisted override, else the
/// registry default.
#[derive(Clone)]
pub struct ModuleGate {
    pool: SqlitePool,
}

impl ModuleGate {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Seeds one settings row per registered module for a fresh event.
    ///
    /// `tournament` and `team_mode` are forced inactive regardless of their
    /// registry defaults; organizers opt into competitive features through
    /// `update`.
    pub async fn initialize(&self, event_id: Uuid) -> Result<()> {
        EventRepository::new(&self.pool)
            .find_by_id(event_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EngineError::NotFound("event not found".to_string()),
                other => other.into(),
            })?;

        let repo = ModuleSettingRepository::new(&self.pool);
        for descriptor in registry::list_modules() {
            let forced_off = matches!(descriptor.kind, ModuleKind::Tournament | ModuleKind::TeamMode);
            let active = descriptor.default_enabled && !forced_off;
            let settings = ModuleSettings::defaults(descriptor.kind).to_json()?;
            repo.upsert(event_id, descriptor.kind.as_str(), active, &settings)
                .await?;
        }

        tracing::info!(%event_id, "module settings initialized");
        Ok(())
    }

    /// Clears all persisted configuration for the event and re-seeds it.
    pub async fn reset_to_defaults(&self, event_id: Uuid) -> Result<()> {
        ModuleSettingRepository::new(&self.pool)
            .delete_for_event(event_id)
            .await?;
        self.initialize(event_id).await
    }

    /// Fails open to `false`: an event without a persisted record never has
    /// the module silently enabled.
    pub async fn is_active(&self, event_id: Uuid, module: ModuleKind) -> Result<bool> {
        let row = ModuleSettingRepository::new(&self.pool)
            .find(event_id, module.as_str())
            .await?;

        Ok(row.map(|r| r.active).unwrap_or(false))
    }

    /// Persisted settings if present and parseable, else registry defaults.
    /// Absence is not an error.
    pub async fn resolved_settings(&self, event_id: Uuid, module: ModuleKind) -> Result<ModuleSettings> {
        let row = ModuleSettingRepository::new(&self.pool)
            .find(event_id, module.as_str())
            .await?;

        let resolved = match row {
            Some(row) => match ModuleSettings::from_stored(module, &row.settings) {
                Some(settings) => settings,
                None => {
                    tracing::warn!(%event_id, module = %module, "unreadable persisted settings, using defaults");
                    ModuleSettings::defaults(module)
                }
            },
            None => ModuleSettings::defaults(module),
        };

        Ok(resolved)
    }

    /// Overwrites the persisted record. The module name must exist in the
    /// registry and the settings must deserialize into its typed struct.
    pub async fn update(
        &self,
        event_id: Uuid,
        module: &str,
        active: bool,
        settings: serde_json::Value,
    ) -> Result<ModuleSetting> {
        let kind = ModuleKind::parse(module)
            .ok_or_else(|| EngineError::NotFound(format!("unknown module '{module}'")))?;

        EventRepository::new(&self.pool)
            .find_by_id(event_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EngineError::NotFound("event not found".to_string()),
                other => other.into(),
            })?;

        let parsed = ModuleSettings::from_value(kind, settings)?;
        let row = ModuleSettingRepository::new(&self.pool)
            .upsert(event_id, kind.as_str(), active, &parsed.to_json()?)
            .await?;

        tracing::info!(%event_id, module = %kind, active, "module configuration updated");
        Ok(row)
    }

    /// The event's persisted module configuration rows.
    pub async fn list(&self, event_id: Uuid) -> Result<Vec<ModuleSetting>> {
        Ok(ModuleSettingRepository::new(&self.pool)
            .list_for_event(event_id)
            .await?)
    }
}
