use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-event, per-module configuration record. `settings` holds the JSON
/// serialization of the module's typed settings struct; the engine owns
/// (de)serialization and validation of that blob.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModuleSetting {
    pub event_id: Uuid,
    pub module: String,
    pub active: bool,
    pub settings: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
