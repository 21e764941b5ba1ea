//! Typed per-module configuration.
//!
//! Persisted overrides deserialize with container-level defaults, so a
//! partial JSON object merges over the built-in values and unknown fields
//! are rejected at the boundary.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::registry::ModuleKind;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct QueueSettings {
    #[validate(range(min = 1, max = 50))]
    pub max_songs_per_user: i64,
    #[validate(range(min = 0, max = 1440))]
    pub cooldown_minutes: i64,
    pub allow_duplicates: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_songs_per_user: 3,
            cooldown_minutes: 5,
            allow_duplicates: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct TournamentSettings {
    #[validate(range(min = 2, max = 128))]
    pub default_max_participants: i64,
    pub allow_team_entries: bool,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            default_max_participants: 16,
            allow_team_entries: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct XpSettings {
    #[validate(range(min = 0, max = 1000))]
    pub xp_per_request: i64,
    #[validate(range(min = 0, max = 10000))]
    pub xp_per_win: i64,
}

impl Default for XpSettings {
    fn default() -> Self {
        Self {
            xp_per_request: 10,
            xp_per_win: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct TeamModeSettings {
    #[validate(range(min = 2, max = 4))]
    pub min_members: i64,
    #[validate(range(min = 2, max = 4))]
    pub max_members: i64,
}

impl Default for TeamModeSettings {
    fn default() -> Self {
        Self {
            min_members: 2,
            max_members: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct MusicRequestsSettings {
    pub require_approval: bool,
}

impl Default for MusicRequestsSettings {
    fn default() -> Self {
        Self {
            require_approval: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct LeaderboardSettings {
    #[validate(range(min = 1, max = 100))]
    pub size: i64,
    pub public: bool,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            size: 10,
            public: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ChatSettings {
    #[validate(range(min = 0, max = 3600))]
    pub slow_mode_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct VotingSettings {
    #[validate(range(min = 1, max = 10))]
    pub votes_per_user: i64,
}

impl Default for VotingSettings {
    fn default() -> Self {
        Self { votes_per_user: 1 }
    }
}

/// Tagged union of module configurations, keyed by module name. The module
/// name lives in the `module_settings` row key, so only the inner struct is
/// serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleSettings {
    Queue(QueueSettings),
    Tournament(TournamentSettings),
    XpSystem(XpSettings),
    TeamMode(TeamModeSettings),
    MusicRequests(MusicRequestsSettings),
    Leaderboard(LeaderboardSettings),
    Chat(ChatSettings),
    Voting(VotingSettings),
}

impl ModuleSettings {
    pub fn defaults(kind: ModuleKind) -> Self {
        match kind {
            ModuleKind::Queue => Self::Queue(QueueSettings::default()),
            ModuleKind::Tournament => Self::Tournament(TournamentSettings::default()),
            ModuleKind::XpSystem => Self::XpSystem(XpSettings::default()),
            ModuleKind::TeamMode => Self::TeamMode(TeamModeSettings::default()),
            ModuleKind::MusicRequests => Self::MusicRequests(MusicRequestsSettings::default()),
            ModuleKind::Leaderboard => Self::Leaderboard(LeaderboardSettings::default()),
            ModuleKind::Chat => Self::Chat(ChatSettings::default()),
            ModuleKind::Voting => Self::Voting(VotingSettings::default()),
        }
    }

    /// Deserializes and range-validates caller-supplied configuration for
    /// `kind`. Fields left out fall back to the module's defaults.
    pub fn from_value(kind: ModuleKind, value: serde_json::Value) -> Result<Self> {
        fn parse<T>(kind: ModuleKind, value: serde_json::Value) -> Result<T>
        where
            T: serde::de::DeserializeOwned + Validate,
        {
            let parsed: T = serde_json::from_value(value).map_err(|e| {
                EngineError::Validation(format!("invalid settings for module '{kind}': {e}", kind = kind.as_str()))
            })?;
            parsed.validate()?;
            Ok(parsed)
        }

        Ok(match kind {
            ModuleKind::Queue => Self::Queue(parse(kind, value)?),
            ModuleKind::Tournament => Self::Tournament(parse(kind, value)?),
            ModuleKind::XpSystem => Self::XpSystem(parse(kind, value)?),
            ModuleKind::TeamMode => Self::TeamMode(parse(kind, value)?),
            ModuleKind::MusicRequests => Self::MusicRequests(parse(kind, value)?),
            ModuleKind::Leaderboard => Self::Leaderboard(parse(kind, value)?),
            ModuleKind::Chat => Self::Chat(parse(kind, value)?),
            ModuleKind::Voting => Self::Voting(parse(kind, value)?),
        })
    }

    /// Parses a persisted blob. `None` signals a corrupt or out-of-range
    /// record; the gate falls back to defaults in that case.
    pub fn from_stored(kind: ModuleKind, raw: &str) -> Option<Self> {
        serde_json::from_str(raw)
            .ok()
            .and_then(|value| Self::from_value(kind, value).ok())
    }

    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::Queue(s) => serde_json::to_string(s)?,
            Self::Tournament(s) => serde_json::to_string(s)?,
            Self::XpSystem(s) => serde_json::to_string(s)?,
            Self::TeamMode(s) => serde_json::to_string(s)?,
            Self::MusicRequests(s) => serde_json::to_string(s)?,
            Self::Leaderboard(s) => serde_json::to_string(s)?,
            Self::Chat(s) => serde_json::to_string(s)?,
            Self::Voting(s) => serde_json::to_string(s)?,
        };

        Ok(json)
    }

    /// Queue view of the resolved settings; defaults if the stored variant
    /// somehow disagrees with the requested module.
    pub fn into_queue(self) -> QueueSettings {
        match self {
            Self::Queue(s) => s,
            _ => QueueSettings::default(),
        }
    }

    pub fn into_team_mode(self) -> TeamModeSettings {
        match self {
            Self::TeamMode(s) => s,
            _ => TeamModeSettings::default(),
        }
    }
}
