//! Static catalog of the optional feature modules an event can enable.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Queue,
    Tournament,
    XpSystem,
    TeamMode,
    MusicRequests,
    Leaderboard,
    Chat,
    Voting,
}

impl ModuleKind {
    /// Catalog order is fixed and part of the public contract.
    pub const ALL: [ModuleKind; 8] = [
        ModuleKind::Queue,
        ModuleKind::Tournament,
        ModuleKind::XpSystem,
        ModuleKind::TeamMode,
        ModuleKind::MusicRequests,
        ModuleKind::Leaderboard,
        ModuleKind::Chat,
        ModuleKind::Voting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Tournament => "tournament",
            Self::XpSystem => "xp_system",
            Self::TeamMode => "team_mode",
            Self::MusicRequests => "music_requests",
            Self::Leaderboard => "leaderboard",
            Self::Chat => "chat",
            Self::Voting => "voting",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Queue => "Song-request queue with per-user quotas and cooldowns",
            Self::Tournament => "Competitions with brackets, match reporting and rankings",
            Self::XpSystem => "Experience points for queue and competition activity",
            Self::TeamMode => "Team creation and invite-code based joining",
            Self::MusicRequests => "Song suggestions outside the live queue",
            Self::Leaderboard => "Public standings for the event",
            Self::Chat => "Event chat room",
            Self::Voting => "Audience voting on performances",
        }
    }

    pub fn default_enabled(&self) -> bool {
        !matches!(self, Self::Chat | Self::Voting)
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    pub kind: ModuleKind,
    pub description: &'static str,
    pub default_enabled: bool,
}

/// The full catalog, in fixed order.
pub fn list_modules() -> impl Iterator<Item = ModuleDescriptor> {
    ModuleKind::ALL.into_iter().map(|kind| ModuleDescriptor {
        kind,
        description: kind.description(),
        default_enabled: kind.default_enabled(),
    })
}
