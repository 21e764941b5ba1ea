pub mod competition;
pub mod competition_participant;
pub mod event;
pub mod module_setting;
pub mod queue_entry;
pub mod song;
pub mod team;
pub mod team_membership;
pub mod user;

pub use competition::{Competition, CompetitionFormat, CompetitionState};
pub use competition_participant::{
    CompetitionParticipant, ParticipantEntry, ParticipantKind, ParticipantStatus,
};
pub use event::Event;
pub use module_setting::ModuleSetting;
pub use queue_entry::{QueueEntry, QueueEntryState};
pub use song::Song;
pub use team::{Team, TeamState};
pub use team_membership::{MembershipStatus, TeamMembership, TeamRole};
pub use user::{User, UserRole};
