pub mod competition;
pub mod event;
pub mod module_settings;
pub mod queue;
pub mod song;
pub mod team;
pub mod user;

pub use competition::CompetitionRepository;
pub use event::EventRepository;
pub use module_settings::ModuleSettingRepository;
pub use queue::QueueRepository;
pub use song::SongRepository;
pub use team::TeamRepository;
pub use user::UserRepository;
