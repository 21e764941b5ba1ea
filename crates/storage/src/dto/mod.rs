pub mod competition;
pub mod queue;
pub mod team;
