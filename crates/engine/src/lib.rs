//! Event feature-gating and competition lifecycle engine.
//!
//! The engine decides which optional modules are active per event and under
//! what configuration, enforces admission control on the shared song-request
//! queue, and drives competitions and teams through their lifecycles. It sits
//! between the (out-of-scope) HTTP layer and the `storage` crate.

mod access;

pub mod competitions;
pub mod error;
pub mod modules;
pub mod queue;
pub mod sync;
pub mod teams;

pub use competitions::CompetitionLifecycle;
pub use error::{EngineError, Result};
pub use modules::gate::ModuleGate;
pub use queue::QueueAdmission;
pub use teams::TeamFormation;
