pub mod gate;
pub mod registry;
pub mod settings;

pub use gate::ModuleGate;
pub use registry::{ModuleDescriptor, ModuleKind, list_modules};
pub use settings::ModuleSettings;
