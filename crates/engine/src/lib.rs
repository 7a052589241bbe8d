pub mod config;
pub mod engine;
pub mod selection;
pub mod store;

pub use config::SyncConfig;
pub use engine::{Engine, EngineStatus, ViewportSnapshot};
pub use selection::{SelectionFlow, SelectionState};
pub use store::ViewportStore;
