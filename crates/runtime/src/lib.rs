pub mod debounce;
pub mod metrics;
pub mod pending;

pub use debounce::*;
pub use metrics::*;
pub use pending::*;
