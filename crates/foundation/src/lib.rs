pub mod period;
pub mod viewport;
pub mod zoom;

// Foundation crate: small, well-tested primitives only.
pub use period::*;
pub use viewport::*;
pub use zoom::*;
