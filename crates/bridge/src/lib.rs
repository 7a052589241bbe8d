pub mod channel;
pub mod payload;
pub mod protocol;

pub use channel::*;
pub use payload::*;
pub use protocol::*;
