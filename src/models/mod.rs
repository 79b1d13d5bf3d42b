pub mod extraction;
pub mod message;
pub mod records;

pub use extraction::*;
pub use message::*;
pub use records::*;
