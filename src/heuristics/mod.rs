pub mod name_match;

pub use name_match::*;
