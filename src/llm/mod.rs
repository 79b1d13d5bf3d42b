pub mod client;
pub mod extractor;
pub mod prompts;
pub mod retry;
pub mod validation;

pub use client::*;
pub use extractor::*;
pub use prompts::*;
pub use retry::*;
pub use validation::*;
