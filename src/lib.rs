pub mod heuristics;
pub mod io;
pub mod llm;
pub mod models;
pub mod stages;
pub mod store;

pub use heuristics::{match_student, NameMatch};
pub use io::{decode_transcript, read_transcript, PlacementReport, RosterFormat};
pub use llm::{AnthropicClient, AnthropicConfig, ExtractionService, Extractor, LlmError, RetryPolicy};
pub use models::{CompanyMatch, ExtractionResult, Message, MessageBatch};
pub use stages::{
    filter_messages, segment_transcript, select_batch, FilterConfig, Pipeline, PipelineConfig,
    PipelineReport, StudentConfig,
};
pub use store::{PlacementStore, SqliteStore};
