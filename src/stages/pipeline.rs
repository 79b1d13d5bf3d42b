use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use super::stage1_filter::{select_batch, FilterConfig};
use super::stage2_company::{resolve_company, CompanyOutcome};
use super::stage3_students::{resolve_students, StudentConfig, StudentSummary};
use crate::llm::{Extractor, RetryPolicy};
use crate::models::{Message, MessageBatch};
use crate::store::PlacementStore;

/// Configuration for the pipeline orchestrator
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum messages processed per run, counted after filtering
    pub batch_size: usize,
    /// Watermark used when no checkpoint has been saved yet
    pub initial_watermark: NaiveDateTime,
    /// Replaces the stored checkpoint for this run when set
    pub watermark_override: Option<NaiveDateTime>,
    /// Checkpoint row holding the watermark
    pub checkpoint: String,
    /// Administrative notice markers
    pub filter: FilterConfig,
    /// Retry policy for company resolution and checkpoint writes
    pub store_retry: RetryPolicy,
    /// Student resolution settings
    pub students: StudentConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            initial_watermark: NaiveDateTime::MIN,
            watermark_override: None,
            checkpoint: "transcript".to_string(),
            filter: FilterConfig::default(),
            store_retry: RetryPolicy::fixed(Duration::from_millis(1000)),
            students: StudentConfig::default(),
        }
    }
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub watermark_before: Option<NaiveDateTime>,
    pub watermark_after: Option<NaiveDateTime>,
    /// Messages taken into this batch
    pub scheduled: usize,
    /// Eligible messages left for a later run
    pub deferred: usize,
    /// Messages fully processed
    pub processed: usize,
    /// Processed messages that announced a placement
    pub placements_found: usize,
    pub companies_created: usize,
    pub aliases_created: usize,
    pub students: StudentSummary,
    /// Why the batch stopped early, if it did
    pub halted: Option<String>,
}

/// The override if set, else the stored checkpoint, else the initial watermark
pub async fn effective_watermark(
    store: &dyn PlacementStore,
    config: &PipelineConfig,
) -> Result<NaiveDateTime> {
    if let Some(forced) = config.watermark_override {
        return Ok(forced);
    }

    let checkpoint = config.checkpoint.as_str();
    let stored = config
        .store_retry
        .run("load checkpoint", move || store.load_watermark(checkpoint))
        .await?;

    Ok(stored.unwrap_or(config.initial_watermark))
}

/// What processing one message produced
#[derive(Debug, Clone, Default)]
struct MessageOutcome {
    placement: bool,
    company: Option<CompanyOutcome>,
    students: StudentSummary,
}

/// Drives segmentation, filtering, extraction and resolution for one upload
pub struct Pipeline {
    store: Arc<dyn PlacementStore>,
    extractor: Extractor,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(store: Arc<dyn PlacementStore>, extractor: Extractor, config: PipelineConfig) -> Self {
        Self {
            store,
            extractor,
            config,
        }
    }

    /// Watermark in effect for the next run
    pub async fn current_watermark(&self) -> Result<NaiveDateTime> {
        effective_watermark(self.store.as_ref(), &self.config).await
    }

    /// Select the messages one run would process, without processing them
    pub async fn plan(&self, transcript: &str) -> Result<MessageBatch> {
        let watermark = self.current_watermark().await?;
        select_batch(
            transcript,
            watermark,
            &self.config.filter,
            self.config.batch_size,
        )
    }

    /// Plan and process a transcript
    pub async fn run(&self, transcript: &str) -> Result<PipelineReport> {
        let batch = self.plan(transcript).await?;
        self.process_batch(&batch).await
    }

    /// Process a planned batch message by message.
    ///
    /// The checkpoint advances after each fully processed message, but never
    /// to the timestamp of a message that is still pending. If a bounded retry
    /// policy gives up, the batch stops there and the failed message stays
    /// above the watermark for the next run.
    pub async fn process_batch(&self, batch: &MessageBatch) -> Result<PipelineReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("pipeline", run_id = %run_id);

        async move {
            let mut watermark = self.current_watermark().await?;
            let mut report = PipelineReport {
                run_id: run_id.clone(),
                watermark_before: Some(watermark),
                watermark_after: Some(watermark),
                scheduled: batch.len(),
                deferred: batch.deferred(),
                ..Default::default()
            };

            info!("Processing {} messages after {}", batch.len(), watermark);

            for (index, message) in batch.messages.iter().enumerate() {
                debug!("Message {} at {}", index + 1, message.timestamp);
                let outcome = match self.process_message(message).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Halting batch at message {}: {:#}", index + 1, e);
                        report.halted = Some(format!("{:#}", e));
                        break;
                    }
                };

                if let Some(checkpoint) = batch.checkpoint_after(index) {
                    if checkpoint > watermark {
                        if let Err(e) = self.save_watermark(checkpoint).await {
                            warn!("Halting batch, checkpoint not saved: {:#}", e);
                            report.halted = Some(format!("{:#}", e));
                            break;
                        }
                        watermark = checkpoint;
                    }
                }

                report.processed += 1;
                report.watermark_after = Some(watermark);
                if outcome.placement {
                    report.placements_found += 1;
                }
                match outcome.company {
                    Some(CompanyOutcome::Created) => report.companies_created += 1,
                    Some(CompanyOutcome::Aliased) => report.aliases_created += 1,
                    _ => {}
                }
                report.students.merge(&outcome.students);
            }

            info!(
                "Run complete: {}/{} processed, {} placements, {} links created, {} ambiguous, {} not found",
                report.processed,
                report.scheduled,
                report.placements_found,
                report.students.links_created,
                report.students.ambiguous,
                report.students.not_found
            );

            Ok::<PipelineReport, anyhow::Error>(report)
        }
        .instrument(span)
        .await
    }

    async fn process_message(&self, message: &Message) -> Result<MessageOutcome> {
        let extraction = self.extractor.extract_placement(message).await?;

        if !extraction.is_placement() {
            return Ok(MessageOutcome::default());
        }

        let store = self.store.as_ref();

        // The company row must exist before any link references it
        let company = resolve_company(
            store,
            &self.extractor,
            &extraction.company,
            &self.config.store_retry,
        )
        .await?;

        let students = resolve_students(
            store,
            &extraction.students,
            company.company_id,
            &self.config.students,
        )
        .await?;

        Ok(MessageOutcome {
            placement: true,
            company: Some(company.outcome),
            students,
        })
    }

    async fn save_watermark(&self, watermark: NaiveDateTime) -> Result<()> {
        let store = self.store.as_ref();
        let checkpoint = self.config.checkpoint.as_str();
        self.config
            .store_retry
            .run("save checkpoint", move || store.save_watermark(checkpoint, watermark))
            .await
    }
}
