use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::client::{ExtractionService, LlmError};
use super::prompts::{
    build_company_match_input, build_placement_input, COMPANY_MATCH_CONTEXT, PLACEMENT_CONTEXT,
};
use super::retry::RetryPolicy;
use super::validation::{parse_company_match, parse_placement};
use crate::models::{CompanyMatch, ExtractionResult, Message};

/// Extraction client: both extraction modes behind one retry protocol.
///
/// Transport failures, rate limits and responses that fail validation are all
/// retried under the same policy; only an exhausted bounded policy surfaces
/// an error.
#[derive(Clone)]
pub struct Extractor {
    service: Arc<dyn ExtractionService>,
    policy: RetryPolicy,
}

impl Extractor {
    pub fn new(service: Arc<dyn ExtractionService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// Placement Extractor: one message in, students and company out
    pub async fn extract_placement(&self, message: &Message) -> Result<ExtractionResult> {
        let input = build_placement_input(&message.raw_text);
        let input = input.as_str();
        let label = format!("placement extraction [{}]", message.timestamp);

        let result = self
            .policy
            .run(&label, move || self.placement_once(input))
            .await?;

        debug!(
            "{}: company={:?}, {} students",
            label,
            result.company,
            result.students.len()
        );
        Ok(result)
    }

    /// Company Matcher: which existing canonical name, if any, `candidate` refers to
    pub async fn match_company(&self, existing: &[String], candidate: &str) -> Result<CompanyMatch> {
        let input = build_company_match_input(existing, candidate);
        let input = input.as_str();
        let label = format!("company match [{}]", candidate);

        self.policy
            .run(&label, move || self.company_match_once(input, existing))
            .await
    }

    async fn placement_once(&self, input: &str) -> Result<ExtractionResult, LlmError> {
        let text = self.service.classify(PLACEMENT_CONTEXT, input).await?;
        parse_placement(&text)
    }

    async fn company_match_once(
        &self,
        input: &str,
        existing: &[String],
    ) -> Result<CompanyMatch, LlmError> {
        let text = self.service.classify(COMPANY_MATCH_CONTEXT, input).await?;
        parse_company_match(&text, existing)
    }
}
