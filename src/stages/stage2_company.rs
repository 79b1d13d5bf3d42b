use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::llm::{Extractor, RetryPolicy};
use crate::store::PlacementStore;

/// What company resolution did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyOutcome {
    /// No existing company matched; a canonical row was inserted
    Created,
    /// Matched an existing company under another name; an alias row was inserted
    Aliased,
    /// The candidate already is a canonical name
    Existing,
}

/// Result of resolving one extracted company name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyResolution {
    pub company_id: i64,
    pub canonical_name: String,
    pub outcome: CompanyOutcome,
}

/// Resolve an extracted company name to a canonical company id.
///
/// Asks the company matcher whether `candidate` is one of the known canonical
/// names, then creates a company or an alias as needed. Any failure restarts
/// the whole step under `policy`.
pub async fn resolve_company(
    store: &dyn PlacementStore,
    extractor: &Extractor,
    candidate: &str,
    policy: &RetryPolicy,
) -> Result<CompanyResolution> {
    let label = format!("company resolution [{}]", candidate);
    let resolution = policy
        .run(&label, move || resolve_once(store, extractor, candidate))
        .await?;

    info!(
        "Company {:?} -> {:?} (id {}, {:?})",
        candidate, resolution.canonical_name, resolution.company_id, resolution.outcome
    );
    Ok(resolution)
}

async fn resolve_once(
    store: &dyn PlacementStore,
    extractor: &Extractor,
    candidate: &str,
) -> Result<CompanyResolution> {
    let existing: Vec<String> = store
        .list_companies()
        .await?
        .into_iter()
        .map(|c| c.canonical_name)
        .collect();

    let verdict = extractor.match_company(&existing, candidate).await?;

    match verdict.matched() {
        None => {
            // The matcher can miss an exact canonical name; reuse it rather than count a new row
            if let Some(company) = store.find_company(candidate).await? {
                return Ok(CompanyResolution {
                    company_id: company.id,
                    canonical_name: company.canonical_name,
                    outcome: CompanyOutcome::Existing,
                });
            }

            let company_id = store.insert_company(candidate).await?;
            Ok(CompanyResolution {
                company_id,
                canonical_name: candidate.to_string(),
                outcome: CompanyOutcome::Created,
            })
        }
        Some(matched) => {
            let company = store
                .find_company(matched)
                .await?
                .with_context(|| format!("Matched company {:?} vanished from store", matched))?;

            let outcome = if matched == candidate {
                CompanyOutcome::Existing
            } else {
                store.insert_alias(matched, candidate).await?;
                CompanyOutcome::Aliased
            };

            Ok(CompanyResolution {
                company_id: company.id,
                canonical_name: company.canonical_name,
                outcome,
            })
        }
    }
}
