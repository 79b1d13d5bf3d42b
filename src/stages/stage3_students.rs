use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::heuristics::{match_student, NameMatch};
use crate::llm::RetryPolicy;
use crate::models::{NotFoundReason, Student};
use crate::store::PlacementStore;

/// Configuration for student resolution
#[derive(Debug, Clone)]
pub struct StudentConfig {
    /// Retry policy around each per-student lookup and write
    pub retry: RetryPolicy,
    /// Pause after every student, successful or not
    pub pause: Duration,
}

impl Default for StudentConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::fixed(Duration::from_millis(2000)),
            pause: Duration::from_millis(1000),
        }
    }
}

/// What happened to one extracted name
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StudentOutcome {
    /// Linked to a roster entry; `new` is false when the link already existed
    Linked { student_id: i64, ratio: f64, new: bool },
    /// Logged for manual review
    Unresolved { reason: NotFoundReason },
}

/// Tally of student outcomes for one placement record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentSummary {
    pub links_created: usize,
    pub links_existing: usize,
    pub ambiguous: usize,
    pub not_found: usize,
}

impl StudentSummary {
    fn record(&mut self, outcome: &StudentOutcome) {
        match outcome {
            StudentOutcome::Linked { new: true, .. } => self.links_created += 1,
            StudentOutcome::Linked { new: false, .. } => self.links_existing += 1,
            StudentOutcome::Unresolved {
                reason: NotFoundReason::Ambiguous,
            } => self.ambiguous += 1,
            StudentOutcome::Unresolved {
                reason: NotFoundReason::NoMatch,
            } => self.not_found += 1,
        }
    }

    pub fn merge(&mut self, other: &StudentSummary) {
        self.links_created += other.links_created;
        self.links_existing += other.links_existing;
        self.ambiguous += other.ambiguous;
        self.not_found += other.not_found;
    }
}

/// Resolve one extracted name against the roster snapshot and persist the
/// link or the diagnostic
pub async fn record_student(
    store: &dyn PlacementStore,
    roster: &[Student],
    name: &str,
    company_id: i64,
) -> Result<StudentOutcome> {
    match match_student(name, roster) {
        NameMatch::Accepted(m) => {
            let new = store.insert_link(m.student_id, company_id).await?;
            Ok(StudentOutcome::Linked {
                student_id: m.student_id,
                ratio: m.ratio,
                new,
            })
        }
        NameMatch::Ambiguous(tied) => {
            warn!(
                "Student {:?} is ambiguous between {} roster entries",
                name,
                tied.len()
            );
            store.insert_not_found(name, NotFoundReason::Ambiguous).await?;
            Ok(StudentOutcome::Unresolved {
                reason: NotFoundReason::Ambiguous,
            })
        }
        NameMatch::NoMatch => {
            warn!("Student {:?} not found on roster", name);
            store.insert_not_found(name, NotFoundReason::NoMatch).await?;
            Ok(StudentOutcome::Unresolved {
                reason: NotFoundReason::NoMatch,
            })
        }
    }
}

/// Resolve every extracted name for one placement, in extraction order.
///
/// The roster is read once for the whole list.
pub async fn resolve_students(
    store: &dyn PlacementStore,
    names: &[String],
    company_id: i64,
    config: &StudentConfig,
) -> Result<StudentSummary> {
    let roster = config
        .retry
        .run("roster snapshot", move || store.list_students())
        .await?;
    let roster = roster.as_slice();

    let mut summary = StudentSummary::default();

    for name in names {
        let name = name.as_str();
        let label = format!("student resolution [{}]", name);
        let outcome = config
            .retry
            .run(&label, move || record_student(store, roster, name, company_id))
            .await?;

        if let StudentOutcome::Linked {
            student_id, new, ..
        } = &outcome
        {
            info!(
                "Student {:?} -> roster id {} (company {}, new={})",
                name, student_id, company_id, new
            );
        }
        summary.record(&outcome);

        tokio::time::sleep(config.pause).await;
    }

    Ok(summary)
}
