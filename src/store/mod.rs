pub mod sqlite;

pub use sqlite::*;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::models::{Company, NotFoundReason, NotFoundStudent, Placement, Student};

/// Relational store boundary used by the pipeline.
///
/// Every method is a single statement (or a read followed by one write) with no
/// transaction spanning calls; callers retry individual operations.
#[async_trait]
pub trait PlacementStore: Send + Sync {
    /// All canonical companies
    async fn list_companies(&self) -> Result<Vec<Company>>;

    /// Insert a canonical company, returning its id (existing id on conflict)
    async fn insert_company(&self, canonical_name: &str) -> Result<i64>;

    /// Look up a canonical company by exact name
    async fn find_company(&self, canonical_name: &str) -> Result<Option<Company>>;

    /// Record `alias_name` for the company whose canonical name is given.
    /// Returns false if the alias already existed.
    async fn insert_alias(&self, canonical_name: &str, alias_name: &str) -> Result<bool>;

    /// Resolve a name through canonical names and aliases
    async fn resolve_company_id(&self, name: &str) -> Result<Option<i64>>;

    /// Full roster snapshot
    async fn list_students(&self) -> Result<Vec<Student>>;

    /// Add a roster entry
    async fn insert_student(&self, name: &str) -> Result<i64>;

    /// Link a student to a company. Returns false if the link already existed.
    async fn insert_link(&self, student_id: i64, company_id: i64) -> Result<bool>;

    /// Log a name for manual follow-up; the first write for a name wins
    async fn insert_not_found(&self, name: &str, reason: NotFoundReason) -> Result<bool>;

    /// Last processed message time for the named checkpoint
    async fn load_watermark(&self, checkpoint: &str) -> Result<Option<NaiveDateTime>>;

    async fn save_watermark(&self, checkpoint: &str, watermark: NaiveDateTime) -> Result<()>;

    /// Students joined with their companies
    async fn list_placements(&self) -> Result<Vec<Placement>>;

    /// Roster entries with no company link
    async fn list_unplaced(&self) -> Result<Vec<Student>>;

    async fn list_not_found(&self) -> Result<Vec<NotFoundStudent>>;
}
