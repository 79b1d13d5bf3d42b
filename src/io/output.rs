use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{NotFoundReason, NotFoundStudent, Placement, Student};
use crate::store::PlacementStore;

/// Snapshot of placement state for review
#[derive(Debug, Clone, Serialize)]
pub struct PlacementReport {
    pub placements: Vec<Placement>,
    pub unplaced: Vec<Student>,
    pub not_found: Vec<NotFoundStudent>,
}

impl PlacementReport {
    /// Read the current state from the store
    pub async fn load(store: &dyn PlacementStore) -> Result<Self> {
        Ok(Self {
            placements: store.list_placements().await?,
            unplaced: store.list_unplaced().await?,
            not_found: store.list_not_found().await?,
        })
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }

    /// Format as human-readable text
    pub fn format(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Placed students ({})\n", self.placements.len()));
        output.push_str("-------------------\n");
        for p in &self.placements {
            output.push_str(&format!("{:<32} {}\n", p.student_name, p.company_name));
        }
        output.push('\n');

        output.push_str(&format!("Unplaced students ({})\n", self.unplaced.len()));
        output.push_str("---------------------\n");
        for s in &self.unplaced {
            output.push_str(&format!("{}\n", s.name));
        }
        output.push('\n');

        output.push_str(&format!("Needs review ({})\n", self.not_found.len()));
        output.push_str("----------------\n");
        for n in &self.not_found {
            let reason = match n.reason {
                NotFoundReason::Ambiguous => "ambiguous",
                NotFoundReason::NoMatch => "no match",
            };
            output.push_str(&format!("{:<32} {}\n", n.name, reason));
        }

        output
    }

    /// Write to a text file
    pub fn write_text(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        write!(file, "{}", self.format())?;
        Ok(())
    }
}
