use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::info;

use crate::store::PlacementStore;

/// Layout of a roster file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RosterFormat {
    /// Comma-separated records; the second field is the student name
    Formatted,
    /// One name per line
    Plain,
}

/// Extract student names from roster file content.
///
/// Formatted rosters skip lines with fewer than three fields and lowercase the
/// name; plain rosters keep every non-blank line as written.
pub fn parse_roster(content: &str, format: RosterFormat) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| match format {
            RosterFormat::Formatted => {
                let fields: Vec<&str> = line.split(',').collect();
                if fields.len() < 3 {
                    return None;
                }
                Some(fields[1].trim().to_lowercase())
            }
            RosterFormat::Plain => Some(line.to_string()),
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Load a roster file into the store, returning the number of students added
pub async fn seed_roster(
    store: &dyn PlacementStore,
    path: &Path,
    format: RosterFormat,
) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster: {:?}", path))?;
    let names = parse_roster(&content, format);

    for name in &names {
        store
            .insert_student(name)
            .await
            .with_context(|| format!("Failed to insert student {:?}", name))?;
    }

    info!("Seeded {} students from {:?}", names.len(), path);
    Ok(names.len())
}
