//! Short ID prefix resolution for CLI show commands.
//!
//! Allows users to specify any unique prefix of an analysis UUID instead of
//! the full ID, similar to git short hashes.

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::domain::ports::HistoryRepository;

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        bail!("ID prefix must not be empty");
    }
    if !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        bail!("Invalid ID prefix '{prefix}': must contain only hex characters and dashes");
    }
    Ok(())
}

/// Resolve an analysis ID prefix against the stored history.
pub async fn resolve_analysis_id(history: &dyn HistoryRepository, prefix: &str) -> Result<Uuid> {
    // Fast path: a full UUID needs no lookup
    if let Ok(uuid) = Uuid::parse_str(prefix) {
        return Ok(uuid);
    }

    validate_prefix(prefix)?;
    let prefix = prefix.to_lowercase();

    let matches: Vec<Uuid> = history
        .list()
        .await?
        .into_iter()
        .map(|item| item.id)
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => bail!("No analysis found matching prefix '{prefix}'"),
        [id] => Ok(*id),
        _ => bail!(
            "Ambiguous prefix '{prefix}' matches {} analyses; use a longer prefix",
            matches.len()
        ),
    }
}
