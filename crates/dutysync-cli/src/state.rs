//! JSON state file standing in for the remote scheduling service.

use anyhow::{Context, Result};
use dutysync_engine::InMemoryRemote;
use std::fs;
use std::path::Path;

/// Load the remote from `path`, or start empty when the file does not exist yet.
pub fn load(path: &Path) -> Result<InMemoryRemote> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "state file not found, starting empty");
        return Ok(InMemoryRemote::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(InMemoryRemote::new());
    }
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse state file {}", path.display()))
}

pub fn save(path: &Path, remote: &InMemoryRemote) -> Result<()> {
    let mut text = serde_json::to_string_pretty(remote).context("failed to encode state")?;
    text.push('\n');
    fs::write(path, text)
        .with_context(|| format!("failed to write state file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "state file written");
    Ok(())
}
