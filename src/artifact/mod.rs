use crate::models::ScrapeOutput;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persists the cycle output as a JSON document. Each write replaces the file
/// wholesale; there is no append or merge.
pub struct ArtifactWriter {
    path: PathBuf,
}

impl ArtifactWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, output: &ScrapeOutput) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create dir {:?}", parent))?;
            }
        }

        let json = serde_json::to_string_pretty(output).context("Serialize output")?;

        // Write to a sibling temp file then rename, so readers of the artifact
        // never observe a half-written document.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("Write {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Replace {:?}", self.path))?;

        debug!("Wrote {} items to {:?}", output.total_items, self.path);
        Ok(())
    }
}
