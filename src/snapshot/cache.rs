//! Local policy cache and debug dumps
//!
//! `--save` writes each Kupo response to `{dir}/{policy_id}.json`; `--local`
//! reads it back instead of calling the indexer. Debug dumps write the
//! intermediate tables of a run as pretty JSON.

use super::error::{Result, SnapshotError};
use super::kupo::KupoMatch;
use super::source::{OwnershipRecord, SnapshotSource};
use async_trait::async_trait;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PolicyCache {
    dir: PathBuf,
}

impl PolicyCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, policy_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", policy_id))
    }

    pub fn save(&self, policy_id: &str, matches: &[KupoMatch]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(policy_id);
        fs::write(&path, serde_json::to_string_pretty(matches)?)?;

        log::debug!("Saved {} matches to {}", matches.len(), path.display());
        Ok(())
    }

    pub fn load(&self, policy_id: &str) -> Result<Vec<KupoMatch>> {
        let path = self.path_for(policy_id);
        if !path.exists() {
            return Err(SnapshotError::SourceUnavailable {
                policy_id: policy_id.to_string(),
                reason: format!("no cached snapshot at {}", path.display()),
            });
        }

        let json = fs::read_to_string(&path)?;
        let matches: Vec<KupoMatch> = serde_json::from_str(&json)?;

        log::info!("Loaded {} matches from {}", matches.len(), path.display());
        Ok(matches)
    }
}

#[async_trait]
impl SnapshotSource for PolicyCache {
    async fn fetch(&self, policy_id: &str) -> Result<Vec<OwnershipRecord>> {
        let matches = self.load(policy_id)?;
        Ok(matches.into_iter().map(OwnershipRecord::from).collect())
    }

    fn source_type(&self) -> &'static str {
        "local cache"
    }
}

/// Writes intermediate tables for inspection
#[derive(Debug, Clone)]
pub struct DebugDumper {
    dir: PathBuf,
}

impl DebugDumper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)?;

        log::debug!("Wrote {}", path.display());
        Ok(path)
    }
}
