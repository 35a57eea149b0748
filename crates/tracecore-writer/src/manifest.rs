//! Session manifest: `manifest.json`, written atomically via temp-file +
//! rename once a session closes.

use crate::error::WriteError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub id: u32,
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkingPolicyManifest {
    pub rules: Vec<String>,
    pub pre_roll_ns: u64,
    pub post_roll_ns: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropCounters {
    pub index_pool_exhausted: u64,
    pub detail_pool_exhausted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub session_id: String,
    pub pid: u32,
    pub os: String,
    pub arch: String,
    pub time_start_ns: u64,
    pub time_end_ns: u64,
    pub threads: Vec<u32>,
    pub modules: Vec<ModuleEntry>,
    pub event_count_total: u64,
    pub marking_policy: MarkingPolicyManifest,
    pub drop_counters: DropCounters,
}

impl Manifest {
    /// Serializes and writes `manifest.json` atomically: the content lands in
    /// a sibling temp file first, then an atomic rename puts it in place so a
    /// reader never observes a partially-written manifest.
    pub fn write_atomic(&self, dir: &Path) -> Result<(), WriteError> {
        let final_path = dir.join("manifest.json");
        let tmp_path = dir.join("manifest.json.tmp");
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, WriteError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
