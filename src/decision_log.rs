//! Per-run decision log
//!
//! Records every Stage-2 merge the strategy was asked about and every
//! exemplar selection, with the inputs, the intermediate similarity or
//! entropy values, and the outcome. The log is diagnostic: nothing in the
//! pipeline reads it back, and a disabled log drops records without building
//! them.
//!
//! Records are written as JSON lines, one decision per line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::hash::Hasher;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Category of Stage-2 merge decisions
pub const MERGE: &str = "merge";

/// Category of exemplar selections
pub const EXEMPLAR: &str = "exemplar";

/// A single recorded decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRecord {
    /// Microseconds since the log was created
    pub timestamp_us: u64,

    /// Decision category ("merge" or "exemplar")
    pub category: String,

    /// Decision name (the strategy, or the selection step)
    pub name: String,

    /// FNV-1a hash of `category::name::subject`
    pub decision_id: u64,

    /// Decision input (structured data)
    pub input: serde_json::Value,

    /// Decision outcome
    pub result: serde_json::Value,
}

/// Stable identifier for a decision about `subject`
///
/// # Example
/// ```
/// use libsift::decision_log::decision_id;
///
/// let id = decision_id("merge", "entropy", "c4<-c9");
/// assert_eq!(id, decision_id("merge", "entropy", "c4<-c9"));
/// assert_ne!(id, decision_id("merge", "entropy", "c4<-c8"));
/// ```
pub fn decision_id(category: &str, name: &str, subject: &str) -> u64 {
    let mut hasher = fnv::FnvHasher::default();

    hasher.write(category.as_bytes());
    hasher.write(b"::");
    hasher.write(name.as_bytes());
    hasher.write(b"::");
    hasher.write(subject.as_bytes());

    hasher.finish()
}

/// Decision record collector
#[derive(Debug)]
pub struct DecisionLog {
    records: Vec<DecisionRecord>,
    start_time: Instant,
    enabled: bool,
}

impl DecisionLog {
    /// Create a log that keeps records
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            start_time: Instant::now(),
            enabled: true,
        }
    }

    /// Create a log that ignores every record
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Callers check this before building record payloads
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(
        &mut self,
        category: &str,
        name: &str,
        subject: &str,
        input: serde_json::Value,
        result: serde_json::Value,
    ) {
        if !self.enabled {
            return;
        }
        self.records.push(DecisionRecord {
            timestamp_us: self.start_time.elapsed().as_micros() as u64,
            category: category.to_string(),
            name: name.to_string(),
            decision_id: decision_id(category, name, subject),
            input,
            result,
        });
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Records of one category, in insertion order
    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a DecisionRecord> {
        self.records
            .iter()
            .filter(move |record| record.category == category)
    }

    /// Write every record as one JSON object per line
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> Result<()> {
        for record in &self.records {
            serde_json::to_writer(&mut writer, record)
                .context("Failed to serialize decision record")?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create decision log: {}", path.display()))?;
        self.write_json_lines(BufWriter::new(file))
            .with_context(|| format!("Failed to write decision log: {}", path.display()))
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new()
    }
}
