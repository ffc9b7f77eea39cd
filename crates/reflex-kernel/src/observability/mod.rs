//! Observability - dispatch counters and the decision log.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kernel::{Channel, TaskId};

/// Lock-free pipeline counters.
#[derive(Debug, Default)]
pub struct DispatchStats {
    dispatched: AtomicU64,
    dropped: AtomicU64,
    cancelled: AtomicU64,
    inference_failures: AtomicU64,
    decided: AtomicU64,
    applied: AtomicU64,
}

impl DispatchStats {
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self, count: u64) {
        self.cancelled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_inference_failure(&self) {
        self.inference_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decided(&self) {
        self.decided.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            inference_failures: self.inference_failures.load(Ordering::Relaxed),
            decided: self.decided.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub dispatched: u64,
    pub dropped: u64,
    pub cancelled: u64,
    pub inference_failures: u64,
    pub decided: u64,
    pub applied: u64,
}

impl StatsSnapshot {
    pub fn summary(&self) -> String {
        format!(
            "Dispatched: {}, Dropped: {}, Cancelled: {}, Failures: {}, Decided: {}, Applied: {}",
            self.dispatched,
            self.dropped,
            self.cancelled,
            self.inference_failures,
            self.decided,
            self.applied
        )
    }
}

/// One resolved decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub timestamp: DateTime<Utc>,
    pub session: Uuid,
    pub task_id: TaskId,
    pub channel: Channel,
    pub generation: u64,
    /// Raw model output; absent when inference failed.
    pub action_id: Option<u32>,
    pub action: String,
    /// Why the decision fell back to `idle`, if it did.
    #[serde(default)]
    pub fallback: Option<String>,
    /// Model input, lossily decoded as UTF-8.
    pub input: String,
}

/// Append-only JSONL log of decisions.
///
/// The file is opened on the first record and kept open for the rest of the
/// session.
pub struct DecisionLog {
    path: PathBuf,
    session: Uuid,
    file: Mutex<Option<File>>,
}

impl DecisionLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            session: Uuid::new_v4(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Session id stamped on every record written by this log.
    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Append a record as one line.
    pub fn emit(&self, record: &DecisionRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut guard = self
            .file
            .lock()
            .map_err(|_| anyhow!("decision log lock poisoned"))?;
        let file = match guard.take() {
            Some(file) => file,
            None => self.open()?,
        };
        let file = guard.insert(file);
        file.write_all(line.as_bytes())?;

        Ok(())
    }

    fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(file)
    }

    /// Read the last `limit` records; unreadable lines are skipped.
    pub fn read_recent(&self, limit: usize) -> Vec<DecisionRecord> {
        read_recent(&self.path, limit)
    }
}

/// Read the last `limit` records of a decision log file.
pub fn read_recent(path: &Path, limit: usize) -> Vec<DecisionRecord> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return Vec::new(),
    };

    let reader = BufReader::new(file);
    let mut records: Vec<DecisionRecord> = reader
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect();

    // Return last N records
    if records.len() > limit {
        records.drain(0..records.len() - limit);
    }

    records
}
