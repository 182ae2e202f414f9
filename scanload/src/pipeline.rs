//! One full pass over a data directory: read, normalize, load.

use crate::config::Settings;
use anyhow::{Context, Result};
use normalize::{normalize, KeyScheme};
use scan_sqlite::{Db, LoadReport};
use scanload_core::NormalizedRecord;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("reading {}: {source}", .path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("{}: invalid JSON at line {line}: {source}", .path.display())]
    Json { path: PathBuf, line: usize, #[source] source: serde_json::Error },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub files: u64,
    pub skipped_files: u64,
    pub records: u64,
    pub skipped_records: u64,
    #[serde(flatten)]
    pub statements: LoadReport,
    pub started_at: String,
    pub finished_at: String,
    pub elapsed_secs: f64,
}

/// Normalized contents of one input file, ready for the loader.
#[derive(Debug)]
pub struct Batch {
    pub file: PathBuf,
    pub records: Vec<(usize, NormalizedRecord)>,
    pub skipped_records: u64,
    pub unreadable: bool,
}

/// Files of `dir` (symlinks followed), sorted by name.
pub fn list_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        } else {
            debug!(path = %path.display(), "not a file, skipped");
        }
    }
    files.sort();
    Ok(files)
}

/// A JSON array of records, or one record per line when the file does not
/// start with `[`.
pub fn read_records(path: &Path) -> Result<Vec<Value>, ReadError> {
    let bytes = std::fs::read(path).map_err(|source| ReadError::Io { path: path.to_path_buf(), source })?;
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'[') {
        return serde_json::from_slice(&bytes).map_err(|source| ReadError::Json { path: path.to_path_buf(), line: source.line(), source });
    }
    let mut out = Vec::new();
    for (i, line) in bytes.split(|&b| b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) { continue; }
        let v = serde_json::from_slice(line).map_err(|source| ReadError::Json { path: path.to_path_buf(), line: i + 1, source })?;
        out.push(v);
    }
    Ok(out)
}

pub fn normalize_file(path: &Path, scheme: KeyScheme, skip_malformed: bool) -> Result<Batch> {
    let mut batch = Batch { file: path.to_path_buf(), records: Vec::new(), skipped_records: 0, unreadable: false };
    let values = match read_records(path) {
        Ok(v) => v,
        Err(e @ ReadError::Json { .. }) if skip_malformed => {
            warn!(error = %e, "skipping unreadable file");
            batch.unreadable = true;
            return Ok(batch);
        }
        Err(e) => return Err(e.into()),
    };
    batch.records.reserve(values.len());
    for (index, raw) in values.iter().enumerate() {
        match normalize(raw, scheme) {
            Ok(rec) => batch.records.push((index, rec)),
            Err(e) if skip_malformed => {
                warn!(file = %path.display(), index, error = %e, "skipping malformed record");
                batch.skipped_records += 1;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("malformed record {} in {}", index, path.display())));
            }
        }
    }
    debug!(file = %path.display(), records = batch.records.len(), "normalized");
    Ok(batch)
}

fn load_batch(db: &Db, batch: &Batch, summary: &mut RunSummary) -> Result<()> {
    summary.files += 1;
    summary.skipped_records += batch.skipped_records;
    if batch.unreadable {
        summary.skipped_files += 1;
        return Ok(());
    }
    let mut report = LoadReport::default();
    for (index, record) in &batch.records {
        match db.load_record(record) {
            Ok(r) => report += r,
            Err(e) => {
                let shown = serde_json::to_string(record).unwrap_or_default();
                error!(file = %batch.file.display(), index, record = %shown, error = %e, "fatal storage error");
                return Err(anyhow::Error::new(e).context(format!("loading record {} of {}: {}", index, batch.file.display(), shown)));
            }
        }
    }
    summary.records += batch.records.len() as u64;
    summary.statements += report;
    info!(
        file = %batch.file.display(),
        records = batch.records.len(),
        inserted = report.inserted,
        already_exists = report.already_exists,
        "file has been inserted"
    );
    Ok(())
}

/// Load every file under the configured data directory. The first fatal
/// error ends the run; rows committed before it stay in the database.
pub fn run(db: &Db, settings: &Settings) -> Result<RunSummary> {
    let files = list_input_files(&settings.data_path)?;
    info!(dir = %settings.data_path.display(), files = files.len(), workers = settings.workers, "starting load");
    let start = Instant::now();
    let mut summary = RunSummary { started_at: now_rfc3339(), ..Default::default() };

    if settings.workers <= 1 {
        for file in &files {
            let batch = normalize_file(file, settings.key_scheme, settings.skip_malformed)?;
            load_batch(db, &batch, &mut summary)?;
        }
    } else {
        run_pool(db, settings, files, &mut summary)?;
    }

    summary.finished_at = now_rfc3339();
    summary.elapsed_secs = start.elapsed().as_secs_f64();
    info!(elapsed_secs = summary.elapsed_secs, "process finished");
    Ok(summary)
}

/// Worker threads read and normalize files; this thread owns the connection
/// and loads batches as they arrive.
fn run_pool(db: &Db, settings: &Settings, files: Vec<PathBuf>, summary: &mut RunSummary) -> Result<()> {
    let queue = Arc::new(Mutex::new(VecDeque::from(files)));
    let (tx, mut rx) = mpsc::channel::<Result<Batch>>(settings.workers * 2);

    let mut handles = Vec::with_capacity(settings.workers);
    for id in 0..settings.workers {
        let tx = tx.clone();
        let queue = queue.clone();
        let scheme = settings.key_scheme;
        let skip = settings.skip_malformed;
        let handle = std::thread::Builder::new()
            .name(format!("normalize-{id}"))
            .spawn(move || loop {
                let next = queue.lock().ok().and_then(|mut q| q.pop_front());
                let Some(path) = next else { break };
                let msg = normalize_file(&path, scheme, skip);
                let failed = msg.is_err();
                // a closed channel means the loader has stopped
                if tx.blocking_send(msg).is_err() || failed { break; }
            })
            .context("spawning normalize worker")?;
        handles.push(handle);
    }
    drop(tx);

    let mut outcome = Ok(());
    while let Some(msg) = rx.blocking_recv() {
        if let Err(e) = msg.and_then(|batch| load_batch(db, &batch, summary)) {
            outcome = Err(e);
            break;
        }
    }
    if outcome.is_err() {
        if let Ok(mut q) = queue.lock() { q.clear(); }
        drop(rx);
    }
    for h in handles { let _ = h.join(); }
    outcome
}
