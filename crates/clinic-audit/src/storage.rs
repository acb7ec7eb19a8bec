//! Ledger storage backends.
//!
//! Both backends stamp entries (sequence, timestamp) and write them inside a
//! single mutex-guarded critical section, so concurrent appends from many
//! requests are totally ordered and never interleave.

use crate::entry::AuditEntry;
use crate::error::AuditError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_core::AuditConfig;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Trait for ledger storage backends.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Stamp and durably store an entry, returning it as stored.
    async fn append(&self, entry: AuditEntry) -> Result<AuditEntry, AuditError>;

    /// Up to `limit` most recent entries, oldest first.
    async fn tail(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError>;
}

/// Sequence and clock state carried between appends.
#[derive(Debug, Clone, Default)]
struct Stamp {
    last_sequence: u64,
    last_recorded_at: Option<DateTime<Utc>>,
}

impl Stamp {
    fn from_last(entry: Option<&AuditEntry>) -> Self {
        Self {
            last_sequence: entry.map(|e| e.sequence).unwrap_or(0),
            last_recorded_at: entry.map(|e| e.recorded_at),
        }
    }

    /// Stamp `entry` as the next record and return the advanced state.
    /// The state is only committed once the write succeeded.
    fn next(&self, entry: &mut AuditEntry) -> Stamp {
        let now = Utc::now();
        let recorded_at = match self.last_recorded_at {
            Some(last) if last > now => last,
            _ => now,
        };
        entry.sequence = self.last_sequence + 1;
        entry.recorded_at = recorded_at;
        Stamp {
            last_sequence: entry.sequence,
            last_recorded_at: Some(recorded_at),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AuditError> {
    mutex
        .lock()
        .map_err(|e| AuditError::StorageError(format!("Failed to acquire ledger lock: {}", e)))
}

/// In-memory storage (tests and ephemeral sessions).
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    stamp: Stamp,
    entries: Vec<AuditEntry>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn append(&self, mut entry: AuditEntry) -> Result<AuditEntry, AuditError> {
        let mut state = lock(&self.state)?;
        state.stamp = state.stamp.next(&mut entry);
        state.entries.push(entry.clone());
        Ok(entry)
    }

    async fn tail(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        let state = lock(&self.state)?;
        let skip = state.entries.len().saturating_sub(limit);
        Ok(state.entries[skip..].to_vec())
    }
}

/// File storage: JSON Lines, one segment per UTC day.
///
/// Segments are named `<prefix>_YYYYMMDD.jsonl` inside the configured
/// directory. Each entry is a single line written with one `write_all`.
pub struct FileStorage {
    directory: PathBuf,
    prefix: String,
    fsync: bool,
    state: Mutex<FileState>,
}

struct FileState {
    stamp: Stamp,
    segment: Option<OpenSegment>,
}

struct OpenSegment {
    date: NaiveDate,
    file: File,
}

/// Why a record could not be written.
enum WriteFailure {
    /// Nothing of the record is left on disk.
    Clean(std::io::Error),
    /// The segment could not be restored and may hold part or all of the record.
    Stranded(std::io::Error),
}

impl OpenSegment {
    /// Append one newline-terminated record.
    ///
    /// A record left unterminated by an earlier failure is closed off first,
    /// so the new record always starts on its own line. On a failed write or
    /// sync the segment is truncated back to where the record began.
    fn write_record(&mut self, line: &[u8], fsync: bool) -> Result<(), WriteFailure> {
        if terminate_torn_line(&mut self.file).map_err(WriteFailure::Clean)? {
            tracing::warn!(segment_date = %self.date, "Terminated torn audit entry");
        }
        let start = self
            .file
            .metadata()
            .map_err(WriteFailure::Clean)?
            .len();

        let written = self
            .file
            .write_all(line)
            .and_then(|_| self.file.flush())
            .and_then(|_| if fsync { self.file.sync_data() } else { Ok(()) });
        let Err(e) = written else {
            return Ok(());
        };

        let restored = self
            .file
            .set_len(start)
            .and_then(|_| self.file.seek(SeekFrom::End(0)).map(|_| ()));
        match restored {
            Ok(()) => {
                tracing::warn!(error = %e, "Audit write failed; segment rolled back");
                Err(WriteFailure::Clean(e))
            }
            Err(undo) => {
                tracing::error!(
                    error = %e,
                    rollback_error = %undo,
                    "Audit write failed and the segment could not be rolled back"
                );
                Err(WriteFailure::Stranded(e))
            }
        }
    }
}

impl FileStorage {
    /// Open (or create) the ledger described by `config`.
    ///
    /// Recovers the last sequence number from existing segments and opens
    /// today's segment for appending. Any failure here means the ledger is
    /// not writable and is reported as [`AuditError::InitializationFailed`].
    pub fn open(config: &AuditConfig) -> Result<Self, AuditError> {
        let directory = config.directory.clone();
        fs::create_dir_all(&directory).map_err(|e| {
            AuditError::InitializationFailed(format!(
                "cannot create ledger directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        let storage = Self {
            directory,
            prefix: config.file_prefix.clone(),
            fsync: config.fsync,
            state: Mutex::new(FileState {
                stamp: Stamp::default(),
                segment: None,
            }),
        };

        let last = storage
            .read_newest(1)
            .map_err(|e| AuditError::InitializationFailed(e.to_string()))?;
        let stamp = Stamp::from_last(last.last());

        let today = Utc::now().date_naive();
        let segment = storage.open_segment(today).map_err(|e| {
            AuditError::InitializationFailed(format!(
                "cannot open ledger segment {}: {}",
                storage.segment_path(today).display(),
                e
            ))
        })?;

        {
            let mut state = lock(&storage.state)?;
            state.stamp = stamp;
            state.segment = Some(segment);
        }

        tracing::info!(
            directory = %storage.directory.display(),
            last_sequence = last.last().map(|e| e.sequence).unwrap_or(0),
            "Audit ledger opened"
        );

        Ok(storage)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the segment holding entries recorded on `date`.
    pub fn segment_path(&self, date: NaiveDate) -> PathBuf {
        self.directory
            .join(format!("{}_{}.jsonl", self.prefix, date.format("%Y%m%d")))
    }

    fn open_segment(&self, date: NaiveDate) -> std::io::Result<OpenSegment> {
        let path = self.segment_path(date);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        if terminate_torn_line(&mut file)? {
            tracing::warn!(segment = %path.display(), "Terminated torn audit entry");
        }
        Ok(OpenSegment { date, file })
    }

    /// Existing segments, newest first.
    fn segments(&self) -> std::io::Result<Vec<(NaiveDate, PathBuf)>> {
        let mut segments = Vec::new();
        for dir_entry in fs::read_dir(&self.directory)? {
            let path = dir_entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(date) = parse_segment_name(name, &self.prefix) {
                segments.push((date, path));
            }
        }
        segments.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(segments)
    }

    /// Read up to `limit` newest entries across segments, oldest first.
    fn read_newest(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut collected: Vec<AuditEntry> = Vec::new();
        for (_, path) in self.segments()? {
            let mut entries = read_segment(&path)?;
            let needed = limit - collected.len();
            let skip = entries.len().saturating_sub(needed);
            entries.drain(..skip);
            entries.append(&mut collected);
            collected = entries;
            if collected.len() >= limit {
                break;
            }
        }
        Ok(collected)
    }

    fn append_sync(&self, mut entry: AuditEntry) -> Result<AuditEntry, AuditError> {
        let mut state = lock(&self.state)?;
        let next = state.stamp.next(&mut entry);

        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let date = entry.recorded_at.date_naive();
        if state.segment.as_ref().map(|s| s.date) != Some(date) {
            let segment = self.open_segment(date).map_err(|e| {
                AuditError::LogFailed(format!(
                    "cannot open ledger segment {}: {}",
                    self.segment_path(date).display(),
                    e
                ))
            })?;
            tracing::info!(segment = %self.segment_path(date).display(), "Audit ledger rotated");
            state.segment = Some(segment);
        }

        let Some(segment) = state.segment.as_mut() else {
            return Err(AuditError::LogFailed("no open ledger segment".to_string()));
        };
        match segment.write_record(&line, self.fsync) {
            Ok(()) => {
                state.stamp = next;
                Ok(entry)
            }
            Err(WriteFailure::Clean(e)) => Err(AuditError::LogFailed(e.to_string())),
            Err(WriteFailure::Stranded(e)) => {
                // The bytes may still be on disk; never hand out this sequence again.
                state.stamp = next;
                Err(AuditError::LogFailed(e.to_string()))
            }
        }
    }

    fn tail_sync(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        // Holding the lock keeps a concurrent writer from exposing a half line.
        let _state = lock(&self.state)?;
        self.read_newest(limit)
            .map_err(|e| AuditError::QueryFailed(e.to_string()))
    }
}

#[async_trait]
impl LedgerStorage for FileStorage {
    async fn append(&self, entry: AuditEntry) -> Result<AuditEntry, AuditError> {
        self.append_sync(entry)
    }

    async fn tail(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        self.tail_sync(limit)
    }
}

/// Make sure the next append starts on a fresh line. Returns whether a
/// newline had to be written after a partial final record.
fn terminate_torn_line(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(false);
    }
    file.write_all(b"\n")?;
    file.sync_data()?;
    Ok(true)
}

fn parse_segment_name(name: &str, prefix: &str) -> Option<NaiveDate> {
    let date = name
        .strip_prefix(prefix)?
        .strip_prefix('_')?
        .strip_suffix(".jsonl")?;
    NaiveDate::parse_from_str(date, "%Y%m%d").ok()
}

/// Parse every valid entry of a segment. Unparsable lines (a torn final
/// write after a crash) are skipped with a warning.
fn read_segment(path: &Path) -> Result<Vec<AuditEntry>, AuditError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<AuditEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable audit entry on line {} of {}: {}",
                    line_num + 1,
                    path.display(),
                    e
                );
            }
        }
    }

    Ok(entries)
}
