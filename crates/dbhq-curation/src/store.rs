//! Hall-of-fame archive on disk.
//!
//! Layout: `<base>/<scope>/<stamp>_<original name>`. One flat directory per
//! scope, no index file; the directory listing is the source of truth.
//! Entries are write-once. Content is staged in a hidden `.<stamp>_<name>.part`
//! file and only linked under its final name once fully written and synced,
//! so a listing never sees a partial entry. Names starting with `.` are never
//! entries. Stamps are strictly increasing within a process and the final
//! link refuses to replace an existing file, so concurrent saves of the same
//! original name land in distinct files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info, warn};

use dbhq_core::ScopeId;

use crate::error::CurationError;

/// Attempts at finding a free name when another writer already took one.
const MAX_NAME_ATTEMPTS: usize = 8;

/// One archived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub scope: ScopeId,
    pub file_name: String,
    pub path: PathBuf,
}

pub struct CurationStore {
    base_dir: PathBuf,
    last_stamp: AtomicU64,
}

impl CurationStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            last_stamp: AtomicU64::new(0),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn scope_dir(&self, scope: &ScopeId) -> PathBuf {
        self.base_dir.join(scope.as_str())
    }

    /// Create the base directory if needed. Idempotent.
    pub async fn ensure_base_dir(&self) -> Result<(), CurationError> {
        ensure_dir(&self.base_dir).await
    }

    /// Copy `reader` to a new entry named `<stamp>_<original_name>`.
    ///
    /// The entry becomes visible only after the content is fully written.
    /// On failure the staging file is removed and nothing is retried.
    pub async fn save<R>(
        &self,
        scope: &ScopeId,
        reader: &mut R,
        original_name: &str,
    ) -> Result<ArchiveEntry, CurationError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let original = sanitize_file_name(original_name)
            .ok_or_else(|| CurationError::InvalidName(original_name.to_string()))?;
        let dir = self.scope_dir(scope);
        ensure_dir(&dir).await?;

        let (stamp, staging, mut file) = self.create_staging(&dir, &original).await?;

        let written = async {
            let bytes = tokio::io::copy(reader, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<u64, std::io::Error>(bytes)
        }
        .await;
        drop(file);

        let published = match written {
            Ok(bytes) => self
                .publish(&staging, &dir, stamp, &original)
                .await
                .map(|named| (named, bytes)),
            Err(source) => Err(CurationError::Write {
                path: staging.clone(),
                source,
            }),
        };
        remove_staging(&staging).await;

        let ((file_name, path), bytes) = published?;
        info!(scope = %scope, file = %file_name, bytes, "saved to the hall of fame");
        Ok(ArchiveEntry {
            scope: scope.clone(),
            file_name,
            path,
        })
    }

    /// Every file currently archived for `scope`. A missing directory is empty.
    pub async fn entries(&self, scope: &ScopeId) -> Result<Vec<ArchiveEntry>, CurationError> {
        let dir = self.scope_dir(scope);
        let list_err = |source| CurationError::List {
            path: dir.clone(),
            source,
        };

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(list_err(e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(list_err)? {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                debug!(path = %entry.path().display(), "skipping non-UTF-8 archive entry");
                continue;
            };
            // Staging files and other hidden files.
            if file_name.starts_with('.') {
                continue;
            }
            entries.push(ArchiveEntry {
                scope: scope.clone(),
                file_name,
                path: entry.path(),
            });
        }
        Ok(entries)
    }

    /// A uniformly random entry for `scope`, or `None` when the archive is empty.
    pub async fn sample_random(
        &self,
        scope: &ScopeId,
    ) -> Result<Option<ArchiveEntry>, CurationError> {
        let entries = self.entries(scope).await?;
        Ok(choose_entry(entries, &mut rand::thread_rng()))
    }

    /// Open a fresh hidden staging file, returning the stamp it reserved.
    async fn create_staging(
        &self,
        dir: &Path,
        original: &str,
    ) -> Result<(u64, PathBuf, tokio::fs::File), CurationError> {
        let mut last_err = None;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let stamp = self.next_stamp();
            let path = dir.join(format!(".{stamp}_{original}.part"));
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((stamp, path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "staging name taken, retrying");
                    last_err = Some((path, e));
                }
                Err(source) => return Err(CurationError::Write { path, source }),
            }
        }
        Err(name_exhausted(dir, last_err))
    }

    /// Link the finished staging file under `<stamp>_<original>`.
    ///
    /// `hard_link` fails instead of replacing an existing entry, so a name
    /// already taken by another writer moves on to a fresh stamp.
    async fn publish(
        &self,
        staging: &Path,
        dir: &Path,
        first_stamp: u64,
        original: &str,
    ) -> Result<(String, PathBuf), CurationError> {
        let mut stamp = first_stamp;
        let mut last_err = None;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = format!("{stamp}_{original}");
            let path = dir.join(&file_name);
            match tokio::fs::hard_link(staging, &path).await {
                Ok(()) => return Ok((file_name, path)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "archive name taken, retrying");
                    last_err = Some((path, e));
                    stamp = self.next_stamp();
                }
                Err(source) => return Err(CurationError::Write { path, source }),
            }
        }
        Err(name_exhausted(dir, last_err))
    }

    /// Nanosecond wall-clock stamp, bumped so it never repeats in this process.
    fn next_stamp(&self) -> u64 {
        let now = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .max(0) as u64;
        let mut prev = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_stamp.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Pick one entry uniformly at random.
pub fn choose_entry<R: Rng + ?Sized>(
    entries: Vec<ArchiveEntry>,
    rng: &mut R,
) -> Option<ArchiveEntry> {
    entries.choose(rng).cloned()
}

async fn remove_staging(staging: &Path) {
    if let Err(e) = tokio::fs::remove_file(staging).await {
        warn!(path = %staging.display(), error = %e, "failed to remove staging file");
    }
}

fn name_exhausted(dir: &Path, last_err: Option<(PathBuf, std::io::Error)>) -> CurationError {
    let (path, source) = last_err.unwrap_or_else(|| {
        (
            dir.to_path_buf(),
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "no free archive name"),
        )
    });
    CurationError::Write { path, source }
}

async fn ensure_dir(path: &Path) -> Result<(), CurationError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| CurationError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

/// Last path component of an attachment name, with separators neutralised.
fn sanitize_file_name(name: &str) -> Option<String> {
    let cleaned = name.replace('\\', "/");
    let last = cleaned.rsplit('/').next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}
