//! Archive sink contract and file-system implementation.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Failure to archive one artifact.
#[derive(Debug)]
pub enum ArchiveError {
    /// Archival is not configured for this sink.
    Disabled,
    /// Identifier would escape the base directory or is empty.
    InvalidIdentifier(String),
    Io { path: PathBuf, source: io::Error },
}

impl Display for ArchiveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "archival is disabled"),
            Self::InvalidIdentifier(value) => write!(f, "invalid archive identifier `{value}`"),
            Self::Io { path, source } => {
                write!(f, "failed to archive `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ArchiveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Destination for archived artifacts.
pub trait ArchiveSink: Send + Sync {
    /// Stores `bytes` under `identifier` and returns the final location.
    fn store(&self, identifier: &str, bytes: &[u8]) -> ArchiveResult<PathBuf>;
}

/// Sink used when no archive location is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledArchiveSink;

impl ArchiveSink for DisabledArchiveSink {
    fn store(&self, _identifier: &str, _bytes: &[u8]) -> ArchiveResult<PathBuf> {
        Err(ArchiveError::Disabled)
    }
}

/// Writes artifacts as files under one base directory.
#[derive(Debug, Clone)]
pub struct FsArchiveSink {
    base_dir: PathBuf,
}

impl FsArchiveSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl ArchiveSink for FsArchiveSink {
    /// # Invariants
    /// - Identical existing content is left untouched.
    /// - New content goes through a sibling temp file and a rename, so readers
    ///   never observe a half-written SVG.
    fn store(&self, identifier: &str, bytes: &[u8]) -> ArchiveResult<PathBuf> {
        validate_identifier(identifier)?;
        let path = self.base_dir.join(identifier);

        if let Ok(existing) = std::fs::read(&path) {
            if existing == bytes {
                return Ok(path);
            }
        }

        let io_err = |source| ArchiveError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.base_dir).map_err(io_err)?;
        let staging = self
            .base_dir
            .join(format!(
                ".{identifier}.{}.{}.tmp",
                std::process::id(),
                STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
            ));
        std::fs::write(&staging, bytes).map_err(io_err)?;
        if let Err(source) = std::fs::rename(&staging, &path) {
            let _ = std::fs::remove_file(&staging);
            return Err(io_err(source));
        }
        Ok(path)
    }
}

fn validate_identifier(identifier: &str) -> ArchiveResult<()> {
    let valid = !identifier.is_empty()
        && !identifier.starts_with('.')
        && identifier
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ArchiveError::InvalidIdentifier(identifier.to_string()))
    }
}
