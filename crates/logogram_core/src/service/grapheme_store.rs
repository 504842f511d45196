//! Grapheme store: get-or-create with single-flight creation.
//!
//! # Responsibility
//! - Resolve a word to its one persisted `Grapheme`, creating it on first use.
//! - Archive standalone grapheme SVGs.
//!
//! # Invariants
//! - First writer wins: a stored record is returned unchanged, whatever
//!   parameters later callers pass.
//! - Within one process at most one creation runs per key; concurrent callers
//!   for that key wait for it and receive its record. Across processes the
//!   repository's insert-if-absent settles the race.
//! - Callers for different keys never wait on each other's creation.
//! - The store is the only writer of grapheme records.

use crate::archive::sink::{ArchiveError, ArchiveResult, ArchiveSink};
use crate::model::grapheme::{normalize_key, Grapheme};
use crate::model::params::ParameterVector;
use crate::repo::grapheme_repo::{GraphemeRepository, RepoError};
use crate::svg::serializer::render_grapheme;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const DEFAULT_CREATE_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure. Every variant means the record could not be served.
#[derive(Debug)]
pub enum StoreError {
    /// Backend read or write failed.
    StorageUnavailable(RepoError),
    /// Waited too long for another caller's in-flight creation.
    ConcurrentCreateTimeout { waited: Duration },
    /// The in-flight creation this caller waited on failed.
    CreationFailed(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable(err) => write!(f, "grapheme storage unavailable: {err}"),
            Self::ConcurrentCreateTimeout { waited } => write!(
                f,
                "timed out after {}ms waiting for concurrent grapheme creation",
                waited.as_millis()
            ),
            Self::CreationFailed(message) => {
                write!(f, "concurrent grapheme creation failed: {message}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::StorageUnavailable(value)
    }
}

/// Outcome counts of an administrative archive run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub archived: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
enum FlightState {
    Pending,
    Done(Grapheme),
    Failed(String),
}

/// One in-flight creation that waiters can block on.
#[derive(Debug)]
struct Flight {
    state: Mutex<FlightState>,
    ready: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Pending),
            ready: Condvar::new(),
        }
    }

    fn finish(&self, outcome: FlightState) {
        let mut state = lock(&self.state);
        if matches!(*state, FlightState::Pending) {
            *state = outcome;
        }
        self.ready.notify_all();
    }

    /// Returns `None` when the flight is still pending after `timeout`.
    fn wait(&self, timeout: Duration) -> Option<FlightState> {
        let guard = lock(&self.state);
        let (state, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |state| {
                matches!(state, FlightState::Pending)
            })
            .unwrap_or_else(PoisonError::into_inner);
        match &*state {
            FlightState::Pending => None,
            settled => Some(settled.clone()),
        }
    }
}

type FlightArena = Mutex<HashMap<String, Arc<Flight>>>;

/// Leader's claim on a key. Dropping it always releases waiters and clears
/// the arena entry, including when creation panics.
struct FlightLease<'a> {
    arena: &'a FlightArena,
    key: String,
    flight: Arc<Flight>,
}

impl FlightLease<'_> {
    fn settle(&self, outcome: FlightState) {
        self.flight.finish(outcome);
    }
}

impl Drop for FlightLease<'_> {
    fn drop(&mut self) {
        self.flight
            .finish(FlightState::Failed("creator aborted".to_string()));
        let mut arena = lock(self.arena);
        if arena
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.flight))
        {
            arena.remove(&self.key);
        }
    }
}

enum Role<'a> {
    Leader(FlightLease<'a>),
    Waiter(Arc<Flight>),
}

/// Persistent word → grapheme mapping.
pub struct GraphemeStore<R: GraphemeRepository> {
    repo: R,
    archive: Box<dyn ArchiveSink>,
    in_flight: FlightArena,
    create_wait_timeout: Duration,
}

impl<R: GraphemeRepository> GraphemeStore<R> {
    /// Creates a store over `repo`, archiving standalone SVGs to `archive`.
    pub fn new(repo: R, archive: Box<dyn ArchiveSink>) -> Self {
        Self {
            repo,
            archive,
            in_flight: Mutex::new(HashMap::new()),
            create_wait_timeout: DEFAULT_CREATE_WAIT_TIMEOUT,
        }
    }

    /// Overrides how long a caller waits for another caller's creation.
    pub fn with_create_wait_timeout(mut self, timeout: Duration) -> Self {
        self.create_wait_timeout = timeout;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Returns the stored grapheme for `word` without creating one.
    pub fn get(&self, word: &str) -> StoreResult<Option<Grapheme>> {
        Ok(self.repo.read(&normalize_key(word))?)
    }

    /// Resolves `word` to its grapheme, creating it with `defaults` if absent.
    ///
    /// # Errors
    /// - `StorageUnavailable` when the backend fails.
    /// - `ConcurrentCreateTimeout` when another caller's creation of the same
    ///   key does not finish within the configured wait.
    /// - `CreationFailed` when that other caller's creation failed.
    pub fn get_or_create(&self, word: &str, defaults: &ParameterVector) -> StoreResult<Grapheme> {
        let key = normalize_key(word);
        if let Some(existing) = self.repo.read(&key)? {
            debug!(
                "event=grapheme_resolve module=store status=hit seed={:08x}",
                existing.seed
            );
            return Ok(existing);
        }

        match self.join_or_lead(&key) {
            Role::Waiter(flight) => self.await_flight(&flight),
            Role::Leader(lease) => {
                let result = self.read_or_create(&key, defaults);
                lease.settle(match &result {
                    Ok(grapheme) => FlightState::Done(grapheme.clone()),
                    Err(err) => FlightState::Failed(err.to_string()),
                });
                result
            }
        }
    }

    /// Writes the standalone SVG for `grapheme`; identical bytes are a no-op.
    pub fn archive(&self, grapheme: &Grapheme) -> ArchiveResult<PathBuf> {
        let svg = render_grapheme(grapheme);
        match self.archive.store(&grapheme.archive_name, svg.as_bytes()) {
            Ok(path) => {
                debug!(
                    "event=grapheme_archive module=store status=ok seed={:08x} bytes={}",
                    grapheme.seed,
                    svg.len()
                );
                Ok(path)
            }
            Err(ArchiveError::Disabled) => Err(ArchiveError::Disabled),
            Err(err) => {
                warn!(
                    "event=grapheme_archive module=store status=error error_code=archival_failure seed={:08x} error={}",
                    grapheme.seed, err
                );
                Err(err)
            }
        }
    }

    /// Re-archives every stored grapheme.
    ///
    /// Individual archive failures are counted, not returned.
    pub fn archive_all(&self) -> StoreResult<ArchiveReport> {
        let started_at = Instant::now();
        let mut report = ArchiveReport::default();
        for grapheme in self.repo.list_all()? {
            match self.archive(&grapheme) {
                Ok(_) => report.archived += 1,
                Err(_) => report.failed += 1,
            }
        }
        info!(
            "event=grapheme_archive_all module=store status=ok archived={} failed={} duration_ms={}",
            report.archived,
            report.failed,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn join_or_lead(&self, key: &str) -> Role<'_> {
        let mut arena = lock(&self.in_flight);
        if let Some(flight) = arena.get(key) {
            return Role::Waiter(Arc::clone(flight));
        }
        let flight = Arc::new(Flight::new());
        arena.insert(key.to_string(), Arc::clone(&flight));
        Role::Leader(FlightLease {
            arena: &self.in_flight,
            key: key.to_string(),
            flight,
        })
    }

    fn await_flight(&self, flight: &Flight) -> StoreResult<Grapheme> {
        let started_at = Instant::now();
        match flight.wait(self.create_wait_timeout) {
            Some(FlightState::Done(grapheme)) => {
                debug!(
                    "event=grapheme_resolve module=store status=joined seed={:08x} wait_ms={}",
                    grapheme.seed,
                    started_at.elapsed().as_millis()
                );
                Ok(grapheme)
            }
            Some(FlightState::Failed(message)) => Err(StoreError::CreationFailed(message)),
            Some(FlightState::Pending) | None => {
                warn!(
                    "event=grapheme_resolve module=store status=error error_code=create_wait_timeout wait_ms={}",
                    started_at.elapsed().as_millis()
                );
                Err(StoreError::ConcurrentCreateTimeout {
                    waited: started_at.elapsed(),
                })
            }
        }
    }

    /// Leader path. A flight that settled between the caller's first read and
    /// its claim on the key has already stored the record, so look again first.
    fn read_or_create(&self, key: &str, defaults: &ParameterVector) -> StoreResult<Grapheme> {
        if let Some(existing) = self.repo.read(key)? {
            debug!(
                "event=grapheme_resolve module=store status=late_hit seed={:08x}",
                existing.seed
            );
            return Ok(existing);
        }
        self.create(key, defaults)
    }

    fn create(&self, key: &str, defaults: &ParameterVector) -> StoreResult<Grapheme> {
        let started_at = Instant::now();
        let candidate = Grapheme::derive(key, defaults, now_epoch_ms());
        let outcome = self.repo.write_if_absent(&candidate)?;
        info!(
            "event=grapheme_create module=store status=ok outcome={} seed={:08x} rings={} duration_ms={}",
            if outcome.was_created() { "created" } else { "existing" },
            candidate.seed,
            candidate.geometry.rings.len(),
            started_at.elapsed().as_millis()
        );
        Ok(outcome.into_grapheme())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
