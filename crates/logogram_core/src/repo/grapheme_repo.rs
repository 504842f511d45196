//! Grapheme repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the key-value contract the store needs: `read`,
//!   `write_if_absent`, `list_all`.
//! - Keep SQL and JSON column encoding inside the persistence boundary.
//!
//! # Invariants
//! - Rows are insert-only; an existing key is never overwritten.
//! - Read paths reject rows whose stored geometry no longer matches
//!   regeneration instead of serving drifted shapes.

use crate::db::DbError;
use crate::model::grapheme::Grapheme;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

const GRAPHEME_SELECT_SQL: &str = "SELECT
    key,
    seed,
    content_units,
    parameters_json,
    geometry_json,
    archive_name,
    created_at
FROM graphemes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for grapheme persistence and decoding.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Record could not be encoded for storage.
    Encode(serde_json::Error),
    /// Persisted row is malformed or inconsistent.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode grapheme: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted grapheme data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of an insert-if-absent write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The offered record was stored.
    Created(Grapheme),
    /// Another writer got there first; this is its record.
    Existing(Grapheme),
}

impl WriteOutcome {
    pub fn into_grapheme(self) -> Grapheme {
        match self {
            Self::Created(grapheme) | Self::Existing(grapheme) => grapheme,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Backend contract for grapheme persistence.
///
/// Implementations must be shareable across request threads.
pub trait GraphemeRepository: Send + Sync {
    fn read(&self, key: &str) -> RepoResult<Option<Grapheme>>;
    fn write_if_absent(&self, grapheme: &Grapheme) -> RepoResult<WriteOutcome>;
    /// Returns every record ordered by `created_at ASC, key ASC`.
    fn list_all(&self) -> RepoResult<Vec<Grapheme>>;
}

/// SQLite-backed grapheme repository.
///
/// The connection is owned behind a mutex so one repository can serve
/// concurrent requests.
pub struct SqliteGraphemeRepository {
    conn: Mutex<Connection>,
}

impl SqliteGraphemeRepository {
    /// Wraps a migrated connection from `db::open_db*`.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GraphemeRepository for SqliteGraphemeRepository {
    fn read(&self, key: &str) -> RepoResult<Option<Grapheme>> {
        let conn = self.conn();
        read_with(&conn, key)
    }

    fn write_if_absent(&self, grapheme: &Grapheme) -> RepoResult<WriteOutcome> {
        let parameters_json =
            serde_json::to_string(&grapheme.parameters).map_err(RepoError::Encode)?;
        let geometry_json = serde_json::to_string(&grapheme.geometry).map_err(RepoError::Encode)?;

        let conn = self.conn();
        let changed = conn.execute(
            "INSERT INTO graphemes (
                key,
                seed,
                content_units,
                parameters_json,
                geometry_json,
                archive_name,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(key) DO NOTHING;",
            params![
                grapheme.key.as_str(),
                i64::from(grapheme.seed),
                i64::from(grapheme.content_units),
                parameters_json,
                geometry_json,
                grapheme.archive_name.as_str(),
                grapheme.created_at,
            ],
        )?;

        if changed == 1 {
            return Ok(WriteOutcome::Created(grapheme.clone()));
        }

        read_with(&conn, &grapheme.key)?
            .map(WriteOutcome::Existing)
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "insert for seed {:08x} was ignored but no row exists",
                    grapheme.seed
                ))
            })
    }

    fn list_all(&self) -> RepoResult<Vec<Grapheme>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{GRAPHEME_SELECT_SQL} ORDER BY created_at ASC, key ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut graphemes = Vec::new();
        while let Some(row) = rows.next()? {
            graphemes.push(parse_grapheme_row(row)?);
        }
        Ok(graphemes)
    }
}

fn read_with(conn: &Connection, key: &str) -> RepoResult<Option<Grapheme>> {
    let mut stmt = conn.prepare(&format!("{GRAPHEME_SELECT_SQL} WHERE key = ?1;"))?;
    let row = stmt
        .query_row([key], |row| Ok(parse_grapheme_row(row)))
        .optional()?;
    row.transpose()
}

fn parse_grapheme_row(row: &Row<'_>) -> RepoResult<Grapheme> {
    let key: String = row.get("key")?;

    let seed_value: i64 = row.get("seed")?;
    let seed = u32::try_from(seed_value).map_err(|_| {
        RepoError::InvalidData(format!("seed `{seed_value}` out of range in graphemes.seed"))
    })?;

    let units_value: i64 = row.get("content_units")?;
    let content_units = u32::try_from(units_value).map_err(|_| {
        RepoError::InvalidData(format!(
            "content_units `{units_value}` out of range in graphemes.content_units"
        ))
    })?;

    let parameters_json: String = row.get("parameters_json")?;
    let parameters = serde_json::from_str(&parameters_json).map_err(|err| {
        RepoError::InvalidData(format!("graphemes.parameters_json: {err}"))
    })?;

    let geometry_json: String = row.get("geometry_json")?;
    let geometry = serde_json::from_str(&geometry_json)
        .map_err(|err| RepoError::InvalidData(format!("graphemes.geometry_json: {err}")))?;

    let grapheme = Grapheme {
        key,
        seed,
        content_units,
        parameters,
        geometry,
        archive_name: row.get("archive_name")?,
        created_at: row.get("created_at")?,
    };

    if !grapheme.is_consistent() {
        warn!(
            "event=grapheme_read module=repo status=error error_code=geometry_drift seed={:08x}",
            grapheme.seed
        );
        return Err(RepoError::InvalidData(format!(
            "stored geometry for seed {:08x} drifted from regeneration",
            grapheme.seed
        )));
    }

    Ok(grapheme)
}
