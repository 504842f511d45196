//! Request boundary for logogram generation.
//!
//! # Responsibility
//! - Validate caller input once, then drive composer, serializer and archival.
//! - Translate store failures into boundary errors; keep archival non-fatal.
//!
//! # Invariants
//! - `generate` is a function of the request and the store contents only; it
//!   has no transport dependency.
//! - Identical requests yield byte-identical `svg_document`s.
//! - Archival failure never turns a successful render into an error.

use crate::archive::sink::{ArchiveError, ArchiveSink, DisabledArchiveSink, FsArchiveSink};
use crate::config::{ConfigError, EngineConfig};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::logogram::{Composition, CompositionMode, Logogram, LogogramId};
use crate::model::params::{ParameterValidationError, ParameterVector};
use crate::repo::grapheme_repo::{GraphemeRepository, RepoError, SqliteGraphemeRepository};
use crate::service::composer::{BlendInput, PhraseComposer};
use crate::service::grapheme_store::{now_epoch_ms, GraphemeStore, StoreError};
use crate::svg::serializer::render_composition;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

pub const DEFAULT_BLEND_WEIGHT: f64 = 0.5;

/// Transport-agnostic generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateRequest {
    pub phrase_text: String,
    #[serde(default)]
    pub parameters: ParameterVector,
    #[serde(default)]
    pub mode: CompositionMode,
    /// Required for blend mode; ignored otherwise.
    #[serde(default)]
    pub secondary_phrase: Option<String>,
    /// Blend mode only; defaults to `parameters`.
    #[serde(default)]
    pub secondary_parameters: Option<ParameterVector>,
    /// Blend mode only; defaults to `DEFAULT_BLEND_WEIGHT`.
    #[serde(default)]
    pub blend_weight: Option<f64>,
    /// Pins layout jitter; defaults to a hash of the request content.
    #[serde(default)]
    pub composition_seed: Option<u32>,
}

impl GenerateRequest {
    /// Single-mode request with default parameters.
    pub fn single(phrase_text: impl Into<String>) -> Self {
        Self {
            phrase_text: phrase_text.into(),
            parameters: ParameterVector::default(),
            mode: CompositionMode::Single,
            secondary_phrase: None,
            secondary_parameters: None,
            blend_weight: None,
            composition_seed: None,
        }
    }

    /// Composite-mode request; clauses are newline-delimited.
    pub fn composite(clauses: impl Into<String>) -> Self {
        Self {
            mode: CompositionMode::Composite,
            ..Self::single(clauses)
        }
    }

    /// Blend-mode request between two phrases.
    pub fn blend(primary: impl Into<String>, secondary: impl Into<String>, weight: f64) -> Self {
        Self {
            mode: CompositionMode::Blend,
            secondary_phrase: Some(secondary.into()),
            blend_weight: Some(weight),
            ..Self::single(primary)
        }
    }

    pub fn with_parameters(mut self, parameters: ParameterVector) -> Self {
        self.parameters = parameters;
        self
    }

    /// Checks the request before it enters the core.
    ///
    /// Phrase text is never rejected: blank phrases and phrases that lose
    /// every word to stop-word removal render through the single fallback
    /// token.
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        self.parameters
            .validate()
            .map_err(|source| RequestValidationError::Parameters {
                phrase: "primary",
                source,
            })?;

        if self.mode != CompositionMode::Blend {
            return Ok(());
        }

        if self.secondary_phrase.is_none() {
            return Err(RequestValidationError::MissingSecondaryPhrase);
        }
        if let Some(parameters) = &self.secondary_parameters {
            parameters
                .validate()
                .map_err(|source| RequestValidationError::Parameters {
                    phrase: "secondary",
                    source,
                })?;
        }
        let weight = self.effective_blend_weight();
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(RequestValidationError::InvalidBlendWeight(weight));
        }
        Ok(())
    }

    fn effective_blend_weight(&self) -> f64 {
        self.blend_weight.unwrap_or(DEFAULT_BLEND_WEIGHT)
    }
}

/// Boundary response for one generated logogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateResponse {
    pub logogram_id: LogogramId,
    pub svg_document: String,
    pub tokens: Vec<String>,
    /// True when the logogram and all of its graphemes were archived.
    pub archived: bool,
    pub archive_path: Option<PathBuf>,
}

impl From<Logogram> for GenerateResponse {
    fn from(value: Logogram) -> Self {
        let archived = value.is_archived();
        Self {
            logogram_id: value.id,
            svg_document: value.svg_document,
            tokens: value.composition.tokens,
            archived,
            archive_path: value.archive_path,
        }
    }
}

/// Request input rejected before generation.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestValidationError {
    MissingSecondaryPhrase,
    InvalidBlendWeight(f64),
    Parameters {
        phrase: &'static str,
        source: ParameterValidationError,
    },
}

impl Display for RequestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSecondaryPhrase => write!(f, "blend mode requires a secondary phrase"),
            Self::InvalidBlendWeight(weight) => {
                write!(f, "blend weight must be within [0, 1], got {weight}")
            }
            Self::Parameters { phrase, source } => write!(f, "{phrase} parameters: {source}"),
        }
    }
}

impl Error for RequestValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parameters { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Boundary error surfaced to callers.
#[derive(Debug)]
pub enum EngineError {
    InvalidInput(RequestValidationError),
    /// Grapheme storage failed, including waits on concurrent creation.
    StorageUnavailable(StoreError),
    Config(ConfigError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::StorageUnavailable(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::StorageUnavailable(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<RequestValidationError> for EngineError {
    fn from(value: RequestValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::StorageUnavailable(value)
    }
}

impl From<DbError> for EngineError {
    fn from(value: DbError) -> Self {
        Self::StorageUnavailable(StoreError::StorageUnavailable(RepoError::Db(value)))
    }
}

impl From<ConfigError> for EngineError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Grapheme store plus logogram archival, shareable across request threads.
pub struct LogogramEngine<R: GraphemeRepository> {
    store: GraphemeStore<R>,
    logogram_archive: Box<dyn ArchiveSink>,
}

impl LogogramEngine<SqliteGraphemeRepository> {
    /// Builds an engine from deployment configuration.
    ///
    /// # Errors
    /// - `Config` when the configuration is invalid.
    /// - `StorageUnavailable` when the database cannot be opened or migrated.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let conn = match &config.database_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        let store = GraphemeStore::new(
            SqliteGraphemeRepository::new(conn),
            archive_sink(config.grapheme_archive_dir.as_ref()),
        )
        .with_create_wait_timeout(config.create_wait_timeout());
        Ok(Self::new(
            store,
            archive_sink(config.logogram_archive_dir.as_ref()),
        ))
    }
}

impl<R: GraphemeRepository> LogogramEngine<R> {
    pub fn new(store: GraphemeStore<R>, logogram_archive: Box<dyn ArchiveSink>) -> Self {
        Self {
            store,
            logogram_archive,
        }
    }

    pub fn store(&self) -> &GraphemeStore<R> {
        &self.store
    }

    /// Validates, renders and archives one request.
    pub fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, EngineError> {
        self.render(request).map(GenerateResponse::from)
    }

    /// Like `generate`, but returns the full immutable `Logogram`.
    pub fn render(&self, request: &GenerateRequest) -> Result<Logogram, EngineError> {
        let started_at = Instant::now();
        request.validate()?;

        let composition = match self.compose(request) {
            Ok(composition) => composition,
            Err(err) => {
                warn!(
                    "event=logogram_generate module=engine status=error mode={} duration_ms={} error={}",
                    request.mode,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };
        let svg_document = render_composition(&composition);
        let id = Uuid::new_v4();

        let graphemes_archived = composition
            .graphemes
            .values()
            .fold(true, |all_ok, grapheme| {
                self.store.archive(grapheme).is_ok() && all_ok
            });
        let archive_path = self.archive_logogram(id, &svg_document);
        let archived = graphemes_archived && archive_path.is_some();

        info!(
            "event=logogram_generate module=engine status=ok mode={} tokens={} layers={} graphemes={} bytes={} archived={} duration_ms={}",
            composition.mode,
            composition.tokens.len(),
            composition.layers.len(),
            composition.graphemes.len(),
            svg_document.len(),
            archived,
            started_at.elapsed().as_millis()
        );

        Ok(Logogram {
            id,
            phrase_text: request.phrase_text.clone(),
            composition,
            svg_document,
            created_at: now_epoch_ms(),
            archive_path,
            archived,
        })
    }

    fn compose(&self, request: &GenerateRequest) -> Result<Composition, StoreError> {
        let composer = PhraseComposer::new(&self.store);
        match request.mode {
            CompositionMode::Single => composer.compose_single(
                &request.phrase_text,
                &request.parameters,
                request.composition_seed,
            ),
            CompositionMode::Composite => composer.compose_composite(
                &request.phrase_text,
                &request.parameters,
                request.composition_seed,
            ),
            CompositionMode::Blend => composer.compose_blend(
                BlendInput {
                    phrase: &request.phrase_text,
                    parameters: &request.parameters,
                },
                BlendInput {
                    phrase: request.secondary_phrase.as_deref().unwrap_or_default(),
                    parameters: request
                        .secondary_parameters
                        .as_ref()
                        .unwrap_or(&request.parameters),
                },
                request.effective_blend_weight(),
                request.composition_seed,
            ),
        }
    }

    fn archive_logogram(&self, id: LogogramId, svg_document: &str) -> Option<PathBuf> {
        match self
            .logogram_archive
            .store(&format!("logogram-{id}.svg"), svg_document.as_bytes())
        {
            Ok(path) => Some(path),
            Err(ArchiveError::Disabled) => None,
            Err(err) => {
                warn!(
                    "event=logogram_archive module=engine status=error error_code=archival_failure error={}",
                    err
                );
                None
            }
        }
    }
}

fn archive_sink(dir: Option<&PathBuf>) -> Box<dyn ArchiveSink> {
    match dir {
        Some(dir) => Box::new(FsArchiveSink::new(dir.clone())),
        None => Box::new(DisabledArchiveSink),
    }
}
