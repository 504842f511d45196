//! Core engine for deterministic word graphemes and composed logograms.
//! This crate owns grapheme identity, geometry generation, composition and
//! SVG output.

pub mod archive;
pub mod config;
pub mod db;
pub mod engine;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod svg;

pub use archive::sink::{ArchiveError, ArchiveSink, DisabledArchiveSink, FsArchiveSink};
pub use config::{ConfigError, EngineConfig};
pub use engine::{
    EngineError, GenerateRequest, GenerateResponse, LogogramEngine, RequestValidationError,
};
pub use geometry::generator::generate_geometry;
pub use geometry::rng::{hash_to_seed, SeedStream};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::geometry::{ArcSegment, CenterNode, Connector, ConnectorSet, DashProfile, Geometry, Ring};
pub use model::grapheme::{normalize_key, Grapheme};
pub use model::logogram::{
    Composition, CompositionMode, GlyphPlacement, Layer, Logogram, LogogramId, Placement,
};
pub use model::params::{Modality, ParameterValidationError, ParameterVector, Perspective};
pub use repo::grapheme_repo::{
    GraphemeRepository, RepoError, RepoResult, SqliteGraphemeRepository, WriteOutcome,
};
pub use service::composer::{BlendInput, PhraseComposer};
pub use service::grapheme_store::{ArchiveReport, GraphemeStore, StoreError, StoreResult};
pub use service::tokenize::tokenize;
pub use svg::serializer::{path_data, render_composition, render_grapheme};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
