//! SVG serialization.
//!
//! # Responsibility
//! - Render geometries and compositions into standalone SVG documents.
//!
//! # Invariants
//! - Output starts with an XML declaration and declares the SVG namespace.
//! - Output is self-contained: no external references, no scripts.
//! - Element order follows ring, segment, connector-set and spoke order.

pub mod serializer;
