//! I/O adapters for the parcel sync pipeline.
//!
//! Responsibilities:
//! - Fetch lookup responses over HTTP ([`http`]).
//! - Persist parcel polygons in a SQLite-backed layer ([`sqlite`]).
//!
//! Boundaries:
//! - Do not encode domain rules (live in `parcel-core`).
//! - Keep blocking calls off async executors; the HTTP source owns its runtime.

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "store-sqlite")]
pub mod sqlite;

#[cfg(feature = "http")]
pub use http::{DEFAULT_USER_AGENT, HttpParcelSource, HttpParcelSourceConfig, SourceBuildError};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{GeometryError, LayerError, SqlitePolygonLayer};
