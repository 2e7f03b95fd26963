//! Facade crate for keeping a parcel polygon layer in sync with a list of
//! cadastral parcel ids.
//!
//! This crate re-exports the core domain types and exposes the HTTP lookup
//! source and the SQLite layer behind feature flags.

#![forbid(unsafe_code)]

pub use parcel_core::{
    DEFAULT_BASE_URL, EditSession, FailureStage, Feature, FeatureError, FeatureId, FeatureStore,
    FetchError, FieldSchema, MalformedIdError, PARCEL_FIELD, ParcelError, ParcelGeometry,
    ParcelId, ParcelSource, ParcelSync, ProtocolError, ReconciliationPlan, ServiceConfig,
    StoreError, SyncError, SyncFailure, SyncReport, existing_parcel_ids, parse_response,
    reconcile, split_input,
};

#[cfg(feature = "http")]
pub use parcel_data::{HttpParcelSource, HttpParcelSourceConfig, SourceBuildError};

#[cfg(feature = "store-sqlite")]
pub use parcel_data::{GeometryError, LayerError, SqlitePolygonLayer};
