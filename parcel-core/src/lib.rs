//! Core domain logic for keeping a parcel layer in sync with a list of ids.
//!
//! The crate owns the pure parts of the pipeline: parsing parcel
//! identifiers, building lookup URLs, interpreting the lookup service's text
//! protocol and computing the reconciliation plan. The [`ParcelSync`]
//! orchestrator drives those pieces against two injected collaborators: a
//! [`ParcelSource`] that performs the network call and a
//! [`FeatureStore`] that owns the polygon layer.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeSet;
//! use parcel_core::reconcile;
//!
//! let desired: BTreeSet<String> = ["14-123", "14-124"].map(String::from).into();
//! let existing: BTreeSet<String> = ["14-124", "14-999"].map(String::from).into();
//! let plan = reconcile(&desired, &existing);
//! assert!(plan.to_add.contains("14-123"));
//! assert!(plan.to_delete.contains("14-999"));
//! ```

#![forbid(unsafe_code)]

mod parcel_id;
mod reconcile;
mod response;
mod source;
pub mod store;
mod sync;

#[doc(hidden)]
pub mod test_support;

pub use parcel_id::{DEFAULT_BASE_URL, MalformedIdError, ParcelId, ServiceConfig};
pub use reconcile::{ReconciliationPlan, reconcile};
pub use response::{ParcelGeometry, ProtocolError, SUCCESS_STATUS, parse_response};
pub use source::{FetchError, ParcelSource};
pub use store::{
    EditSession, Feature, FeatureError, FeatureId, FeatureStore, FieldSchema, PARCEL_FIELD,
    StoreError,
};
pub use sync::{
    FailureStage, ParcelError, ParcelSync, SyncError, SyncFailure, SyncReport,
    existing_parcel_ids, split_input,
};
