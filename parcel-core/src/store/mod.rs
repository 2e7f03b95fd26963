//! Polygon layer access consumed by the sync orchestrator.
//!
//! The [`FeatureStore`] trait is the narrow surface the core needs from a
//! geospatial data layer: scan the parcel attribute, look features up by
//! attribute, and batch additions and deletions inside an edit session.
//! Atomicity of the session is the implementation's responsibility.

mod feature;
mod session;

use std::{collections::BTreeSet, error::Error as StdError, fmt};

use thiserror::Error;

pub use feature::{Feature, FeatureError, FieldSchema};
pub use session::EditSession;

/// Attribute holding the parcel id on every feature of the layer.
pub const PARCEL_FIELD: &str = "parcel";

/// Store-assigned handle of a single feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureId(pub i64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Failure reported by a [`FeatureStore`] implementation.
#[derive(Debug, Error)]
#[error("feature store could not {operation}: {source}")]
pub struct StoreError {
    /// Operation that failed, e.g. `"commit edit session"`.
    pub operation: &'static str,
    /// Underlying cause.
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl StoreError {
    /// Wrap `source` as a failure of `operation`.
    pub fn new(
        operation: &'static str,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

/// Mutable polygon layer holding one feature per parcel.
///
/// Reads may happen at any time. Writes are only valid between
/// [`begin_edit`](Self::begin_edit) and
/// [`commit_edit`](Self::commit_edit) or
/// [`rollback_edit`](Self::rollback_edit); use [`EditSession`] to pair them.
pub trait FeatureStore {
    /// Attribute schema new features must be built against.
    fn fields(&self) -> &FieldSchema;

    /// The [`PARCEL_FIELD`] value of every feature, in store order.
    ///
    /// Features without a value yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the layer cannot be scanned.
    fn feature_parcel_ids(&self) -> Result<Vec<Option<String>>, StoreError>;

    /// Distinct parcel ids present in the layer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the layer cannot be scanned.
    fn list_parcel_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.feature_parcel_ids()?.into_iter().flatten().collect())
    }

    /// Handles of every feature whose `attribute` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the attribute is unknown or the query fails.
    fn query_by_attribute(&self, attribute: &str, value: &str)
    -> Result<Vec<FeatureId>, StoreError>;

    /// Open an edit session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a session is already open or the store
    /// refuses to start one.
    fn begin_edit(&mut self) -> Result<(), StoreError>;

    /// Add `features` in one batch, returning their new handles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when no session is open or any feature is
    /// rejected, for example because its geometry cannot be built. A failed
    /// batch leaves the layer unchanged.
    fn add_features(&mut self, features: &[Feature]) -> Result<Vec<FeatureId>, StoreError>;

    /// Delete the features behind `ids` in one batch, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when no session is open or the deletion fails.
    fn delete_features(&mut self, ids: &[FeatureId]) -> Result<usize, StoreError>;

    /// Make the session's changes durable and close it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when no session is open or the commit fails.
    fn commit_edit(&mut self) -> Result<(), StoreError>;

    /// Discard the session's changes and close it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when no session is open or the rollback fails.
    fn rollback_edit(&mut self) -> Result<(), StoreError>;
}
