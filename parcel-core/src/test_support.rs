//! In-memory collaborators used by unit and behaviour tests.
//!
//! [`MemoryFeatureStore`] keeps features in a vector and models an edit
//! session as a working copy that replaces the committed state on commit.
//! [`StubParcelSource`] answers lookups from canned responses keyed by URL.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
};

use log::debug;
use thiserror::Error;

use crate::{
    Feature, FeatureId, FeatureStore, FetchError, FieldSchema, PARCEL_FIELD, ParcelId,
    ParcelSource, ServiceConfig, StoreError,
};

/// Geometry given to features seeded through [`MemoryFeatureStore::with_parcels`].
pub const UNIT_SQUARE_WKT: &str = "POLYGON((0 0,1 0,1 1,0 1,0 0))";

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Scanning parcel ids.
    List,
    /// Querying by attribute.
    Query,
    /// Opening an edit session.
    Begin,
    /// Adding features.
    Add,
    /// Deleting features.
    Delete,
    /// Committing a session.
    Commit,
    /// Rolling a session back.
    Rollback,
}

impl StoreOperation {
    const fn label(self) -> &'static str {
        match self {
            Self::List => "scan parcel ids",
            Self::Query => "query features",
            Self::Begin => "begin edit session",
            Self::Add => "add features",
            Self::Delete => "delete features",
            Self::Commit => "commit edit session",
            Self::Rollback => "roll back edit session",
        }
    }
}

/// Reasons the in-memory store refuses an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryStoreError {
    /// The failure was requested with [`MemoryFeatureStore::fail_on`].
    #[error("injected failure")]
    Injected,
    /// A write or session call arrived outside an edit session.
    #[error("no edit session is open")]
    NotEditing,
    /// [`FeatureStore::begin_edit`] was called twice.
    #[error("an edit session is already open")]
    AlreadyEditing,
    /// The queried attribute is not in the schema.
    #[error("layer has no attribute named {name:?}")]
    UnknownField {
        /// Requested attribute.
        name: String,
    },
    /// A feature in an added batch had no usable geometry.
    #[error("feature {index} of the batch has no geometry")]
    MissingGeometry {
        /// Position of the feature in the batch.
        index: usize,
    },
}

/// Vector-backed [`FeatureStore`].
#[derive(Debug)]
pub struct MemoryFeatureStore {
    schema: FieldSchema,
    committed: Vec<(FeatureId, Feature)>,
    working: Option<Vec<(FeatureId, Feature)>>,
    next_id: i64,
    failures: HashSet<StoreOperation>,
    commits: usize,
    rollbacks: usize,
}

impl Default for MemoryFeatureStore {
    fn default() -> Self {
        Self::with_schema(Self::default_schema())
    }
}

impl MemoryFeatureStore {
    /// Schema with the single [`PARCEL_FIELD`] attribute.
    #[must_use]
    pub fn default_schema() -> FieldSchema {
        FieldSchema::new([PARCEL_FIELD])
    }

    /// Create an empty store with `schema`.
    #[must_use]
    pub fn with_schema(schema: FieldSchema) -> Self {
        Self {
            schema,
            committed: Vec::new(),
            working: None,
            next_id: 1,
            failures: HashSet::new(),
            commits: 0,
            rollbacks: 0,
        }
    }

    /// Create a store holding one unit-square feature per id, in order.
    #[must_use]
    pub fn with_parcels<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::default();
        for id in ids {
            store.seed(Some(id.as_ref()));
        }
        store
    }

    /// Append a committed feature with an optional parcel id.
    ///
    /// Under a schema without [`PARCEL_FIELD`] the feature is stored without
    /// its id.
    pub fn seed(&mut self, parcel: Option<&str>) -> FeatureId {
        let mut feature = Feature::new(&self.schema);
        if let Some(value) = parcel
            && let Err(err) = feature.set_attribute(PARCEL_FIELD, value)
        {
            debug!("seeding feature without parcel id {value:?}: {err}");
        }
        feature.set_geometry_wkt(UNIT_SQUARE_WKT);
        let id = self.allocate();
        self.committed.push((id, feature));
        id
    }

    /// Make every subsequent call to `operation` fail.
    pub fn fail_on(&mut self, operation: StoreOperation) {
        self.failures.insert(operation);
    }

    /// Committed features in insertion order.
    #[must_use]
    pub fn features(&self) -> &[(FeatureId, Feature)] {
        &self.committed
    }

    /// Committed parcel ids in insertion order, skipping nulls.
    #[must_use]
    pub fn committed_parcel_ids(&self) -> Vec<String> {
        self.committed
            .iter()
            .filter_map(|(_, feature)| feature.attribute(PARCEL_FIELD).map(str::to_owned))
            .collect()
    }

    /// Whether an edit session is open.
    #[must_use]
    pub const fn is_editing(&self) -> bool {
        self.working.is_some()
    }

    /// Number of successful commits.
    #[must_use]
    pub const fn commits(&self) -> usize {
        self.commits
    }

    /// Number of successful rollbacks.
    #[must_use]
    pub const fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    fn allocate(&mut self) -> FeatureId {
        let id = FeatureId(self.next_id);
        self.next_id += 1;
        id
    }

    fn view(&self) -> &[(FeatureId, Feature)] {
        self.working.as_deref().unwrap_or(&self.committed)
    }

    fn check(&self, operation: StoreOperation) -> Result<(), StoreError> {
        if self.failures.contains(&operation) {
            return Err(StoreError::new(
                operation.label(),
                MemoryStoreError::Injected,
            ));
        }
        Ok(())
    }

    fn working_mut(
        &mut self,
        operation: StoreOperation,
    ) -> Result<&mut Vec<(FeatureId, Feature)>, StoreError> {
        self.working
            .as_mut()
            .ok_or_else(|| StoreError::new(operation.label(), MemoryStoreError::NotEditing))
    }
}

impl FeatureStore for MemoryFeatureStore {
    fn fields(&self) -> &FieldSchema {
        &self.schema
    }

    fn feature_parcel_ids(&self) -> Result<Vec<Option<String>>, StoreError> {
        self.check(StoreOperation::List)?;
        Ok(self
            .view()
            .iter()
            .map(|(_, feature)| feature.attribute(PARCEL_FIELD).map(str::to_owned))
            .collect())
    }

    fn query_by_attribute(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<FeatureId>, StoreError> {
        self.check(StoreOperation::Query)?;
        if !self.schema.contains(attribute) {
            return Err(StoreError::new(
                StoreOperation::Query.label(),
                MemoryStoreError::UnknownField {
                    name: attribute.to_owned(),
                },
            ));
        }
        Ok(self
            .view()
            .iter()
            .filter(|(_, feature)| feature.attribute(attribute) == Some(value))
            .map(|(id, _)| *id)
            .collect())
    }

    fn begin_edit(&mut self) -> Result<(), StoreError> {
        self.check(StoreOperation::Begin)?;
        if self.working.is_some() {
            return Err(StoreError::new(
                StoreOperation::Begin.label(),
                MemoryStoreError::AlreadyEditing,
            ));
        }
        self.working = Some(self.committed.clone());
        Ok(())
    }

    fn add_features(&mut self, features: &[Feature]) -> Result<Vec<FeatureId>, StoreError> {
        self.check(StoreOperation::Add)?;
        self.working_mut(StoreOperation::Add)?;
        if let Some(index) = features.iter().position(|feature| {
            feature
                .geometry_wkt()
                .is_none_or(|wkt| wkt.trim().is_empty())
        }) {
            return Err(StoreError::new(
                StoreOperation::Add.label(),
                MemoryStoreError::MissingGeometry { index },
            ));
        }

        let mut added = Vec::with_capacity(features.len());
        let mut rows = Vec::with_capacity(features.len());
        for feature in features {
            let id = self.allocate();
            added.push(id);
            rows.push((id, feature.clone()));
        }
        self.working_mut(StoreOperation::Add)?.extend(rows);
        Ok(added)
    }

    fn delete_features(&mut self, ids: &[FeatureId]) -> Result<usize, StoreError> {
        self.check(StoreOperation::Delete)?;
        let working = self.working_mut(StoreOperation::Delete)?;
        let before = working.len();
        working.retain(|(id, _)| !ids.contains(id));
        Ok(before - working.len())
    }

    fn commit_edit(&mut self) -> Result<(), StoreError> {
        self.check(StoreOperation::Commit)?;
        let working = self.working.take().ok_or_else(|| {
            StoreError::new(StoreOperation::Commit.label(), MemoryStoreError::NotEditing)
        })?;
        self.committed = working;
        self.commits += 1;
        Ok(())
    }

    fn rollback_edit(&mut self) -> Result<(), StoreError> {
        self.check(StoreOperation::Rollback)?;
        self.working.take().ok_or_else(|| {
            StoreError::new(
                StoreOperation::Rollback.label(),
                MemoryStoreError::NotEditing,
            )
        })?;
        self.rollbacks += 1;
        Ok(())
    }
}

/// Body the lookup service sends for a found parcel: status `0`, then the
/// geometry as EWKT in the requested `srid`.
#[must_use]
pub fn success_body(srid: &str, wkt: &str) -> String {
    format!("0\nSRID={srid};{wkt}\n")
}

/// [`ParcelSource`] answering from canned responses.
///
/// URLs without a registered response fail with a 404 transport error.
/// Every requested URL is recorded in order.
#[derive(Debug, Default)]
pub struct StubParcelSource {
    responses: HashMap<String, Result<String, FetchError>>,
    requests: RefCell<Vec<String>>,
}

impl StubParcelSource {
    /// Create a source with no responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `body`.
    #[must_use]
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(url.into(), Ok(body.into()));
        self
    }

    /// Fail `url` with `error`.
    #[must_use]
    pub fn with_error(mut self, url: impl Into<String>, error: FetchError) -> Self {
        self.responses.insert(url.into(), Err(error));
        self
    }

    /// Answer the lookup for `id` under `config` with a successful `wkt` body.
    #[must_use]
    pub fn with_parcel(self, config: &ServiceConfig, id: &ParcelId, wkt: &str) -> Self {
        let body = success_body(&config.crs, wkt);
        self.with_body(config.request_url(id), body)
    }

    /// URLs requested so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl ParcelSource for StubParcelSource {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.borrow_mut().push(url.to_owned());
        self.responses.get(url).cloned().unwrap_or_else(|| {
            Err(FetchError::Transport {
                url: url.to_owned(),
                status: Some(404),
                message: "no stub response registered".to_owned(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn reads_see_the_working_copy() {
        let mut store = MemoryFeatureStore::with_parcels(["1-1"]);
        store.begin_edit().expect("begin");
        let ids = store.query_by_attribute(PARCEL_FIELD, "1-1").expect("query");
        store.delete_features(&ids).expect("delete");
        assert!(store.list_parcel_ids().expect("list").is_empty());
        assert_eq!(store.committed_parcel_ids(), vec!["1-1"]);
    }

    #[rstest]
    fn seeding_without_parcel_field_stores_no_id() {
        let mut store = MemoryFeatureStore::with_schema(FieldSchema::new(["name"]));
        let id = store.seed(Some("1-1"));
        assert_eq!(store.features().len(), 1);
        assert_eq!(store.features().first().map(|(fid, _)| *fid), Some(id));
        assert!(store.committed_parcel_ids().is_empty());
        assert!(store.list_parcel_ids().expect("list").is_empty());
    }

    #[rstest]
    fn writes_require_a_session() {
        let mut store = MemoryFeatureStore::default();
        let err = store.delete_features(&[FeatureId(1)]).expect_err("no session");
        assert_eq!(err.operation, "delete features");
    }

    #[rstest]
    fn rejects_batches_with_missing_geometry() {
        let mut store = MemoryFeatureStore::default();
        store.begin_edit().expect("begin");
        let feature = Feature::new(store.fields());
        store.add_features(&[feature]).expect_err("no geometry");
        assert!(store.list_parcel_ids().expect("list").is_empty());
    }

    #[rstest]
    fn stub_source_records_requests() {
        let body = success_body("2180", "POINT(0 0)");
        let source = StubParcelSource::new().with_body("http://a/", body.clone());
        assert_eq!(source.fetch("http://a/").expect("registered"), body);
        let err = source.fetch("http://b/").expect_err("unregistered");
        assert_eq!(err.url(), "http://b/");
        assert_eq!(source.requests(), vec!["http://a/", "http://b/"]);
    }
}
