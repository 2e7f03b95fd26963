//! Orchestration of a single synchronisation run.
//!
//! A run reads the desired ids, plans additions and deletions against the
//! layer, fetches geometry for each addition and applies both batches inside
//! one edit session. Per-parcel failures are collected into the
//! [`SyncReport`]; only failures that leave the session unusable abort the
//! run with a [`SyncError`].

use std::{collections::BTreeSet, fmt, sync::Arc};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    EditSession, Feature, FeatureId, FeatureStore, FetchError, MalformedIdError, PARCEL_FIELD,
    ParcelGeometry, ParcelId, ParcelSource, ProtocolError, ServiceConfig, StoreError,
    parse_response, reconcile,
};

/// Step of the pipeline at which a parcel failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum FailureStage {
    /// The id is not `<region>-<suffix>`.
    ParseId,
    /// The lookup request failed or its body was not text.
    Fetch,
    /// The service answered without a geometry.
    Response,
    /// The store rejected the batch of additions.
    Add,
    /// The store could not look up the features of an id to delete.
    Resolve,
    /// The store rejected the batch of deletions.
    Delete,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ParseId => "parse id",
            Self::Fetch => "fetch",
            Self::Response => "parse response",
            Self::Add => "add",
            Self::Resolve => "resolve",
            Self::Delete => "delete",
        })
    }
}

/// Why a single parcel could not be synchronised.
#[derive(Debug, Clone, Error)]
pub enum ParcelError {
    /// The id is structurally invalid.
    #[error(transparent)]
    MalformedId(#[from] MalformedIdError),
    /// The lookup could not be completed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The service reported a failure or sent an unusable record.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The store refused a batch the parcel belonged to.
    #[error(transparent)]
    Store(Arc<StoreError>),
}

/// A parcel that could not be added or removed.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SyncFailure {
    /// Id as read from the input or the layer.
    pub parcel_id: String,
    /// Step that failed.
    pub stage: FailureStage,
    /// Cause, serialised as its message.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_display"))]
    pub error: ParcelError,
}

impl SyncFailure {
    fn new(parcel_id: &str, stage: FailureStage, error: impl Into<ParcelError>) -> Self {
        Self {
            parcel_id: parcel_id.to_owned(),
            stage,
            error: error.into(),
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} failed to {}: {}", self.parcel_id, self.stage, self.error)
    }
}

#[cfg(feature = "serde")]
fn serialize_display<S: serde::Serializer>(
    value: &ParcelError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SyncReport {
    /// Ids whose features were added.
    pub added: Vec<String>,
    /// Ids whose features were deleted.
    pub deleted: Vec<String>,
    /// Number of features removed; an id may own several.
    pub deleted_features: usize,
    /// Ids already in sync.
    pub unchanged: Vec<String>,
    /// Parcels that could not be processed.
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Whether every planned change was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail_all<'a, I>(&mut self, ids: I, stage: FailureStage, error: StoreError)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let shared = Arc::new(error);
        for id in ids {
            warn!("{id:?}: {stage} failed: {shared}");
            self.failures
                .push(SyncFailure::new(id, stage, ParcelError::Store(Arc::clone(&shared))));
        }
    }
}

/// Errors that abort a run. Nothing is committed when one is returned.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The layer's current ids could not be read.
    #[error("failed to read parcel ids from the layer: {0}")]
    ListExisting(#[source] StoreError),
    /// The store refused to open an edit session.
    #[error("failed to open an edit session: {0}")]
    BeginEdit(#[source] StoreError),
    /// The store could not commit; the session was rolled back.
    #[error("failed to commit the edit session: {0}")]
    Commit(#[source] StoreError),
}

/// Synchronises a feature store with a list of parcel ids.
///
/// # Examples
///
/// ```
/// use parcel_core::{FetchError, ParcelSource, ParcelSync, ServiceConfig};
///
/// struct Offline;
///
/// impl ParcelSource for Offline {
///     fn fetch(&self, url: &str) -> Result<String, FetchError> {
///         Err(FetchError::Transport { url: url.to_owned(), status: None, message: "offline".into() })
///     }
/// }
///
/// let sync = ParcelSync::new(Offline, ServiceConfig::new("281401_1", "2180"));
/// assert_eq!(sync.config().crs, "2180");
/// ```
#[derive(Debug)]
pub struct ParcelSync<S> {
    source: S,
    config: ServiceConfig,
}

impl<S: ParcelSource> ParcelSync<S> {
    /// Pair a lookup source with the service parameters.
    pub const fn new(source: S, config: ServiceConfig) -> Self {
        Self { source, config }
    }

    /// Service parameters used to build lookup URLs.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Bring `store` in line with the `desired` ids.
    ///
    /// Every line is trimmed but blank lines are kept, so they surface as
    /// malformed-id failures. An input with no lines at all leaves the store
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the layer cannot be read, the edit session
    /// cannot be opened, or the commit fails. Per-parcel problems are
    /// reported in [`SyncReport::failures`] instead.
    pub fn sync<I, T, St>(&self, desired: I, store: &mut St) -> Result<SyncReport, SyncError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
        St: FeatureStore + ?Sized,
    {
        let desired: BTreeSet<String> = desired
            .into_iter()
            .map(|line| line.as_ref().trim().to_owned())
            .collect();
        if desired.is_empty() {
            warn!("no input data; the layer was left untouched");
            return Ok(SyncReport::default());
        }

        let existing = store.list_parcel_ids().map_err(SyncError::ListExisting)?;
        let plan = reconcile(&desired, &existing);
        info!(
            "sync plan: {} to add, {} to delete, {} unchanged",
            plan.to_add.len(),
            plan.to_delete.len(),
            plan.unchanged.len()
        );

        let mut report = SyncReport {
            unchanged: plan.unchanged.iter().cloned().collect(),
            ..SyncReport::default()
        };
        let mut session = EditSession::begin(store).map_err(SyncError::BeginEdit)?;
        let additions = self.build_features(&plan.to_add, session.store(), &mut report);
        apply_additions(&mut session, additions, &mut report);
        apply_deletions(&mut session, &plan.to_delete, &mut report);
        session.commit().map_err(SyncError::Commit)?;

        info!(
            "sync committed: {} added, {} deleted, {} failed",
            report.added.len(),
            report.deleted.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn build_features<St: FeatureStore + ?Sized>(
        &self,
        ids: &BTreeSet<String>,
        store: &St,
        report: &mut SyncReport,
    ) -> Vec<(String, Feature)> {
        let mut additions = Vec::with_capacity(ids.len());
        for raw in ids {
            match self.fetch_geometry(raw) {
                Ok(geometry) => {
                    additions.push((raw.clone(), build_feature(store, raw, geometry)));
                }
                Err(failure) => {
                    warn!("{failure}");
                    report.failures.push(failure);
                }
            }
        }
        additions
    }

    fn fetch_geometry(&self, raw: &str) -> Result<ParcelGeometry, SyncFailure> {
        let id = ParcelId::parse(raw)
            .map_err(|err| SyncFailure::new(raw, FailureStage::ParseId, err))?;
        let url = self.config.request_url(&id);
        let body = self
            .source
            .fetch(&url)
            .map_err(|err| SyncFailure::new(raw, FailureStage::Fetch, err))?;
        parse_response(&body).map_err(|err| SyncFailure::new(raw, FailureStage::Response, err))
    }
}

fn build_feature<St: FeatureStore + ?Sized>(
    store: &St,
    raw: &str,
    geometry: ParcelGeometry,
) -> Feature {
    let mut feature = Feature::new(store.fields());
    feature.set_geometry_wkt(geometry.into_wkt());
    if let Err(err) = feature.set_attribute(PARCEL_FIELD, raw) {
        warn!("{raw:?}: adding feature without its parcel id: {err}");
    }
    feature
}

fn apply_additions<St: FeatureStore + ?Sized>(
    session: &mut EditSession<'_, St>,
    additions: Vec<(String, Feature)>,
    report: &mut SyncReport,
) {
    if additions.is_empty() {
        return;
    }
    let (ids, features): (Vec<String>, Vec<Feature>) = additions.into_iter().unzip();
    match session.store_mut().add_features(&features) {
        Ok(_) => {
            for id in &ids {
                info!("{id:?}: added");
            }
            report.added = ids;
        }
        Err(err) => report.fail_all(ids.iter().map(String::as_str), FailureStage::Add, err),
    }
}

fn apply_deletions<St: FeatureStore + ?Sized>(
    session: &mut EditSession<'_, St>,
    ids: &BTreeSet<String>,
    report: &mut SyncReport,
) {
    let mut resolved: Vec<&str> = Vec::with_capacity(ids.len());
    let mut handles: Vec<FeatureId> = Vec::new();
    for id in ids {
        match session.store().query_by_attribute(PARCEL_FIELD, id) {
            Ok(found) if found.is_empty() => {
                debug!("{id:?}: no features left to delete");
            }
            Ok(found) => {
                resolved.push(id);
                handles.extend(found);
            }
            Err(err) => {
                let failure =
                    SyncFailure::new(id, FailureStage::Resolve, ParcelError::Store(Arc::new(err)));
                warn!("{failure}");
                report.failures.push(failure);
            }
        }
    }
    if handles.is_empty() {
        return;
    }

    match session.store_mut().delete_features(&handles) {
        Ok(count) => {
            report.deleted = resolved.iter().map(|id| (*id).to_owned()).collect();
            report.deleted_features = count;
        }
        Err(err) => report.fail_all(resolved, FailureStage::Delete, err),
    }
}

/// Parcel ids of every feature in the layer, in store order.
///
/// Features without an id are skipped; ids shared by several features are
/// repeated. The result is suitable for repopulating an input list.
///
/// # Errors
///
/// Returns [`StoreError`] when the layer cannot be scanned.
pub fn existing_parcel_ids<St: FeatureStore + ?Sized>(
    store: &St,
) -> Result<Vec<String>, StoreError> {
    Ok(store.feature_parcel_ids()?.into_iter().flatten().collect())
}

/// Split free text on `\n` into trimmed lines.
///
/// Every segment is kept, including a trailing empty one, so empty text
/// yields a single blank line that the sync reports as malformed.
///
/// # Examples
///
/// ```
/// use parcel_core::split_input;
///
/// assert_eq!(split_input(" 14-1 \r\n\n14-2"), vec!["14-1", "", "14-2"]);
/// assert_eq!(split_input("14-1\n"), vec!["14-1", ""]);
/// assert_eq!(split_input(""), vec![""]);
/// ```
#[must_use]
pub fn split_input(text: &str) -> Vec<String> {
    text.split('\n').map(|line| line.trim().to_owned()).collect()
}
