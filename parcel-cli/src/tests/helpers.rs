//! Test helpers for temporary layers and canned lookup sources.

use super::*;
use crate::sync::{SyncConfig, SyncSourceBuilder};
use camino::{Utf8Path, Utf8PathBuf};
use parcel_core::test_support::{StubParcelSource, UNIT_SQUARE_WKT};
use parcel_core::{EditSession, Feature, FeatureStore, PARCEL_FIELD, ParcelId, ParcelSource};
use parcel_data::SqlitePolygonLayer;
use tempfile::TempDir;

/// Temporary directory holding a database path and an id list path.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("parcels.sqlite")
    }

    pub(super) fn ids_file(&self) -> Utf8PathBuf {
        self.root.join("ids.txt")
    }

    /// Create the default layer holding one square per parcel id.
    pub(super) fn seed_layer(&self, parcels: &[&str]) {
        let mut layer =
            SqlitePolygonLayer::create(&self.database(), DEFAULT_LAYER).expect("create layer");
        if parcels.is_empty() {
            return;
        }
        let features: Vec<Feature> = parcels
            .iter()
            .map(|parcel| {
                let mut feature = Feature::new(layer.fields());
                feature
                    .set_attribute(PARCEL_FIELD, *parcel)
                    .expect("parcel field");
                feature.set_geometry_wkt(UNIT_SQUARE_WKT);
                feature
            })
            .collect();
        let mut session = EditSession::begin(&mut layer).expect("begin");
        session.store_mut().add_features(&features).expect("seed");
        session.commit().expect("commit");
    }

    /// Distinct parcel ids stored in the default layer.
    pub(super) fn stored_ids(&self) -> Vec<String> {
        let layer = SqlitePolygonLayer::open(&self.database(), DEFAULT_LAYER).expect("open layer");
        layer.list_parcel_ids().expect("scan").into_iter().collect()
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path, contents).expect("write file");
}

/// Builder answering the given parcel ids with a unit square.
#[derive(Debug, Default)]
pub(super) struct StubSourceBuilder {
    pub(super) known: Vec<&'static str>,
}

impl StubSourceBuilder {
    pub(super) fn knowing(known: &[&'static str]) -> Self {
        Self {
            known: known.to_vec(),
        }
    }
}

impl SyncSourceBuilder for StubSourceBuilder {
    fn build(&self, config: &SyncConfig) -> Result<Box<dyn ParcelSource>, CliError> {
        let source = self.known.iter().fold(StubParcelSource::new(), |source, raw| {
            let id = ParcelId::parse(raw).expect("valid stub id");
            source.with_parcel(&config.service, &id, UNIT_SQUARE_WKT)
        });
        Ok(Box::new(source))
    }
}
