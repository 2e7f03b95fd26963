//! Unit tests for the SQLite polygon layer.

use super::*;
use parcel_core::{EditSession, ParcelSync, ServiceConfig, test_support::StubParcelSource};
use rstest::{fixture, rstest};
use tempfile::TempDir;

const SQUARE: &str = "POLYGON((0 0,1 0,1 1,0 1,0 0))";

struct TempLayer {
    _dir: TempDir,
    path: Utf8PathBuf,
    layer: SqlitePolygonLayer,
}

#[fixture]
fn temp_layer() -> TempLayer {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    let path = root.join("nested/parcels.sqlite");
    let layer = SqlitePolygonLayer::create(&path, "parcels").expect("create layer");
    TempLayer {
        _dir: dir,
        path,
        layer,
    }
}

fn feature(layer: &SqlitePolygonLayer, parcel: &str, wkt: &str) -> Feature {
    let mut feature = Feature::new(layer.fields());
    feature.set_attribute(PARCEL_FIELD, parcel).expect("parcel field");
    feature.set_geometry_wkt(wkt);
    feature
}

fn add(layer: &mut SqlitePolygonLayer, parcels: &[&str]) -> Vec<FeatureId> {
    let features: Vec<Feature> = parcels
        .iter()
        .map(|parcel| feature(layer, parcel, SQUARE))
        .collect();
    let mut session = EditSession::begin(layer).expect("begin");
    let ids = session.store_mut().add_features(&features).expect("add");
    session.commit().expect("commit");
    ids
}

#[rstest]
fn created_layer_exposes_parcel_field(temp_layer: TempLayer) {
    assert_eq!(
        temp_layer.layer.fields().names().collect::<Vec<_>>(),
        vec![PARCEL_FIELD]
    );
    assert_eq!(temp_layer.layer.name(), "parcels");
    assert_eq!(temp_layer.layer.feature_count().expect("count"), 0);
}

#[rstest]
fn create_is_idempotent(temp_layer: TempLayer) {
    let TempLayer {
        _dir,
        path,
        mut layer,
    } = temp_layer;
    add(&mut layer, &["1-1"]);
    drop(layer);
    let again = SqlitePolygonLayer::create(&path, "parcels").expect("create again");
    assert_eq!(again.feature_count().expect("count"), 1);
}

#[rstest]
fn committed_features_survive_reopen(temp_layer: TempLayer) {
    let TempLayer {
        _dir,
        path,
        mut layer,
    } = temp_layer;
    let ids = add(&mut layer, &["14-123", "14-124"]);
    drop(layer);

    let reopened = SqlitePolygonLayer::open(&path, "parcels").expect("open");
    assert_eq!(
        reopened.feature_parcel_ids().expect("scan"),
        vec![Some("14-123".to_owned()), Some("14-124".to_owned())]
    );
    let stored = reopened
        .geometry_wkt(ids[0])
        .expect("lookup")
        .expect("feature exists");
    assert!(stored.starts_with("POLYGON"));
}

#[rstest]
fn rolled_back_session_discards_features(mut temp_layer: TempLayer) {
    {
        let features = vec![feature(&temp_layer.layer, "1-1", SQUARE)];
        let mut session = EditSession::begin(&mut temp_layer.layer).expect("begin");
        session.store_mut().add_features(&features).expect("add");
    }
    assert_eq!(temp_layer.layer.feature_count().expect("count"), 0);
}

#[rstest]
fn invalid_geometry_rejects_whole_batch(mut temp_layer: TempLayer) {
    let features = vec![
        feature(&temp_layer.layer, "1-1", SQUARE),
        feature(&temp_layer.layer, "1-2", "POINT(0 0)"),
    ];
    let mut session = EditSession::begin(&mut temp_layer.layer).expect("begin");
    let err = session
        .store_mut()
        .add_features(&features)
        .expect_err("point is not a polygon");
    assert_eq!(err.operation, "add features");
    assert!(session.store().list_parcel_ids().expect("scan").is_empty());
    session.commit().expect("commit");
    assert_eq!(temp_layer.layer.feature_count().expect("count"), 0);
}

#[rstest]
fn query_matches_every_feature_with_the_id(mut temp_layer: TempLayer) {
    let ids = add(&mut temp_layer.layer, &["2-2", "1-1", "2-2"]);
    let found = temp_layer
        .layer
        .query_by_attribute(PARCEL_FIELD, "2-2")
        .expect("query");
    assert_eq!(found, vec![ids[0], ids[2]]);
}

#[rstest]
fn query_rejects_unknown_attribute(temp_layer: TempLayer) {
    let err = temp_layer
        .layer
        .query_by_attribute("owner", "x")
        .expect_err("no owner column");
    assert!(err.to_string().contains("owner"));
}

#[rstest]
fn delete_counts_removed_rows(mut temp_layer: TempLayer) {
    let ids = add(&mut temp_layer.layer, &["1-1", "2-2"]);
    let mut session = EditSession::begin(&mut temp_layer.layer).expect("begin");
    let removed = session
        .store_mut()
        .delete_features(&[ids[0], ids[0], FeatureId(999)])
        .expect("delete");
    session.commit().expect("commit");
    assert_eq!(removed, 1);
    assert_eq!(
        temp_layer.layer.list_parcel_ids().expect("scan"),
        BTreeSet::from(["2-2".to_owned()])
    );
}

#[rstest]
fn writes_need_a_session(mut temp_layer: TempLayer) {
    let features = vec![feature(&temp_layer.layer, "1-1", SQUARE)];
    let err = temp_layer
        .layer
        .add_features(&features)
        .expect_err("no session");
    assert!(matches!(
        err.source.downcast_ref::<LayerError>(),
        Some(LayerError::NotEditing)
    ));
    temp_layer
        .layer
        .commit_edit()
        .expect_err("nothing to commit");
}

#[rstest]
fn nested_sessions_are_refused(mut temp_layer: TempLayer) {
    temp_layer.layer.begin_edit().expect("begin");
    let err = temp_layer.layer.begin_edit().expect_err("already editing");
    assert_eq!(err.operation, "begin edit session");
    temp_layer.layer.rollback_edit().expect("rollback");
}

#[rstest]
fn open_reports_missing_layer(temp_layer: TempLayer) {
    let err = SqlitePolygonLayer::open(&temp_layer.path, "plots").expect_err("no plots layer");
    assert!(matches!(err, LayerError::NotFound { ref layer, .. } if layer == "plots"));
    assert!(err.to_string().starts_with("there is no \"plots\" layer"));
}

#[rstest]
fn open_reports_missing_database(temp_layer: TempLayer) {
    let missing = temp_layer.path.with_file_name("absent.sqlite");
    let err = SqlitePolygonLayer::open(&missing, "parcels").expect_err("no file");
    assert!(matches!(err, LayerError::MissingDatabase { .. }));
}

#[rstest]
#[case("")]
#[case("parcels; DROP TABLE x")]
#[case("dzia\u{142}ki")]
fn rejects_unsafe_layer_names(temp_layer: TempLayer, #[case] name: &str) {
    let err = SqlitePolygonLayer::create(&temp_layer.path, name).expect_err("invalid name");
    assert!(matches!(err, LayerError::InvalidName { .. }));
}

#[rstest]
fn layers_without_parcel_field_scan_as_nulls(temp_layer: TempLayer) {
    let connection = Connection::open(temp_layer.path.as_std_path()).expect("open raw");
    connection
        .execute_batch(
            "CREATE TABLE plots (fid INTEGER PRIMARY KEY, geometry TEXT NOT NULL, name TEXT);
             INSERT INTO plots (geometry, name) VALUES ('POLYGON((0 0,1 0,1 1,0 0))', 'a');",
        )
        .expect("seed plots");
    let plots = SqlitePolygonLayer::open(&temp_layer.path, "plots").expect("open plots");
    assert_eq!(plots.fields().names().collect::<Vec<_>>(), vec!["name"]);
    assert_eq!(plots.feature_parcel_ids().expect("scan"), vec![None]);
}

#[rstest]
fn sync_runs_against_sqlite(mut temp_layer: TempLayer) {
    add(&mut temp_layer.layer, &["14-124", "14-999"]);
    let config = ServiceConfig::new("141201_1", "2180").with_base_url("http://lookup.test/");
    let id = parcel_core::ParcelId::parse("14-123").expect("valid id");
    let source = StubParcelSource::new().with_parcel(&config, &id, SQUARE);

    let report = ParcelSync::new(&source, config)
        .sync(["14-123", "14-124"], &mut temp_layer.layer)
        .expect("sync");

    assert_eq!(report.added, vec!["14-123"]);
    assert_eq!(report.deleted, vec!["14-999"]);
    assert_eq!(
        temp_layer.layer.list_parcel_ids().expect("scan"),
        BTreeSet::from(["14-123".to_owned(), "14-124".to_owned()])
    );
}
