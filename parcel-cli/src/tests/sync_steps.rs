//! Behaviour-driven step definitions driving the sync CLI scenarios.

use super::helpers::{StubSourceBuilder, Workspace, write_utf8};
use super::*;
use crate::sync::run_sync_with;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use std::cell::RefCell;

struct SyncWorld {
    workspace: Workspace,
    known: RefCell<Vec<&'static str>>,
    include_place: RefCell<bool>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl SyncWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            known: RefCell::new(vec!["14-123"]),
            include_place: RefCell::new(true),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec![
            "parcels".to_owned(),
            "sync".to_owned(),
            self.workspace.ids_file().into_string(),
            format!("--{ARG_DATABASE}"),
            self.workspace.database().into_string(),
            format!("--{ARG_CRS}"),
            "2180".to_owned(),
            format!("--{ARG_BASE_URL}"),
            "http://lookup.test/".to_owned(),
        ];
        if *self.include_place.borrow() {
            argv.extend([format!("--{ARG_PLACE}"), "141201_1".to_owned()]);
        }
        argv
    }

    fn report(&self) -> Value {
        let borrowed = self.result.borrow();
        let result = borrowed.as_ref().expect("result recorded");
        if let Err(err) = result {
            panic!("expected success, found {err:?}");
        }
        let stdout = String::from_utf8(self.stdout.borrow().clone()).expect("stdout utf-8");
        serde_json::from_str(&stdout).expect("output should be a JSON report")
    }
}

#[fixture]
fn world() -> SyncWorld {
    SyncWorld::new()
}

#[given("a layer holding parcels 14-124 and 14-999")]
fn layer_holding_parcels(#[from(world)] world: &SyncWorld) {
    world.workspace.seed_layer(&["14-124", "14-999"]);
}

#[given("an id file listing 14-123 and 14-124")]
fn id_file_listing(#[from(world)] world: &SyncWorld) {
    write_utf8(&world.workspace.ids_file(), b"14-123\n14-124");
}

#[given("the lookup service knows no parcels")]
fn service_knows_nothing(#[from(world)] world: &SyncWorld) {
    world.known.borrow_mut().clear();
}

#[given("I omit the place")]
fn omit_place(#[from(world)] world: &SyncWorld) {
    *world.include_place.borrow_mut() = false;
}

#[when("I run the sync command")]
fn run_sync_command(#[from(world)] world: &SyncWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Sync(args) => {
            let builder = StubSourceBuilder::knowing(&world.known.borrow());
            let mut buffer = world.stdout.borrow_mut();
            run_sync_with(args, &builder, &mut std::io::empty(), &mut *buffer)
        }
        Command::Init(_) | Command::List(_) => panic!("expected sync command"),
    });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds and reports 14-123 added and 14-999 deleted")]
fn reports_added_and_deleted(#[from(world)] world: &SyncWorld) {
    let report = world.report();
    assert_eq!(report["added"], serde_json::json!(["14-123"]));
    assert_eq!(report["deleted"], serde_json::json!(["14-999"]));
    assert_eq!(report["unchanged"], serde_json::json!(["14-124"]));
}

#[then("the command succeeds and reports 14-123 as a failed fetch")]
fn reports_failed_fetch(#[from(world)] world: &SyncWorld) {
    let report = world.report();
    assert_eq!(report["added"], serde_json::json!([]));
    let failures = report["failures"].as_array().expect("failures array");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["parcel_id"], "14-123");
    assert_eq!(failures[0]["stage"], "fetch");
}

#[then("the layer holds parcels 14-123 and 14-124")]
fn layer_holds_synced(#[from(world)] world: &SyncWorld) {
    assert_eq!(world.workspace.stored_ids(), vec!["14-123", "14-124"]);
}

#[then("the layer holds parcels 14-124")]
fn layer_holds_remaining(#[from(world)] world: &SyncWorld) {
    assert_eq!(world.workspace.stored_ids(), vec!["14-124"]);
}

#[then("the command fails because the place is missing")]
fn fails_missing_place(#[from(world)] world: &SyncWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, env } => {
            assert_eq!(*field, ARG_PLACE);
            assert_eq!(*env, ENV_SYNC_PLACE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
    assert!(world.stdout.borrow().is_empty());
}

macro_rules! register_sync_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/sync_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: SyncWorld) {
            let _ = world;
        }
    };
}

register_sync_scenario!(sync_from_file, "synchronising a layer from an id file");
register_sync_scenario!(sync_unknown_parcel, "reporting parcels the service does not know");
register_sync_scenario!(sync_missing_place, "rejecting a missing place");
