//! Build orchestration against a recording tile engine.

mod fixtures;

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use mapt::build::{BuildError, BuildMode, BuildRequest, Builder, EngineInvocation, TileEngine};
use mapt::inputs::InputError;
use mapt::Project;
use mlua::Lua;

/// What the engine saw on one run, captured before scratch files go away
struct Run {
    invocation: EngineInvocation,
    config: serde_json::Value,
    process: String,
}

struct RecordingEngine {
    codes: RefCell<Vec<i32>>,
    runs: RefCell<Vec<Run>>,
}

impl RecordingEngine {
    fn new(codes: &[i32]) -> Self {
        Self {
            codes: RefCell::new(codes.iter().rev().copied().collect()),
            runs: RefCell::new(Vec::new()),
        }
    }
}

impl TileEngine for RecordingEngine {
    fn run(&self, invocation: &EngineInvocation) -> Result<i32, BuildError> {
        let config = serde_json::from_str(&fs::read_to_string(&invocation.config)?)?;
        let process = fs::read_to_string(&invocation.process)?;
        self.runs.borrow_mut().push(Run {
            invocation: invocation.clone(),
            config,
            process,
        });
        Ok(self.codes.borrow_mut().pop().unwrap_or(0))
    }
}

fn load(root: &Path) -> Project {
    Project::load_with_host(root, None, None, None).unwrap()
}

fn request(mode: BuildMode) -> BuildRequest {
    BuildRequest {
        inputs: vec![PathBuf::from("region.osm.pbf")],
        mode,
        ..Default::default()
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap()
}

#[test]
fn test_single_build_invokes_engine_once() {
    let project_dir = fixtures::copy_project();
    let scratch = tempfile::tempdir().unwrap();
    let project = load(project_dir.path());
    let engine = RecordingEngine::new(&[0]);

    let req = BuildRequest {
        passthrough: vec!["--threads".to_string(), "2".to_string()],
        ..request(BuildMode::Single)
    };
    let summary = Builder::new(&project, &engine)
        .with_scratch_dir(scratch.path())
        .run(&req)
        .unwrap();

    let runs = engine.runs.borrow();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];

    assert!(run.invocation.inputs[0].is_absolute());
    assert!(run.invocation.inputs[0].ends_with("region.osm.pbf"));
    assert_eq!(run.invocation.output.file_name().unwrap(), "tiles.pmtiles");
    assert_eq!(
        canonical(run.invocation.output.parent().unwrap()),
        canonical(project_dir.path())
    );
    assert_eq!(
        canonical(run.invocation.working_dir.as_deref().unwrap()),
        canonical(&project_dir.path().join("slices"))
    );
    assert_eq!(run.invocation.passthrough, ["--threads", "2"]);

    assert_eq!(run.config["settings"]["minzoom"], 0);
    assert_eq!(run.config["settings"]["maxzoom"], 14);
    let layers: Vec<&String> = run.config["layers"].as_object().unwrap().keys().collect();
    assert_eq!(layers, ["roads", "water", "ocean"]);

    assert!(run.process.contains("roads.lua"));
    assert!(run.process.contains("water.lua"));

    assert_eq!(summary.outputs, [run.invocation.output.clone()]);
    let names: Vec<&str> = summary.slices.iter().map(|s| s.slice.as_str()).collect();
    assert_eq!(names, ["roads", "water"]);
    assert!(summary.slices.iter().all(|s| s.script_sha256.is_some()));

    // Scratch files are gone once the build returns
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn test_generated_process_script_runs_modules() {
    let project_dir = fixtures::copy_project();
    let scratch = tempfile::tempdir().unwrap();
    let project = load(project_dir.path());
    let engine = RecordingEngine::new(&[0]);

    Builder::new(&project, &engine)
        .with_scratch_dir(scratch.path())
        .run(&request(BuildMode::Single))
        .unwrap();

    let runs = engine.runs.borrow();
    let lua = Lua::new();
    lua.load(fixtures::ENGINE_STUBS).exec().unwrap();
    lua.load(runs[0].process.as_str()).set_name("=process").exec().unwrap();

    lua.load(r#"tags = { highway = "motorway", natural = "water" }; way_function()"#)
        .exec()
        .unwrap();
    let emitted: Vec<String> = lua
        .globals()
        .get::<mlua::Table>("emitted")
        .unwrap()
        .sequence_values::<String>()
        .collect::<mlua::Result<_>>()
        .unwrap();
    assert_eq!(emitted, ["layer:roads", "attr:class=major", "layer:water"]);
}

#[test]
fn test_many_mode_builds_each_slice_in_order() {
    let project_dir = fixtures::copy_project();
    let scratch = tempfile::tempdir().unwrap();
    let project = load(project_dir.path());
    let engine = RecordingEngine::new(&[0, 0]);

    let summary = Builder::new(&project, &engine)
        .with_scratch_dir(scratch.path())
        .run(&request(BuildMode::Many))
        .unwrap();

    let runs = engine.runs.borrow();
    let outputs: Vec<&str> = runs
        .iter()
        .map(|r| r.invocation.output.file_name().unwrap().to_str().unwrap())
        .collect();
    assert_eq!(outputs, ["roads.pmtiles", "water.pmtiles"]);

    // Each run gets only its own slice's layers and module
    let roads_layers: Vec<&String> = runs[0].config["layers"].as_object().unwrap().keys().collect();
    assert_eq!(roads_layers, ["roads"]);
    assert_eq!(runs[0].config["settings"]["basezoom"], 12);
    assert!(runs[1].invocation.process.ends_with("water.lua"));
    assert_eq!(summary.outputs.len(), 2);
}

#[test]
fn test_many_mode_stops_at_failing_slice() {
    let project_dir = fixtures::copy_project();
    let scratch = tempfile::tempdir().unwrap();
    let project = load(project_dir.path());
    let engine = RecordingEngine::new(&[0, 9]);

    let err = Builder::new(&project, &engine)
        .with_scratch_dir(scratch.path())
        .run(&request(BuildMode::Many))
        .unwrap_err();

    assert!(matches!(
        &err,
        BuildError::EngineFailed { slice: Some(s), code: 9 } if s == "water"
    ));
    assert_eq!(err.exit_code(), 9);
    assert!(err.to_string().contains("water"));
    assert_eq!(engine.runs.borrow().len(), 2);
}

#[test]
fn test_selected_slices_only() {
    let project_dir = fixtures::copy_project();
    let scratch = tempfile::tempdir().unwrap();
    let project = load(project_dir.path());
    let engine = RecordingEngine::new(&[0]);

    let req = BuildRequest {
        slices: vec!["water".to_string()],
        ..request(BuildMode::Single)
    };
    Builder::new(&project, &engine)
        .with_scratch_dir(scratch.path())
        .run(&req)
        .unwrap();

    let runs = engine.runs.borrow();
    let layers: Vec<&String> = runs[0].config["layers"].as_object().unwrap().keys().collect();
    assert_eq!(layers, ["water", "ocean"]);
    assert!(!runs[0].process.contains("roads.lua"));
}

#[test]
fn test_unknown_slice_is_rejected_before_engine_runs() {
    let project_dir = fixtures::copy_project();
    let project = load(project_dir.path());
    let engine = RecordingEngine::new(&[]);

    let req = BuildRequest {
        slices: vec!["rail".to_string()],
        ..request(BuildMode::Single)
    };
    let err = Builder::new(&project, &engine).run(&req).unwrap_err();

    match &err {
        BuildError::Input(InputError::UnknownSlice { name, .. }) => assert_eq!(name, "rail"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 1);
    assert!(engine.runs.borrow().is_empty());
}

#[test]
fn test_script_error_aborts_before_engine_runs() {
    let project_dir = fixtures::copy_project();
    fixtures::write(project_dir.path(), "slices/water.lua", "function way_function(");
    let project = load(project_dir.path());
    let engine = RecordingEngine::new(&[]);

    let err = Builder::new(&project, &engine)
        .with_scratch_dir(project_dir.path())
        .run(&request(BuildMode::Single))
        .unwrap_err();

    assert!(matches!(err, BuildError::Script(_)));
    assert_eq!(err.exit_code(), 3);
    assert!(engine.runs.borrow().is_empty());
}

#[test]
fn test_keep_files_retains_scratch() {
    let project_dir = fixtures::copy_project();
    let scratch = tempfile::tempdir().unwrap();
    let project = load(project_dir.path());
    let engine = RecordingEngine::new(&[0]);

    let req = BuildRequest {
        keep_files: true,
        ..request(BuildMode::Single)
    };
    let summary = Builder::new(&project, &engine)
        .with_scratch_dir(scratch.path())
        .run(&req)
        .unwrap();

    let work = summary.work_dir.clone().unwrap();
    assert!(work.starts_with(scratch.path()));
    for name in ["config.json", "process.lua", "build_summary.json"] {
        assert!(work.join(name).is_file(), "{name} missing");
    }

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(work.join("build_summary.json")).unwrap()).unwrap();
    assert_eq!(written["mode"], "single");
    assert_eq!(written["slices"].as_array().unwrap().len(), 2);
}

#[test]
fn test_dry_run_leaves_no_archive() {
    let project_dir = fixtures::copy_project();
    let scratch = tempfile::tempdir().unwrap();
    let project = load(project_dir.path());
    let engine = RecordingEngine::new(&[0]);

    let req = BuildRequest {
        dry_run: true,
        ..request(BuildMode::Single)
    };
    let summary = Builder::new(&project, &engine)
        .with_scratch_dir(scratch.path())
        .run(&req)
        .unwrap();

    let runs = engine.runs.borrow();
    assert_eq!(runs[0].config["settings"]["minzoom"], 0);
    assert_eq!(runs[0].config["settings"]["maxzoom"], 0);
    assert!(runs[0].invocation.output.starts_with(scratch.path()));
    assert!(summary.outputs.is_empty());
    assert!(!project_dir.path().join("tiles.pmtiles").exists());
}

#[test]
fn test_extension_settings_reach_the_engine() {
    let project_dir = fixtures::copy_project();
    fixtures::write(
        project_dir.path(),
        "slices/roads.json",
        r#"{
            settings: { minzoom: 5, maxzoom: 14, high_resolution: true },
            layers: { roads: { zindex: 20 } },
        }"#,
    );
    let scratch = tempfile::tempdir().unwrap();
    let project = load(project_dir.path());

    let single = RecordingEngine::new(&[0]);
    Builder::new(&project, &single)
        .with_scratch_dir(scratch.path())
        .run(&request(BuildMode::Single))
        .unwrap();
    assert_eq!(single.runs.borrow()[0].config["settings"]["high_resolution"], true);

    let many = RecordingEngine::new(&[0, 0]);
    Builder::new(&project, &many)
        .with_scratch_dir(scratch.path())
        .run(&request(BuildMode::Many))
        .unwrap();
    let runs = many.runs.borrow();
    assert_eq!(runs[0].config["settings"]["high_resolution"], true);
    assert!(runs[1].config["settings"].get("high_resolution").is_none());
}
