//! Tile build orchestration
//!
//! Two modes:
//! - single: merge every selected slice's configuration, compose their
//!   scripts, and run the engine once into `tiles.pmtiles`
//! - many: run the engine once per slice into `<slice>.pmtiles`, in order,
//!   stopping at the first failure
//!
//! A dry run is a single-mode build with outputs stripped (`minzoom =
//! maxzoom = 0`) and the archive written into the scratch directory.

mod engine;
mod summary;
mod workdir;

pub use engine::{EngineInvocation, ProcessEngine, TileEngine};
pub use summary::{BuildSummary, SliceDigest, BUILD_SUMMARY_SCHEMA_VERSION};
pub use workdir::WorkDir;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Project;
use crate::inputs::{InputError, SliceInput, SliceSet};
use crate::merge::{merge, strip_outputs, MergeError, MergedConfig};
use crate::script::{compose, ScriptError, ScriptModule};
use crate::signal::{InterruptState, EXIT_CODE_CANCELLED};

/// Archive name for single-mode builds
pub const SINGLE_OUTPUT: &str = "tiles.pmtiles";

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("at least one input extract (.pbf) is required")]
    NoInputs,

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("failed to start tile engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("tile engine failed{}: exit code {code}", on_slice(.slice))]
    EngineFailed { slice: Option<String>, code: i32 },

    #[error("build cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn on_slice(slice: &Option<String>) -> String {
    slice
        .as_deref()
        .map(|s| format!(" on slice '{}'", s))
        .unwrap_or_default()
}

impl BuildError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::NoInputs => 1,
            BuildError::Input(_) => 1,
            BuildError::Merge(_) => 1,
            BuildError::Script(_) => 3,
            BuildError::Spawn { .. } => 127,
            BuildError::EngineFailed { code, .. } => *code,
            BuildError::Cancelled => EXIT_CODE_CANCELLED,
            BuildError::Io(_) => 1,
            BuildError::Serialization(_) => 1,
        }
    }
}

/// Build mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// All slices in one engine run
    #[default]
    Single,
    /// One engine run per slice
    Many,
}

/// Parameters of one build
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Source extracts
    pub inputs: Vec<PathBuf>,

    /// Slice names; empty means every slice
    pub slices: Vec<String>,

    pub mode: BuildMode,
    pub dry_run: bool,
    pub keep_files: bool,

    /// Extra engine arguments
    pub passthrough: Vec<String>,
}

/// Runs builds for one project
pub struct Builder<'a> {
    project: &'a Project,
    engine: &'a dyn TileEngine,
    interrupt: Arc<InterruptState>,
    scratch_dir: Option<PathBuf>,
}

impl<'a> Builder<'a> {
    pub fn new(project: &'a Project, engine: &'a dyn TileEngine) -> Self {
        Self {
            project,
            engine,
            interrupt: Arc::new(InterruptState::new()),
            scratch_dir: None,
        }
    }

    pub fn with_interrupt(mut self, interrupt: Arc<InterruptState>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Create scratch directories under `dir` instead of the system temp dir
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Run a build
    pub fn run(&self, request: &BuildRequest) -> Result<BuildSummary, BuildError> {
        if request.inputs.is_empty() {
            return Err(BuildError::NoInputs);
        }
        let inputs = request
            .inputs
            .iter()
            .map(std::path::absolute)
            .collect::<io::Result<Vec<_>>>()?;

        // Module paths end up in the generated script; keep them absolute
        let slices_dir = std::path::absolute(self.project.slices_dir())?;
        let slices = SliceSet::discover(&slices_dir)?.select(&request.slices)?;
        if slices.is_empty() {
            return Err(InputError::NoSlices(slices_dir).into());
        }

        let keep = request.keep_files || self.project.config.keep_files;
        let work = match &self.scratch_dir {
            Some(dir) => WorkDir::create_in(dir, keep)?,
            None => WorkDir::create(keep)?,
        };

        let mode = if request.dry_run { BuildMode::Single } else { request.mode };
        let mut summary = BuildSummary::new(mode, request.dry_run, inputs.clone());
        for slice in slices.iter() {
            summary.slices.push(SliceDigest::of(slice)?);
        }

        let started = Instant::now();
        let job = Job {
            inputs: &inputs,
            passthrough: &request.passthrough,
            working_dir: slices_dir.clone(),
            work: &work,
        };
        match mode {
            BuildMode::Single => self.build_single(&slices, &job, request.dry_run, &mut summary)?,
            BuildMode::Many => self.build_many(&slices, &job, &mut summary)?,
        }
        summary.duration_ms = started.elapsed().as_millis() as u64;

        if work.keeps_files() {
            summary.work_dir = Some(work.path().to_path_buf());
        }
        summary.write_to(&work.join("build_summary.json"))?;
        info!("{}", summary.human_summary());
        Ok(summary)
    }

    fn build_single(
        &self,
        slices: &SliceSet,
        job: &Job<'_>,
        dry_run: bool,
        summary: &mut BuildSummary,
    ) -> Result<(), BuildError> {
        let configs = slices.load_configs()?;
        let merged = merge(
            configs.iter().map(|(name, config)| (name.as_str(), config)),
            self.project.merge_options(),
        )?;
        let composed = compose(&slices.script_modules()?)?;

        let config = if dry_run {
            strip_outputs(&merged.config)
        } else {
            merged.config.clone()
        };
        let config_path = job.work.write("config.json", &serde_json::to_string_pretty(&config)?)?;
        let process_path = job.work.write("process.lua", &composed.source)?;

        let output = if dry_run {
            job.work.join(SINGLE_OUTPUT)
        } else {
            self.output_path(SINGLE_OUTPUT)?
        };

        info!(
            slices = %slices.names().collect::<Vec<_>>().join(","),
            output = %output.display(),
            dry_run,
            "building combined archive"
        );
        self.invoke(None, job.invocation(output.clone(), config_path, process_path))?;

        summary.warnings = merged.warnings;
        if !dry_run {
            summary.outputs.push(output);
        }
        Ok(())
    }

    fn build_many(&self, slices: &SliceSet, job: &Job<'_>, summary: &mut BuildSummary) -> Result<(), BuildError> {
        let total = slices.len();
        for (i, slice) in slices.iter().enumerate() {
            let (merged, module) = self.prepare_slice(slice)?;

            let config_path = job
                .work
                .write(&format!("{}.json", slice.name), &merged.to_json()?)?;
            let output = self.output_path(&format!("{}.pmtiles", slice.name))?;

            info!(
                slice = %slice.name,
                output = %output.display(),
                "building archive {}/{}",
                i + 1,
                total
            );
            self.invoke(
                Some(slice.name.as_str()),
                job.invocation(output.clone(), config_path, module.path),
            )?;

            summary.warnings.extend(merged.warnings);
            summary.outputs.push(output);
        }
        Ok(())
    }

    /// Validate one slice on its own before its engine run
    fn prepare_slice(&self, slice: &SliceInput) -> Result<(MergedConfig, ScriptModule), BuildError> {
        let config = slice.load_config()?;
        let merged = merge([(slice.name.as_str(), &config)], self.project.merge_options())?;
        let module = slice.script_module()?;
        compose(std::slice::from_ref(&module))?;
        Ok((merged, module))
    }

    fn output_path(&self, file_name: &str) -> Result<PathBuf, BuildError> {
        let dir = std::path::absolute(self.project.output_dir())?;
        fs::create_dir_all(&dir)?;
        Ok(dir.join(file_name))
    }

    fn invoke(&self, slice: Option<&str>, invocation: EngineInvocation) -> Result<(), BuildError> {
        if self.interrupt.is_cancel_requested() {
            return Err(BuildError::Cancelled);
        }

        let code = self.engine.run(&invocation)?;

        if self.interrupt.is_cancel_requested() {
            warn!(code, "tile engine interrupted");
            return Err(BuildError::Cancelled);
        }
        if code != 0 {
            return Err(BuildError::EngineFailed {
                slice: slice.map(str::to_string),
                code,
            });
        }
        Ok(())
    }
}

/// Per-build values shared by every engine run
struct Job<'a> {
    inputs: &'a [PathBuf],
    passthrough: &'a [String],
    working_dir: PathBuf,
    work: &'a WorkDir,
}

impl Job<'_> {
    fn invocation(&self, output: PathBuf, config: PathBuf, process: PathBuf) -> EngineInvocation {
        EngineInvocation {
            inputs: self.inputs.to_vec(),
            output,
            config,
            process,
            passthrough: self.passthrough.to_vec(),
            working_dir: Some(self.working_dir.clone()),
        }
    }
}
