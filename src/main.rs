//! mapt CLI
//!
//! Entry point for the `mapt` command-line tool.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};

use mapt::build::{BuildMode, BuildRequest, Builder, ProcessEngine};
use mapt::config::Project;
use mapt::error::MaptResult;
use mapt::merge::{merge, strip_outputs};
use mapt::script::compose;
use mapt::signal::InterruptHandler;
use mapt::style::{ArchiveLayout, StyleService};
use mapt::{logging, SliceSet};

#[derive(Parser)]
#[command(name = "mapt")]
#[command(about = "Compose map tile builds and styles from independent slices", version)]
struct Cli {
    /// Project directory (default: current directory)
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Project config file (default: <DIR>/mapt.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); MAPT_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build tile archives with the tile engine
    Build(BuildArgs),

    /// Validate slices with an output-free engine run (build --dry-run)
    Check(BuildArgs),

    /// Print the merged style document
    Style {
        /// Point every fragment at the combined archive
        #[arg(long)]
        single: bool,

        /// Point every fragment at an externally hosted archive
        #[arg(long, conflicts_with = "single", value_name = "URL")]
        url: Option<String>,
    },

    /// Print the merged slice configuration
    MergeConfig {
        /// Slices to merge (default: all)
        slices: Vec<String>,

        /// Force minzoom = maxzoom = 0
        #[arg(long)]
        strip_outputs: bool,

        /// Fail on merge warnings
        #[arg(long)]
        strict: bool,
    },

    /// Print the composite processing script
    ComposeScript {
        /// Slices to compose (default: all)
        slices: Vec<String>,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// One archive per slice instead of one combined archive
    #[arg(long)]
    many: bool,

    /// Merge and compose, run the engine without producing tiles
    #[arg(long)]
    dry_run: bool,

    /// Keep generated config and script files
    #[arg(long)]
    keep_files: bool,

    /// Fail on merge warnings
    #[arg(long)]
    strict: bool,

    /// Print the build summary as JSON
    #[arg(long)]
    json: bool,

    /// Input extracts (*.pbf) followed or preceded by slice names
    #[arg(value_name = "PBF|SLICE")]
    args: Vec<String>,

    /// Extra arguments for the tile engine (after --)
    #[arg(last = true)]
    passthrough: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> MaptResult<()> {
    let root = cli.directory.unwrap_or_else(|| PathBuf::from("."));
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Build(args) => run_build(&root, config, args, false),
        Commands::Check(args) => run_build(&root, config, args, true),
        Commands::Style { single, url } => run_style(&root, config, single, url),
        Commands::MergeConfig {
            slices,
            strip_outputs,
            strict,
        } => run_merge_config(&root, config, &slices, strip_outputs, strict),
        Commands::ComposeScript { slices } => run_compose_script(&root, config, &slices),
    }
}

fn run_build(root: &Path, config: Option<&Path>, args: BuildArgs, check: bool) -> MaptResult<()> {
    let project = Project::load(root, config, overrides(args.keep_files, args.strict))?;
    let (inputs, slices) = split_inputs(&args.args);

    let handler = InterruptHandler::new();
    handler.install()?;
    let engine = ProcessEngine::new(&project.config.engine).with_interrupt(handler.state());

    let request = BuildRequest {
        inputs,
        slices,
        mode: if args.many { BuildMode::Many } else { BuildMode::Single },
        dry_run: check || args.dry_run,
        keep_files: args.keep_files,
        passthrough: args.passthrough,
    };
    let summary = Builder::new(&project, &engine)
        .with_interrupt(handler.state())
        .run(&request)?;

    if args.json {
        println!("{}", summary.to_json()?);
    }
    Ok(())
}

fn run_style(root: &Path, config: Option<&Path>, single: bool, url: Option<String>) -> MaptResult<()> {
    let project = Project::load(root, config, None)?;
    let layout = match (single, url) {
        (_, Some(url)) => ArchiveLayout::External(url),
        (true, None) => ArchiveLayout::Single,
        (false, None) => ArchiveLayout::PerSlice,
    };
    let style = StyleService::new(&project).merged_style(&layout)?;
    println!("{}", style.to_json()?);
    Ok(())
}

fn run_merge_config(
    root: &Path,
    config: Option<&Path>,
    names: &[String],
    strip: bool,
    strict: bool,
) -> MaptResult<()> {
    let project = Project::load(root, config, overrides(false, strict))?;
    let configs = SliceSet::discover(&project.slices_dir())?
        .select(names)?
        .load_configs()?;
    let merged = merge(
        configs.iter().map(|(name, config)| (name.as_str(), config)),
        project.merge_options(),
    )?;

    let output = if strip {
        strip_outputs(&merged.config)
    } else {
        merged.config
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_compose_script(root: &Path, config: Option<&Path>, names: &[String]) -> MaptResult<()> {
    let project = Project::load(root, config, None)?;
    let modules = SliceSet::discover(&project.slices_dir())?
        .select(names)?
        .script_modules()?;
    let composed = compose(&modules)?;
    print!("{}", composed.source);
    Ok(())
}

/// CLI flags as a config layer; only flags that were given are set.
fn overrides(keep_files: bool, strict: bool) -> Option<Value> {
    let mut layer = Map::new();
    if keep_files {
        layer.insert("keep_files".to_string(), Value::Bool(true));
    }
    if strict {
        layer.insert("strict".to_string(), Value::Bool(true));
    }
    (!layer.is_empty()).then_some(Value::Object(layer))
}

/// Arguments ending in `.pbf` are input extracts; the rest name slices.
fn split_inputs(args: &[String]) -> (Vec<PathBuf>, Vec<String>) {
    let (pbfs, slices): (Vec<&String>, Vec<&String>) = args.iter().partition(|a| a.ends_with(".pbf"));
    (
        pbfs.into_iter().map(PathBuf::from).collect(),
        slices.into_iter().cloned().collect(),
    )
}
