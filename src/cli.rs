use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::config::{Config, OutputFormat};
use crate::error::PipelensError;
use crate::grid::{place_forest, place_tree};
use crate::output::{print_chain, print_pipelines, print_project, PhaseProgress};
use crate::pipeline::{build_project_tree, BuildCausalityResolver, LineageAssembler, PipelineNode};
use crate::store::{Build, BuildStore, Job, SnapshotStore};

#[derive(Parser)]
#[command(name = "pipelens")]
#[command(author, version, about = "Build Pipeline Viewer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./pipelens.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot file with jobs and builds
    #[arg(short, long, global = true, env = "PIPELENS_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the most recent runs of a pipeline
    Pipeline {
        /// First job of the pipeline
        #[arg(short, long)]
        job: Option<String>,

        /// Number of pipeline runs to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show the job graph with the latest build of each job
    Project {
        #[arg(short, long)]
        job: Option<String>,
    },
    /// List every build triggered downstream of one build
    Chain {
        #[arg(short, long)]
        job: String,

        #[arg(short, long)]
        build: u32,
    },
    /// Write the effective configuration, with flags applied, to a file
    Config {
        /// Destination file; the format follows its extension
        #[arg(short, long, default_value = "pipelens.toml")]
        output: PathBuf,
    },
}

/// Config file values with command-line flags applied on top.
#[derive(Debug)]
struct Settings {
    snapshot: PathBuf,
    first_job: Option<String>,
    displayed_builds: usize,
    base_url: Option<Url>,
    max_scan_depth: Option<usize>,
    format: OutputFormat,
    pretty: bool,
}

impl Cli {
    fn settings(&self, config: Config) -> Result<Settings> {
        let Some(snapshot) = self.snapshot.clone().or(config.snapshot.path) else {
            bail!("No snapshot file given; pass --snapshot or set [snapshot] path in the config");
        };

        let displayed_builds = match &self.command {
            Commands::Pipeline {
                limit: Some(limit), ..
            } => *limit,
            _ => config.view.displayed_builds,
        };
        if displayed_builds == 0 {
            bail!("The number of displayed builds must be at least 1");
        }

        let base_url = parse_base_url(config.view.base_url.as_deref())
            .context("Invalid base-url in config")?;
        info!("Using snapshot: {}", snapshot.display());

        Ok(Settings {
            snapshot,
            first_job: config.view.first_job,
            displayed_builds,
            base_url,
            max_scan_depth: config.resolver.max_scan_depth,
            format: if self.json {
                OutputFormat::Json
            } else {
                config.output.format
            },
            pretty: self.pretty || config.output.pretty,
        })
    }

    fn execute_pipeline(&self, settings: &Settings, job: Option<&str>) -> Result<()> {
        let progress = PhaseProgress::start_phase_1();
        let store = load_store(&settings.snapshot)?;
        let progress = progress.finish_phase_1_start_phase_2(store.jobs().len());

        let root = select_job(&store, job.or(settings.first_job.as_deref()))?;
        info!(
            "Assembling {} pipeline runs of {}",
            settings.displayed_builds, root.name
        );

        let resolver =
            BuildCausalityResolver::new(&store).with_max_scan_depth(settings.max_scan_depth);
        let assembler = LineageAssembler::new(&store).with_resolver(resolver);
        let mut trees = assembler
            .build_pipeline_history(&root, settings.displayed_builds)?
            .collect::<crate::error::Result<Vec<_>>>()?;

        let progress =
            progress.finish_phase_2_start_phase_3(trees.iter().map(PipelineNode::node_count).sum());
        if settings.format == OutputFormat::Json {
            progress.finish_phase_3();
            trees.iter_mut().for_each(redact_node);
            return emit_json(&trees, settings.pretty);
        }

        let grid = place_forest(&trees);
        progress.finish_phase_3();

        print_pipelines(&root.name, &grid, settings.base_url.as_ref());
        Ok(())
    }

    fn execute_project(&self, settings: &Settings, job: Option<&str>) -> Result<()> {
        let progress = PhaseProgress::start_phase_1();
        let store = load_store(&settings.snapshot)?;
        let progress = progress.finish_phase_1_start_phase_2(store.jobs().len());

        let root = select_job(&store, job.or(settings.first_job.as_deref()))?;
        let tree = build_project_tree(&store, &root);

        let progress = progress.finish_phase_2_start_phase_3(project_node_count(&tree));
        if settings.format == OutputFormat::Json {
            progress.finish_phase_3();
            return emit_json(&tree, settings.pretty);
        }

        let grid = place_tree(&tree);
        progress.finish_phase_3();

        print_project(&grid, settings.base_url.as_ref());
        Ok(())
    }

    fn execute_chain(&self, settings: &Settings, job: &str, number: u32) -> Result<()> {
        let progress = PhaseProgress::start_phase_1();
        let store = load_store(&settings.snapshot)?;
        let progress = progress.finish_phase_1_start_phase_2(store.jobs().len());

        let top_build = find_build(&store, job, number)?;
        let resolver =
            BuildCausalityResolver::new(&store).with_max_scan_depth(settings.max_scan_depth);
        let mut chain = resolver.resolve_full_downstream_chain(&top_build)?;

        let progress = progress.finish_phase_2_start_phase_3(chain.len());
        progress.finish_phase_3();

        match settings.format {
            OutputFormat::Json => {
                chain.iter_mut().for_each(redact_build);
                emit_json(&chain, settings.pretty)
            }
            OutputFormat::Table => {
                print_chain(&chain, settings.base_url.as_ref());
                Ok(())
            }
        }
    }

    /// Config file values with the global flags written into them.
    fn effective_config(&self, mut config: Config) -> Config {
        if let Some(snapshot) = &self.snapshot {
            config.snapshot.path = Some(snapshot.clone());
        }
        if self.json {
            config.output.format = OutputFormat::Json;
        }
        config.output.pretty |= self.pretty;
        config
    }

    fn execute_config(&self, config: Config, output: &Path) -> Result<()> {
        let config = self.effective_config(config);
        config.validate()?;
        config.save(output)?;
        info!("Configuration written to: {}", output.display());
        Ok(())
    }

    pub fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Pipeline { job, .. } => {
                self.execute_pipeline(&self.settings(config)?, job.as_deref())
            }
            Commands::Project { job } => {
                self.execute_project(&self.settings(config)?, job.as_deref())
            }
            Commands::Chain { job, build } => {
                self.execute_chain(&self.settings(config)?, job, *build)
            }
            Commands::Config { output } => self.execute_config(config, output),
        }
    }
}

fn parse_base_url(raw: Option<&str>) -> crate::error::Result<Option<Url>> {
    Ok(raw.map(Url::parse).transpose()?)
}

fn load_store(path: &Path) -> Result<SnapshotStore> {
    SnapshotStore::load(path)
        .with_context(|| format!("Failed to load snapshot: {}", path.display()))
}

/// Picks the named job, or the first job of the snapshot when none is named.
fn select_job<S: BuildStore + ?Sized>(store: &S, name: Option<&str>) -> Result<Job> {
    if let Some(name) = name {
        return Ok(store.job(name)?);
    }

    match store.jobs().into_iter().next() {
        Some(job) => {
            info!("No first job configured, using {}", job.name);
            Ok(job)
        }
        None => bail!("The snapshot contains no jobs"),
    }
}

fn find_build<S: BuildStore + ?Sized>(store: &S, job: &str, number: u32) -> Result<Build> {
    let job = store.job(job)?;
    store
        .builds_of(&job)?
        .into_iter()
        .find(|build| build.number() == number)
        .ok_or_else(|| {
            PipelensError::BuildNotFound {
                job: job.name.clone(),
                number,
            }
            .into()
        })
}

fn project_node_count(node: &crate::pipeline::ProjectNode) -> usize {
    1 + node.downstream.iter().map(project_node_count).sum::<usize>()
}

fn redact_build(build: &mut Build) {
    build.parameters = build.unsensitive_parameters();
}

fn redact_node(node: &mut PipelineNode) {
    if let Some(build) = node.build.as_mut() {
        redact_build(build);
    }
    node.downstream.iter_mut().for_each(redact_node);
}

fn emit_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json_output}");
    Ok(())
}
