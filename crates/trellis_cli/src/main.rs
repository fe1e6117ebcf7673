//! Trellis CLI
//!
//! Checks, plans, and compiles agent systems described in JSON files.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail};
use serde::Serialize;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use trellis_core::{EntityId, EntityKind, Hash};
use trellis_plan::{
    CompileStrategy, PlanOptions, Planner, Resolved, SystemInputs, SystemManager, TieBreak,
};

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Dependency planning for agent and workflow systems", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PlanArgs {
    /// Path to the system definition
    #[arg(short, long)]
    file: PathBuf,
    /// Ordering among ready nodes: lexical or declaration
    #[arg(long, default_value_t = TieBreak::Lexical)]
    tie_break: TieBreak,
    /// Skip input validation
    #[arg(long)]
    no_validate: bool,
    /// Reject systems with more nodes than this (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_nodes: usize,
}

impl PlanArgs {
    fn planner(&self) -> Planner {
        Planner::new(
            PlanOptions::new()
                .with_tie_break(self.tie_break)
                .with_validate_inputs(!self.no_validate)
                .with_max_nodes(self.max_nodes),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and plan a system
    Check {
        #[command(flatten)]
        args: PlanArgs,
    },
    /// Print the compilation order
    Plan {
        #[command(flatten)]
        args: PlanArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
        /// Fail unless the plan fingerprint equals this hex value
        #[arg(long)]
        expect: Option<String>,
    },
    /// Compile every node into a manifest
    Compile {
        #[command(flatten)]
        args: PlanArgs,
    },
}

/// Compiled form of one node: what it is and what it was linked against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Manifest {
    id: EntityId,
    kind: EntityKind,
    dependencies: Vec<EntityId>,
}

struct ManifestStrategy;

impl ManifestStrategy {
    fn manifest(
        id: &EntityId,
        kind: EntityKind,
        deps: &Resolved<'_, Manifest, Manifest>,
    ) -> Manifest {
        Manifest {
            id: id.clone(),
            kind,
            dependencies: deps.ids().map(EntityId::from).collect(),
        }
    }
}

impl CompileStrategy for ManifestStrategy {
    type Agent = Manifest;
    type Workflow = Manifest;
    type Error = Infallible;

    fn compile_agent(
        &mut self,
        id: &EntityId,
        deps: &Resolved<'_, Manifest, Manifest>,
    ) -> Result<Manifest, Infallible> {
        Ok(Self::manifest(id, EntityKind::Agent, deps))
    }

    fn compile_workflow(
        &mut self,
        id: &EntityId,
        deps: &Resolved<'_, Manifest, Manifest>,
    ) -> Result<Manifest, Infallible> {
        Ok(Self::manifest(id, EntityKind::Workflow, deps))
    }
}

#[derive(Serialize)]
struct PlanReport<'a> {
    order: &'a [EntityId],
    fingerprint: String,
}

fn load(path: &Path) -> Result<SystemInputs> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let inputs = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
    Ok(inputs)
}

fn check(args: &PlanArgs) -> Result<String> {
    let inputs = load(&args.file)?;
    let system = SystemManager::assemble(&inputs, &args.planner())?;
    Ok(format!(
        "{} agents, {} workflows, {} tools: ok",
        system.agents().len(),
        system.workflows().len(),
        system.tools().len()
    ))
}

fn plan(args: &PlanArgs, json: bool, expect: Option<&str>) -> Result<String> {
    let inputs = load(&args.file)?;
    let plan = args.planner().plan(&inputs)?;

    if let Some(expected) = expect {
        let expected = Hash::from_hex(expected.trim())
            .wrap_err("invalid --expect fingerprint")?;
        if expected != plan.fingerprint() {
            bail!(
                "plan fingerprint {} does not match expected {}",
                plan.fingerprint(),
                expected
            );
        }
    }
    let fingerprint = plan.fingerprint().to_hex();

    if json {
        let report = PlanReport {
            order: plan.order(),
            fingerprint,
        };
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = String::new();
    for id in plan.order() {
        if let Some(node) = plan.node(id.as_str()) {
            out.push_str(&format!("{:<8} {}\n", node.kind.as_str(), id));
        }
    }
    out.push_str(&format!("fingerprint {fingerprint}"));
    Ok(out)
}

fn compile(args: &PlanArgs) -> Result<String> {
    let inputs = load(&args.file)?;
    let system = SystemManager::assemble(&inputs, &args.planner())?;
    let compiled = system
        .compile(&mut ManifestStrategy)
        .map_err(|abort| abort.into_error())?;

    let manifests: Vec<&Manifest> = compiled
        .order()
        .iter()
        .filter_map(|id| {
            compiled
                .registries
                .agent(id.as_str())
                .or_else(|| compiled.registries.workflow(id.as_str()))
        })
        .collect();
    Ok(serde_json::to_string_pretty(&manifests)?)
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "trellis=debug" } else { "trellis=info" })
    });

    let registry = tracing_subscriber::registry().with(filter);

    match std::env::var("TRELLIS_LOG_FORMAT").as_deref() {
        Ok("json") => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        _ => registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .init(),
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = match cli.command {
        Commands::Check { args } => check(&args)?,
        Commands::Plan { args, json, expect } => plan(&args, json, expect.as_deref())?,
        Commands::Compile { args } => compile(&args)?,
    };
    println!("{output}");
    Ok(())
}
