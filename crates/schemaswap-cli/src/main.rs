//! CLI binary for schemaswap: validate substitutions and emit construction plans.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use schemaswap_core::config::SwapConfig;
use schemaswap_core::defaults;
use schemaswap_plan::planner::{self, format_plan};
use schemaswap_plan::{build_graph, storage};
use schemaswap_registry::RoleRegistry;

#[derive(Parser)]
#[command(name = "schemaswap", about = "Swappable schema-entity migration planner")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the construction plan and persist it to .schemaswap/plan.json
    Plan {
        /// Print the full plan instead of a summary
        #[arg(long)]
        verbose: bool,
    },

    /// Validate configured substitutions without writing anything
    Check,

    /// Export the dependency graph as DOT (Graphviz) or Mermaid flowchart
    Export {
        /// Output format: dot, mermaid
        #[arg(short, long, default_value = "dot")]
        format: String,
    },

    /// Show roles, bindings, and plan status
    Info,
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;

    match cli.command {
        Commands::Plan { verbose } => cmd_plan(&project_root, verbose),
        Commands::Check => cmd_check(&project_root),
        Commands::Export { format } => cmd_export(&project_root, &format),
        Commands::Info => cmd_info(&project_root),
    }
}

/// Build a finalized registry from the built-in library plus configuration.
fn load_registry(project_root: &std::path::Path) -> Result<(RoleRegistry, SwapConfig)> {
    let config = SwapConfig::load(project_root).context("failed to load configuration")?;
    let mut registry = RoleRegistry::new(defaults::builtin_library());
    let catalog = defaults::builtin_catalog();
    registry
        .apply_substitutions(&config.substitutions, &catalog)
        .context("invalid substitution configuration")?;
    registry.finalize();
    Ok((registry, config))
}

fn cmd_plan(project_root: &std::path::Path, verbose: bool) -> Result<()> {
    let (registry, config) = load_registry(project_root)?;
    let plan = planner::compute_plan(&registry)?;

    let previous = if storage::plan_exists(project_root) {
        Some(storage::load(project_root).context("failed to load previous plan")?)
    } else {
        None
    };

    storage::save(project_root, &plan, config.storage.pretty)?;

    match previous {
        Some(prev) if prev.fingerprint() == plan.fingerprint() => {
            println!("Plan unchanged (rev {})", plan.fingerprint());
        }
        Some(prev) => {
            println!(
                "Plan changed: rev {} -> {}",
                prev.fingerprint(),
                plan.fingerprint()
            );
        }
        None => println!("Plan written (rev {})", plan.fingerprint()),
    }

    if verbose {
        println!("\n{}", format_plan(&plan));
    } else {
        println!(
            "{} entities, {} relations -> {}",
            plan.create_count(),
            plan.relation_count(),
            storage::plan_file(project_root).display()
        );
    }
    Ok(())
}

fn cmd_check(project_root: &std::path::Path) -> Result<()> {
    let (registry, config) = load_registry(project_root)?;

    println!("Configuration OK ({} substitutions)", config.substitutions.len());
    for (role, model) in registry.resolved() {
        let marker = if config.substitutions.contains_key(role) {
            "substituted"
        } else {
            "default"
        };
        println!("  {role}: {} ({marker})", model.identifier);
    }
    for role in registry.unbound_roles() {
        println!("  {role}: UNBOUND (no default, no substitution)");
    }

    // Surface ordering problems now rather than at plan time.
    build_graph(&registry).context("dependency graph is not plannable")?;
    Ok(())
}

fn cmd_export(project_root: &std::path::Path, format: &str) -> Result<()> {
    let (registry, _) = load_registry(project_root)?;
    let graph = build_graph(&registry)?;
    match format {
        "dot" => print!("{}", graph.to_dot()),
        "mermaid" => print!("{}", graph.to_mermaid()),
        other => anyhow::bail!("unknown export format '{other}' (expected dot or mermaid)"),
    }
    Ok(())
}

fn cmd_info(project_root: &std::path::Path) -> Result<()> {
    let (registry, config) = load_registry(project_root)?;

    println!("Roles: {}", registry.library().len());
    println!("Substitutions: {}", config.substitutions.len());

    match build_graph(&registry) {
        Ok(graph) => {
            println!(
                "Relations: {} immediate, {} deferred",
                graph.immediate.len(),
                graph.deferred.len()
            );
            println!("Creation order: {}", graph.order.join(" -> "));
        }
        Err(err) => println!("Graph: ERROR ({err})"),
    }

    if storage::plan_exists(project_root) {
        let plan = storage::load(project_root)?;
        println!("Stored plan: rev {}", plan.fingerprint());
    } else {
        println!("Stored plan: none");
    }
    Ok(())
}
