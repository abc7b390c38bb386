//! Read/write construction plan files from disk.
//!
//! The persisted plan is the diff surface between migration runs: an
//! executor applies `.schemaswap/plan.json`, and the next `plan` run
//! compares fingerprints against it.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::planner::{ConstructionPlan, PLAN_VERSION};

const SWAP_DIR: &str = ".schemaswap";
const PLAN_FILE: &str = "plan.json";

/// Get the path to the schemaswap directory for a given project root.
pub fn swap_dir(project_root: &Path) -> PathBuf {
    project_root.join(SWAP_DIR)
}

/// Get the path to the plan file for a given project root.
pub fn plan_file(project_root: &Path) -> PathBuf {
    swap_dir(project_root).join(PLAN_FILE)
}

/// Check if a persisted plan exists for the given project root.
pub fn plan_exists(project_root: &Path) -> bool {
    plan_file(project_root).exists()
}

/// Validate a plan's format version.
pub fn validate_version(plan: &ConstructionPlan) -> Result<()> {
    if plan.version != PLAN_VERSION {
        anyhow::bail!(
            "plan version mismatch: expected {}, found {}",
            PLAN_VERSION,
            plan.version
        );
    }
    Ok(())
}

/// Load a persisted plan from disk.
pub fn load(project_root: &Path) -> Result<ConstructionPlan> {
    let path = plan_file(project_root);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read plan from {}", path.display()))?;
    let plan: ConstructionPlan =
        serde_json::from_str(&json).context("failed to deserialize construction plan")?;
    validate_version(&plan)?;
    Ok(plan)
}

/// Save a plan to disk, creating the .schemaswap directory if needed.
pub fn save(project_root: &Path, plan: &ConstructionPlan, pretty: bool) -> Result<()> {
    let dir = swap_dir(project_root);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;

    let json = if pretty {
        serde_json::to_string_pretty(plan)
    } else {
        serde_json::to_string(plan)
    }
    .context("failed to serialize construction plan")?;

    let path = plan_file(project_root);
    fs::write(&path, json)
        .with_context(|| format!("failed to write plan to {}", path.display()))?;
    Ok(())
}
