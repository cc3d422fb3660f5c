pub mod apply;
pub mod phases;
pub mod plan;
pub mod profile;

use crate::artifacts::ArtifactCache;
use crate::config::ProvisioConfig;
use crate::state::ProfileStore;
use crate::{paths, touchpoint, ui};
use anyhow::{Context as AnyhowContext, Result};
use chrono::Utc;
use colored::Colorize;
use provisioning::{
    OperandKind, PhaseSet, ProvisioningContext, ProvisioningPlan, StandardPhases,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Config, profile store and cache location shared by the commands
pub struct Setup {
    pub config: ProvisioConfig,
    pub store: ProfileStore,
    pub cache_dir: PathBuf,
}

impl Setup {
    pub fn load() -> Result<Self> {
        Ok(Self {
            config: ProvisioConfig::load()?,
            store: ProfileStore::open()?,
            cache_dir: paths::cache_dir()?,
        })
    }

    pub fn profile_id(&self, given: Option<&str>) -> String {
        given.map_or_else(|| self.config.default_profile.clone(), str::to_string)
    }

    /// Backup area for one run, unique per process
    pub fn run_backup_dir(&self) -> PathBuf {
        self.cache_dir.join("backup").join(format!(
            "{}-{}",
            Utc::now().format("%Y%m%d%H%M%S"),
            std::process::id()
        ))
    }

    /// Phase set from the configured phases, wired to the native touchpoint
    ///
    /// `remove` moves what it takes away into `backup_dir`.
    pub fn phases(&self, backup_dir: &Path) -> Result<PhaseSet> {
        let registry = touchpoint::registry(backup_dir.to_path_buf());
        let sink = ArtifactCache::new(self.cache_dir.join("artifacts"));
        StandardPhases::new(Arc::new(registry))
            .with_artifact_sink(Arc::new(sink))
            .build_from(&self.config.phases)
            .context("Invalid phase configuration")
    }

    /// Context for a run: configured properties plus `os` and `arch`
    pub fn context(&self) -> ProvisioningContext {
        let mut context = ProvisioningContext::new();
        for (key, value) in &self.config.context {
            context = context.with_property(key.clone(), value.clone());
        }
        if context.property("os").is_none() {
            context = context.with_property("os", std::env::consts::OS);
        }
        if context.property("arch").is_none() {
            context = context.with_property("arch", std::env::consts::ARCH);
        }
        context
    }
}

/// Print the operands of a plan and any planning messages
pub fn print_plan(plan: &ProvisioningPlan) {
    ui::section("Plan");
    if plan.is_empty() {
        ui::dim("No changes");
    }

    for operand in plan.operands() {
        match (operand.kind(), operand.first(), operand.second()) {
            (OperandKind::Install, _, Some(unit)) => {
                println!("  {} {}", "+".green(), unit);
            }
            (OperandKind::Uninstall, Some(unit), _) => {
                println!("  {} {}", "-".red(), unit);
            }
            (OperandKind::Update, Some(from), Some(to)) => {
                println!(
                    "  {} {} {} -> {}",
                    "~".yellow(),
                    to.id,
                    from.version.dimmed(),
                    to.version
                );
            }
            _ => println!("  {operand}"),
        }
    }

    println!();
    ui::kv("additions", &plan.additions().len().to_string());
    ui::kv("removals", &plan.removals().len().to_string());

    if !plan.status().is_ok() {
        println!();
        ui::status(plan.status());
    }
}
