//! `provisio plan`: show what a change request would do

use crate::Context;
use crate::cli::PlanArgs;
use crate::request::RequestFile;
use crate::ui;
use anyhow::Result;
use provisioning::{DirectPlanner, Planner};

use super::Setup;

pub fn run(_ctx: &Context, args: PlanArgs) -> Result<()> {
    let setup = Setup::load()?;
    let request = RequestFile::load(&args.request)?;
    if request.is_empty() {
        ui::warn(&format!("{} requests no changes", args.request.display()));
        return Ok(());
    }
    let profile_id = setup.profile_id(args.profile.as_deref());
    let stored = setup
        .store
        .load_or_create(&profile_id, &setup.config.profile_properties())?;

    ui::header(&format!("Plan for profile '{profile_id}'"));
    if !setup.store.exists(&profile_id) {
        ui::dim("Profile does not exist yet; it will be created on apply");
    }

    let plan = DirectPlanner.plan(&stored.profile, &request.to_change_request());
    super::print_plan(&plan);

    if plan.status().is_failure() {
        anyhow::bail!("Planning failed");
    }
    Ok(())
}
