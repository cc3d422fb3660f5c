//! `provisio apply`: plan a change request and run it through the engine

use crate::Context;
use crate::cli::ApplyArgs;
use crate::progress::PhaseProgress;
use crate::request::RequestFile;
use crate::touchpoint::native;
use crate::ui;
use anyhow::{Result, bail};
use provisioning::{CancellationToken, DirectPlanner, Engine, Planner};

use super::Setup;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let setup = Setup::load()?;
    let request = RequestFile::load(&args.request)?;
    if request.is_empty() {
        ui::warn(&format!("{} requests no changes", args.request.display()));
        return Ok(());
    }
    let profile_id = setup.profile_id(args.profile.as_deref());
    let mut stored = setup
        .store
        .load_or_create(&profile_id, &setup.config.profile_properties())?;

    ui::header(&format!("Applying to profile '{profile_id}'"));

    let plan = DirectPlanner.plan(&stored.profile, &request.to_change_request());
    super::print_plan(&plan);

    if plan.status().is_failure() {
        bail!("Planning failed; nothing was applied");
    }
    if plan.is_empty() {
        println!();
        ui::success("Nothing to do");
        return Ok(());
    }
    if args.dry_run {
        println!();
        ui::warn("Dry run - no changes will be made");
        return Ok(());
    }
    if !args.yes && !confirm_proceed()? {
        ui::info("Aborted");
        return Ok(());
    }

    let backup_dir = setup.run_backup_dir();
    let phases = setup.phases(&backup_dir)?;
    log::info!(
        "Running {} operand(s) through phases {:?}",
        plan.operands().len(),
        phases.ids()
    );

    let mut progress = PhaseProgress::new(ctx.quiet);
    let status = Engine::new().perform_with_progress(
        &mut stored.profile,
        &phases,
        plan.operands(),
        &setup.context(),
        &CancellationToken::new(),
        &mut progress,
    );
    progress.finish();

    if status.is_failure() {
        println!();
        ui::status(&status);
        match native::release_backups(&backup_dir) {
            Ok(true) => {}
            Ok(false) => ui::warn(&format!(
                "Some removed files were not restored; they are kept in {}",
                backup_dir.display()
            )),
            Err(err) => log::warn!("Could not clean up {}: {err:#}", backup_dir.display()),
        }
        bail!("Provisioning failed; profile '{profile_id}' was rolled back");
    }

    setup.store.save(&mut stored)?;
    if let Err(err) = native::discard_backups(&backup_dir) {
        log::warn!("Could not clean up {}: {err:#}", backup_dir.display());
    }

    if !status.is_ok() || ctx.verbose > 0 {
        println!();
        ui::status(&status);
    }
    println!();
    ui::success(&format!(
        "Profile '{profile_id}' now has {} unit(s)",
        stored.profile.unit_count()
    ));
    Ok(())
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    println!();
    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}
