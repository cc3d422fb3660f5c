//! `provisio profile`: inspect stored profiles

use crate::Context;
use crate::cli::ProfileCommand;
use crate::state::ProfileStore;
use crate::ui;
use anyhow::Result;
use colored::Colorize;

pub fn run(ctx: &Context, cmd: ProfileCommand) -> Result<()> {
    let store = ProfileStore::open()?;
    match cmd {
        ProfileCommand::List => list(ctx, &store),
        ProfileCommand::Show { id } => show(ctx, &store, &id),
    }
}

fn list(_ctx: &Context, store: &ProfileStore) -> Result<()> {
    ui::header("Profiles");

    let ids = store.list()?;
    if ids.is_empty() {
        ui::dim(&format!("No profiles in {}", store.root().display()));
        return Ok(());
    }

    for id in ids {
        match store.load(&id) {
            Ok(stored) => println!(
                "  {} {} {}",
                id.bold(),
                format!("({} unit(s))", stored.profile.unit_count()).dimmed(),
                stored.last_updated.format("%Y-%m-%d %H:%M").to_string().dimmed()
            ),
            Err(err) => {
                log::debug!("Could not load profile '{id}': {err:#}");
                println!("  {} {}", id.bold(), "(unreadable)".red());
            }
        }
    }
    Ok(())
}

fn show(_ctx: &Context, store: &ProfileStore, id: &str) -> Result<()> {
    let stored = store.load(id)?;
    let profile = &stored.profile;

    ui::header(&format!("Profile '{id}'"));
    ui::kv("updated", &stored.last_updated.to_rfc3339());

    ui::section("Properties");
    if profile.properties().is_empty() {
        ui::dim("none");
    }
    for (key, value) in profile.properties() {
        ui::kv(key, value);
    }

    ui::section("Units");
    if profile.unit_count() == 0 {
        ui::dim("none");
    }
    for unit in profile.units() {
        let touchpoint = if unit.touchpoint_type.is_none() {
            String::new()
        } else {
            format!(" [{}]", unit.touchpoint_type)
        };
        println!("  {} {}{}", unit.id, unit.version.dimmed(), touchpoint.cyan());
    }
    Ok(())
}
