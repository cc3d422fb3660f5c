//! `provisio phases`: show the configured phase set

use crate::Context;
use crate::ui;
use anyhow::Result;

use super::Setup;

pub fn run(_ctx: &Context) -> Result<()> {
    let setup = Setup::load()?;
    let phases = setup.phases(&setup.run_backup_dir())?;
    let total = phases.total_weight();

    ui::header("Phases");
    for (index, phase) in phases.iter().enumerate() {
        let share = f64::from(phase.weight()) * 100.0 / f64::from(total);
        println!(
            "  {}. {:<14} weight {:>4}  ({share:.0}%)",
            index + 1,
            phase.id(),
            phase.weight()
        );
    }
    println!();
    ui::kv("total weight", &total.to_string());
    Ok(())
}
