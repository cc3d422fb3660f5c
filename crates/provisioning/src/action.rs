//! Provisioning actions: the smallest reversible units of work
//!
//! Actions are supplied by touchpoints. The engine only records them and
//! calls `execute`/`undo`; it never looks at their concrete type.

use crate::instruction::expand_variables;
use crate::operand::Operand;
use crate::parameters::Parameters;
use crate::profile::Profile;
use crate::status::Status;
use crate::unit::UnitRef;
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Everything an action can see while it runs
pub struct ActionContext<'a> {
    /// The profile being changed
    pub profile: &'a mut Profile,
    /// The operand the action runs for
    pub operand: &'a Operand,
    /// Id of the phase the action runs in
    pub phase_id: &'a str,
    /// Operand-scoped parameters (phase parameters plus operand entries)
    pub params: &'a Parameters,
}

/// Core trait for provisioning actions
///
/// `undo` is called with a context equivalent to the one `execute` saw:
/// same phase, same operand, parameters rebuilt the same way.
///
/// Returning `Err` is equivalent to returning an error [`Status`]; the
/// phase converts it.
pub trait ProvisioningAction: Send + Sync + fmt::Debug {
    /// Identifier used in logs and status messages
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<Status>;

    fn undo(&self, ctx: &mut ActionContext<'_>) -> Result<Status>;
}

/// A shared action handle, as stored in the session ledger
pub type ActionRef = Arc<dyn ProvisioningAction>;

/// No-op action used when an instruction resolves to nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAction;

impl ProvisioningAction for NullAction {
    fn id(&self) -> &str {
        "null"
    }

    fn execute(&self, _ctx: &mut ActionContext<'_>) -> Result<Status> {
        Ok(Status::ok())
    }

    fn undo(&self, _ctx: &mut ActionContext<'_>) -> Result<Status> {
        Ok(Status::ok())
    }
}

/// An action bound to the arguments of one instruction statement
///
/// Arguments are merged over the operand parameters before delegating,
/// with `${name}` references expanded against string parameters.
#[derive(Debug)]
pub struct ParameterizedAction {
    action: ActionRef,
    args: Vec<(String, String)>,
}

impl ParameterizedAction {
    pub fn new(action: ActionRef, args: Vec<(String, String)>) -> Self {
        Self { action, args }
    }

    fn merged(&self, params: &Parameters) -> Parameters {
        let mut merged = params.clone();
        for (key, value) in &self.args {
            let expanded = expand_variables(value, params);
            merged.insert(key.clone(), expanded);
        }
        merged
    }
}

impl ProvisioningAction for ParameterizedAction {
    fn id(&self) -> &str {
        self.action.id()
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let params = self.merged(ctx.params);
        self.action.execute(&mut ActionContext {
            profile: &mut *ctx.profile,
            operand: ctx.operand,
            phase_id: ctx.phase_id,
            params: &params,
        })
    }

    fn undo(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        let params = self.merged(ctx.params);
        self.action.undo(&mut ActionContext {
            profile: &mut *ctx.profile,
            operand: ctx.operand,
            phase_id: ctx.phase_id,
            params: &params,
        })
    }
}

/// Records a unit as installed in the profile
#[derive(Debug)]
pub struct AddUnitAction {
    unit: UnitRef,
    added: AtomicBool,
}

impl AddUnitAction {
    pub fn new(unit: UnitRef) -> Self {
        Self {
            unit,
            added: AtomicBool::new(false),
        }
    }
}

impl ProvisioningAction for AddUnitAction {
    fn id(&self) -> &str {
        "profile.addUnit"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        if ctx.profile.contains_unit(&self.unit) {
            return Ok(Status::ok());
        }
        ctx.profile.add_unit(Arc::clone(&self.unit));
        self.added.store(true, Ordering::SeqCst);
        Ok(Status::ok())
    }

    fn undo(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        if self.added.swap(false, Ordering::SeqCst) {
            ctx.profile.remove_unit(&self.unit);
        }
        Ok(Status::ok())
    }
}

/// Records a unit as no longer installed in the profile
#[derive(Debug)]
pub struct RemoveUnitAction {
    unit: UnitRef,
    removed: AtomicBool,
}

impl RemoveUnitAction {
    pub fn new(unit: UnitRef) -> Self {
        Self {
            unit,
            removed: AtomicBool::new(false),
        }
    }
}

impl ProvisioningAction for RemoveUnitAction {
    fn id(&self) -> &str {
        "profile.removeUnit"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        if ctx.profile.remove_unit(&self.unit).is_some() {
            self.removed.store(true, Ordering::SeqCst);
            Ok(Status::ok())
        } else {
            Ok(Status::warning(format!(
                "{} is not installed in profile {}",
                self.unit,
                ctx.profile.id()
            )))
        }
    }

    fn undo(&self, ctx: &mut ActionContext<'_>) -> Result<Status> {
        if self.removed.swap(false, Ordering::SeqCst) {
            ctx.profile.add_unit(Arc::clone(&self.unit));
        }
        Ok(Status::ok())
    }
}
