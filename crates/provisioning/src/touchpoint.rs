//! Touchpoints: pluggable translators from unit instructions to actions
//!
//! The engine never hardcodes a touchpoint. Touchpoints and free-standing
//! actions are registered in a [`TouchpointRegistry`] built by the host
//! application and injected into the phases that need it.

use crate::action::{ActionRef, NullAction, ParameterizedAction};
use crate::error::Result;
use crate::instruction;
use crate::operand::Operand;
use crate::parameters::Parameters;
use crate::profile::Profile;
use crate::status::Status;
use crate::unit::{InstallableUnit, TouchpointType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A touchpoint for one kind of installable unit
///
/// All hooks default to doing nothing. They run inside the phase hooks of
/// the same name, before the phase's own logic for `initialize_*` and
/// after it for `complete_*`.
pub trait Touchpoint: Send + Sync + fmt::Debug {
    /// The touchpoint type this implementation serves
    fn touchpoint_type(&self) -> TouchpointType;

    /// Resolve an unqualified action name
    fn action(&self, name: &str) -> Option<ActionRef>;

    fn initialize_phase(&self, _profile: &Profile, _phase_id: &str, _params: &mut Parameters) -> Status {
        Status::ok()
    }

    fn complete_phase(&self, _profile: &Profile, _phase_id: &str, _params: &mut Parameters) -> Status {
        Status::ok()
    }

    fn initialize_operand(
        &self,
        _profile: &Profile,
        _operand: &Operand,
        _params: &mut Parameters,
    ) -> Status {
        Status::ok()
    }

    fn complete_operand(
        &self,
        _profile: &Profile,
        _operand: &Operand,
        _params: &mut Parameters,
    ) -> Status {
        Status::ok()
    }
}

/// Registry of touchpoints (by type id) and qualified actions (by id)
#[derive(Debug, Default, Clone)]
pub struct TouchpointRegistry {
    touchpoints: HashMap<String, Arc<dyn Touchpoint>>,
    actions: HashMap<String, ActionRef>,
}

impl TouchpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a touchpoint under its type id, replacing any previous one
    pub fn register_touchpoint(&mut self, touchpoint: Arc<dyn Touchpoint>) {
        let id = touchpoint.touchpoint_type().id;
        log::debug!("Registered touchpoint '{id}'");
        self.touchpoints.insert(id, touchpoint);
    }

    /// Register an action under a qualified id such as `native.mkdir`
    pub fn register_action(&mut self, id: impl Into<String>, action: ActionRef) {
        self.actions.insert(id.into(), action);
    }

    /// Touchpoint for a unit; `None` for units without one
    pub fn touchpoint_for(&self, unit: &InstallableUnit) -> Option<&Arc<dyn Touchpoint>> {
        if unit.touchpoint_type.is_none() {
            return None;
        }
        self.touchpoints.get(&unit.touchpoint_type.id)
    }

    pub fn touchpoint(&self, id: &str) -> Option<&Arc<dyn Touchpoint>> {
        self.touchpoints.get(id)
    }

    pub fn qualified_action(&self, id: &str) -> Option<&ActionRef> {
        self.actions.get(id)
    }

    pub fn touchpoint_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.touchpoints.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Actions for the instruction stored under `key` on `unit`.
    ///
    /// Statements that resolve to nothing become [`NullAction`]s so that an
    /// instruction meant for a touchpoint that is not installed cannot block
    /// the phase. Only a syntax error fails.
    pub fn resolve_actions(&self, unit: &InstallableUnit, key: &str) -> Result<Vec<ActionRef>> {
        let Some(body) = unit.instruction(key) else {
            return Ok(Vec::new());
        };

        let touchpoint = self.touchpoint_for(unit);
        let mut actions: Vec<ActionRef> = Vec::new();
        for statement in instruction::parse(body)? {
            let resolved = if statement.is_qualified() {
                self.qualified_action(&statement.name).cloned()
            } else {
                touchpoint.and_then(|tp| tp.action(&statement.name))
            };
            let action = resolved.unwrap_or_else(|| {
                log::debug!(
                    "No action '{}' for {} ({}), using null action",
                    statement.name,
                    unit,
                    unit.touchpoint_type
                );
                Arc::new(NullAction) as ActionRef
            });
            actions.push(Arc::new(ParameterizedAction::new(action, statement.args)));
        }
        Ok(actions)
    }
}
