//! Phase handler that derives actions from unit instructions

use super::PhaseHandler;
use crate::action::{ActionRef, AddUnitAction, RemoveUnitAction};
use crate::error::Result;
use crate::operand::Operand;
use crate::parameters::{PARM_UNIT, Parameters};
use crate::profile::Profile;
use crate::status::Status;
use crate::touchpoint::TouchpointRegistry;
use crate::unit::UnitRef;
use std::sync::Arc;

/// Which unit of an operand a phase acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSide {
    /// The unit being removed or replaced (`first`)
    From,
    /// The unit being added (`second`)
    To,
}

impl UnitSide {
    pub fn unit(self, operand: &Operand) -> Option<&UnitRef> {
        match self {
            Self::From => operand.first(),
            Self::To => operand.second(),
        }
    }
}

/// Profile bookkeeping appended after a unit's own actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileUpdate {
    AddUnit,
    RemoveUnit,
}

/// Resolves each operand's instructions through a touchpoint registry
///
/// Operands without a unit on the configured side get no actions, so an
/// uninstall phase passes over pure additions and vice versa.
pub struct InstallableUnitPhase {
    registry: Arc<TouchpointRegistry>,
    instruction_key: String,
    side: UnitSide,
    profile_update: Option<ProfileUpdate>,
}

impl InstallableUnitPhase {
    pub fn new(registry: Arc<TouchpointRegistry>, instruction_key: impl Into<String>, side: UnitSide) -> Self {
        Self {
            registry,
            instruction_key: instruction_key.into(),
            side,
            profile_update: None,
        }
    }

    pub fn with_profile_update(mut self, update: ProfileUpdate) -> Self {
        self.profile_update = Some(update);
        self
    }

    pub fn instruction_key(&self) -> &str {
        &self.instruction_key
    }

    pub fn side(&self) -> UnitSide {
        self.side
    }
}

impl PhaseHandler for InstallableUnitPhase {
    fn initialize_phase(&self, profile: &Profile, phase_id: &str, params: &mut Parameters) -> Status {
        let mut status = Status::multi(format!("Initializing touchpoints for '{phase_id}'"));
        for id in self.registry.touchpoint_ids() {
            if let Some(touchpoint) = self.registry.touchpoint(id) {
                status.merge(touchpoint.initialize_phase(profile, phase_id, params));
            }
        }
        status
    }

    fn complete_phase(&self, profile: &Profile, phase_id: &str, params: &mut Parameters) -> Status {
        let mut status = Status::multi(format!("Completing touchpoints for '{phase_id}'"));
        for id in self.registry.touchpoint_ids() {
            if let Some(touchpoint) = self.registry.touchpoint(id) {
                status.merge(touchpoint.complete_phase(profile, phase_id, params));
            }
        }
        status
    }

    fn initialize_operand(&self, profile: &Profile, operand: &Operand, params: &mut Parameters) -> Status {
        let Some(unit) = self.side.unit(operand) else {
            return Status::ok();
        };
        params.insert_shared(PARM_UNIT, Arc::clone(unit));
        match self.registry.touchpoint_for(unit) {
            Some(touchpoint) => touchpoint.initialize_operand(profile, operand, params),
            None => Status::ok(),
        }
    }

    fn complete_operand(&self, profile: &Profile, operand: &Operand, params: &mut Parameters) -> Status {
        let Some(unit) = self.side.unit(operand) else {
            return Status::ok();
        };
        match self.registry.touchpoint_for(unit) {
            Some(touchpoint) => touchpoint.complete_operand(profile, operand, params),
            None => Status::ok(),
        }
    }

    fn actions(&self, operand: &Operand, _params: &Parameters) -> Result<Vec<ActionRef>> {
        let Some(unit) = self.side.unit(operand) else {
            return Ok(Vec::new());
        };
        let mut actions = self.registry.resolve_actions(unit, &self.instruction_key)?;
        match self.profile_update {
            Some(ProfileUpdate::AddUnit) => actions.push(Arc::new(AddUnitAction::new(Arc::clone(unit)))),
            Some(ProfileUpdate::RemoveUnit) => {
                actions.push(Arc::new(RemoveUnitAction::new(Arc::clone(unit))));
            }
            None => {}
        }
        Ok(actions)
    }
}
