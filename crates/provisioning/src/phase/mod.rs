//! Phases: named, weighted pipeline stages with lifecycle hooks
//!
//! A [`Phase`] pairs a validated id and weight with a [`PhaseHandler`]
//! that supplies the hook behavior and the actions for each operand. The
//! phase itself owns the parts every stage shares: building the phase and
//! operand parameter contexts, recording actions in the session before
//! they run, and replaying the same brackets on undo.

pub mod standard;
pub mod unit_phase;

use crate::action::{ActionContext, ActionRef};
use crate::context::ProvisioningContext;
use crate::error::{Error, Result};
use crate::operand::Operand;
use crate::parameters::{PARM_CONTEXT, PARM_OPERAND, PARM_PHASE_ID, Parameters};
use crate::profile::Profile;
use crate::session::EngineSession;
use crate::status::Status;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use standard::{StandardPhases, standard_phase_specs};
pub use unit_phase::{InstallableUnitPhase, ProfileUpdate, UnitSide};

/// Stage-specific behavior of a phase
///
/// Every hook defaults to success. Hooks may write into `params`; phase
/// hooks see the phase context, operand hooks a per-operand copy of it.
pub trait PhaseHandler: Send + Sync {
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

    /// Actions to run for `operand`, in order
    ///
    /// `params` is the operand context after `initialize_operand`.
    fn actions(&self, _operand: &Operand, _params: &Parameters) -> Result<Vec<ActionRef>> {
        Ok(Vec::new())
    }
}

/// A phase as written in configuration
///
/// `id` is optional here so that a missing id is reported as an invalid
/// phase instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub weight: i64,
}

impl PhaseSpec {
    pub fn new(id: impl Into<String>, weight: i64) -> Self {
        Self {
            id: Some(id.into()),
            weight,
        }
    }

    /// Validate and build the phase with the given behavior
    pub fn build(&self, handler: impl PhaseHandler + 'static) -> Result<Phase> {
        let id = self.id.clone().ok_or(Error::InvalidPhaseId)?;
        Phase::new(id, self.weight, handler)
    }
}

/// One named, weighted stage of a provisioning run
pub struct Phase {
    id: String,
    weight: u32,
    handler: Box<dyn PhaseHandler>,
}

impl Phase {
    /// Build a phase; the id must be non-empty and the weight positive
    pub fn new(id: impl Into<String>, weight: i64, handler: impl PhaseHandler + 'static) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidPhaseId);
        }
        let weight = u32::try_from(weight)
            .ok()
            .filter(|w| *w > 0)
            .ok_or_else(|| Error::InvalidPhaseWeight {
                id: id.clone(),
                weight,
            })?;

        Ok(Self {
            id,
            weight,
            handler: Box::new(handler),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Relative weight for progress reporting
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Create the phase parameters and run `initialize_phase`
    ///
    /// The context is seeded with the profile properties as strings, then
    /// the phase id and the provisioning context.
    pub fn pre_perform(
        &self,
        status: &mut Status,
        profile: &Profile,
        context: &ProvisioningContext,
    ) -> Parameters {
        log::debug!("Initializing phase '{}'", self.id);
        let mut params = Parameters::new();
        for (key, value) in profile.properties() {
            params.insert(key.clone(), value.clone());
        }
        params.insert(PARM_PHASE_ID, self.id.clone());
        params.insert(PARM_CONTEXT, context.clone());

        status.merge(self.handler.initialize_phase(profile, &self.id, &mut params));
        params
    }

    /// Run `complete_phase`; the phase parameters end here
    pub fn post_perform(&self, status: &mut Status, profile: &Profile, mut params: Parameters) {
        log::debug!("Completing phase '{}'", self.id);
        status.merge(self.handler.complete_phase(profile, &self.id, &mut params));
    }

    /// Per-operand copy of the phase parameters
    fn operand_parameters(phase_params: &Parameters, operand: &Operand) -> Parameters {
        let mut params = phase_params.clone();
        params.insert(PARM_OPERAND, operand.clone());
        params
    }

    /// Run one operand: initialize, record and execute each action, complete
    ///
    /// Each action is recorded before it executes so that a failing action
    /// is undone as well. Execution stops at the first failing action.
    /// Returns `Err` only for a session protocol violation.
    pub fn perform_operand(
        &self,
        session: &mut EngineSession,
        profile: &mut Profile,
        phase_params: &Parameters,
        operand: &Operand,
    ) -> Result<Status> {
        log::debug!("Phase '{}': {operand}", self.id);
        let mut status = Status::multi(format!("Phase '{}' for {operand}", self.id));
        let mut params = Self::operand_parameters(phase_params, operand);

        status.merge(self.handler.initialize_operand(profile, operand, &mut params));
        if status.is_failure() {
            return Ok(status);
        }

        let actions = match self.handler.actions(operand, &params) {
            Ok(actions) => actions,
            Err(err) => {
                status.merge(Status::error(err.to_string()));
                return Ok(status);
            }
        };

        for action in actions {
            session.record_action(Arc::clone(&action), operand)?;
            let mut ctx = ActionContext {
                profile: &mut *profile,
                operand,
                phase_id: &self.id,
                params: &params,
            };
            let result = action
                .execute(&mut ctx)
                .unwrap_or_else(|err| Status::from_error(&format!("Action '{}' failed", action.id()), &err));
            status.merge(result);
            if status.is_failure() {
                return Ok(status);
            }
        }

        status.merge(self.handler.complete_operand(profile, operand, &mut params));
        Ok(status)
    }

    /// Undo `actions` (recorded in execution order) for one operand
    ///
    /// The operand context is rebuilt the way the forward pass built it.
    /// Failures are merged into `status` and never stop the walk.
    pub fn undo(
        &self,
        status: &mut Status,
        profile: &mut Profile,
        phase_params: &Parameters,
        operand: &Operand,
        actions: &[ActionRef],
    ) {
        log::debug!("Undoing phase '{}': {operand}", self.id);
        let mut params = Self::operand_parameters(phase_params, operand);
        status.merge(self.handler.initialize_operand(profile, operand, &mut params));

        for action in actions.iter().rev() {
            let mut ctx = ActionContext {
                profile: &mut *profile,
                operand,
                phase_id: &self.id,
                params: &params,
            };
            let result = action.undo(&mut ctx).unwrap_or_else(|err| {
                Status::from_error(&format!("Undo of '{}' failed", action.id()), &err)
            });
            if result.is_failure() {
                log::warn!("Undo of '{}' for {operand} failed", action.id());
            }
            status.merge(result);
        }

        status.merge(self.handler.complete_operand(profile, operand, &mut params));
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("id", &self.id)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Ordered, non-empty list of phases for one run
#[derive(Debug, Clone)]
pub struct PhaseSet {
    phases: Vec<Arc<Phase>>,
}

impl PhaseSet {
    pub fn new(phases: Vec<Phase>) -> Result<Self> {
        if phases.is_empty() {
            return Err(Error::EmptyPhaseSet);
        }
        Ok(Self {
            phases: phases.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Phase>> {
        self.phases.iter()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Always false; construction rejects an empty set
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.phases.iter().map(|phase| phase.id()).collect()
    }

    pub fn total_weight(&self) -> u32 {
        self.phases.iter().map(|phase| phase.weight()).sum()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Phase>> {
        self.phases.iter().find(|phase| phase.id() == id)
    }
}
