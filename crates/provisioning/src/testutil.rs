//! Recording actions and phases shared by the engine tests

use crate::action::{ActionContext, ActionRef, ProvisioningAction};
use crate::operand::Operand;
use crate::parameters::Parameters;
use crate::phase::PhaseHandler;
use crate::profile::Profile;
use crate::status::Status;
use crate::unit::{InstallableUnit, UnitRef};
use std::sync::{Arc, Mutex};

pub(crate) fn unit(id: &str) -> UnitRef {
    InstallableUnit::new(id, "1.0.0").into_ref()
}

/// Label for an operand in traces: the id of whichever unit it carries
pub(crate) fn label(operand: &Operand) -> String {
    operand
        .second()
        .or(operand.first())
        .map(|unit| unit.id.clone())
        .unwrap_or_default()
}

/// Ordered log of `execute`/`undo` calls
#[derive(Debug, Clone, Default)]
pub(crate) struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.with_prefix("execute ")
    }

    pub(crate) fn undone(&self) -> Vec<String> {
        self.with_prefix("undo ")
    }

    fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.starts_with(prefix))
            .collect()
    }
}

/// Action that logs its calls and can be told to fail
#[derive(Debug)]
pub(crate) struct RecordingAction {
    name: String,
    trace: Trace,
    fail_execute: bool,
    fail_undo: bool,
}

impl RecordingAction {
    pub(crate) fn new(name: &str, trace: &Trace) -> Self {
        Self {
            name: name.to_string(),
            trace: trace.clone(),
            fail_execute: false,
            fail_undo: false,
        }
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub(crate) fn failing_undo(mut self) -> Self {
        self.fail_undo = true;
        self
    }
}

impl ProvisioningAction for RecordingAction {
    fn id(&self) -> &str {
        &self.name
    }

    fn execute(&self, _ctx: &mut ActionContext<'_>) -> anyhow::Result<Status> {
        self.trace.push(format!("execute {}", self.name));
        if self.fail_execute {
            anyhow::bail!("{} failed", self.name);
        }
        Ok(Status::ok())
    }

    fn undo(&self, _ctx: &mut ActionContext<'_>) -> anyhow::Result<Status> {
        self.trace.push(format!("undo {}", self.name));
        if self.fail_undo {
            return Ok(Status::error(format!("cannot undo {}", self.name)));
        }
        Ok(Status::ok())
    }
}

/// Ordered log of phase and operand hook calls
#[derive(Clone, Default)]
pub(crate) struct Hooks(Arc<Mutex<Vec<String>>>);

impl Hooks {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

type ActionSource = Box<dyn Fn(&str, &Operand) -> Vec<ActionRef> + Send + Sync>;

/// Phase handler that writes markers in its hooks and asserts on them
///
/// `initialize_phase` must not see the phase marker yet and `complete_phase`
/// must see it; the same holds per operand for the operand marker, which
/// also catches parameters leaking from one operand into the next.
pub(crate) struct MarkerPhase {
    hooks: Hooks,
    actions: ActionSource,
    fail_complete_phase: bool,
}

impl MarkerPhase {
    pub(crate) const PHASE_MARKER: &'static str = "test.initializePhase";
    pub(crate) const OPERAND_MARKER: &'static str = "test.initializeOperand";

    pub(crate) fn new(hooks: Hooks) -> Self {
        Self {
            hooks,
            actions: Box::new(|_: &str, _: &Operand| Vec::new()),
            fail_complete_phase: false,
        }
    }

    /// Use `source(phase_id, operand)` to supply the actions
    pub(crate) fn with_actions(
        mut self,
        source: impl Fn(&str, &Operand) -> Vec<ActionRef> + Send + Sync + 'static,
    ) -> Self {
        self.actions = Box::new(source);
        self
    }

    pub(crate) fn failing_complete_phase(mut self) -> Self {
        self.fail_complete_phase = true;
        self
    }
}

impl PhaseHandler for MarkerPhase {
    fn initialize_phase(&self, _profile: &Profile, phase_id: &str, params: &mut Parameters) -> Status {
        assert!(!params.contains_key(Self::PHASE_MARKER));
        params.insert(Self::PHASE_MARKER, true);
        self.hooks.push(format!("initialize_phase {phase_id}"));
        Status::ok()
    }

    fn complete_phase(&self, _profile: &Profile, phase_id: &str, params: &mut Parameters) -> Status {
        assert!(params.contains_key(Self::PHASE_MARKER));
        assert!(!params.contains_key(Self::OPERAND_MARKER));
        self.hooks.push(format!("complete_phase {phase_id}"));
        if self.fail_complete_phase {
            return Status::error(format!("{phase_id} could not complete"));
        }
        Status::ok()
    }

    fn initialize_operand(&self, _profile: &Profile, operand: &Operand, params: &mut Parameters) -> Status {
        assert!(params.contains_key(Self::PHASE_MARKER));
        assert!(!params.contains_key(Self::OPERAND_MARKER));
        params.insert(Self::OPERAND_MARKER, label(operand));
        self.hooks.push(format!("initialize_operand {}", label(operand)));
        Status::ok()
    }

    fn complete_operand(&self, _profile: &Profile, operand: &Operand, params: &mut Parameters) -> Status {
        assert_eq!(params.get_str(Self::OPERAND_MARKER), Some(label(operand).as_str()));
        self.hooks.push(format!("complete_operand {}", label(operand)));
        Status::ok()
    }

    fn actions(&self, operand: &Operand, params: &Parameters) -> crate::Result<Vec<ActionRef>> {
        let phase_id = params.get_str(crate::parameters::PARM_PHASE_ID).unwrap_or_default();
        Ok((self.actions)(phase_id, operand))
    }
}
