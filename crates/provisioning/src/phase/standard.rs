//! The standard phase set
//!
//! | Phase         | Weight | Acts on | Profile update |
//! |---------------|--------|---------|----------------|
//! | `collect`     | 100    | to      |                |
//! | `unconfigure` | 10     | from    |                |
//! | `uninstall`   | 50     | from    | remove unit    |
//! | `install`     | 50     | to      | add unit       |
//! | `configure`   | 10     | to      |                |
//!
//! Each phase reads the unit instruction keyed by its own id.

use super::unit_phase::{InstallableUnitPhase, ProfileUpdate, UnitSide};
use super::{Phase, PhaseHandler, PhaseSet, PhaseSpec};
use crate::action::ActionRef;
use crate::context::{ArtifactRequests, ArtifactSink, DiscardArtifacts};
use crate::error::Result;
use crate::operand::Operand;
use crate::parameters::{PARM_ARTIFACT_REQUESTS, Parameters};
use crate::profile::Profile;
use crate::status::Status;
use crate::touchpoint::TouchpointRegistry;
use std::sync::Arc;

pub const COLLECT: &str = "collect";
pub const UNCONFIGURE: &str = "unconfigure";
pub const UNINSTALL: &str = "uninstall";
pub const INSTALL: &str = "install";
pub const CONFIGURE: &str = "configure";

/// Ids and weights of the standard phases, in run order
pub fn standard_phase_specs() -> Vec<PhaseSpec> {
    vec![
        PhaseSpec::new(COLLECT, 100),
        PhaseSpec::new(UNCONFIGURE, 10),
        PhaseSpec::new(UNINSTALL, 50),
        PhaseSpec::new(INSTALL, 50),
        PhaseSpec::new(CONFIGURE, 10),
    ]
}

/// Builds phase sets over one touchpoint registry and artifact sink
#[derive(Clone)]
pub struct StandardPhases {
    registry: Arc<TouchpointRegistry>,
    sink: Arc<dyn ArtifactSink>,
}

impl StandardPhases {
    pub fn new(registry: Arc<TouchpointRegistry>) -> Self {
        Self {
            registry,
            sink: Arc::new(DiscardArtifacts),
        }
    }

    pub fn with_artifact_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The standard phase set with its default weights
    pub fn build(&self) -> Result<PhaseSet> {
        self.build_from(&standard_phase_specs())
    }

    /// Build a phase set from configured ids and weights
    ///
    /// Ids other than the standard five become plain instruction phases
    /// acting on the `to` unit and reading the instruction keyed by the id.
    pub fn build_from(&self, specs: &[PhaseSpec]) -> Result<PhaseSet> {
        let phases = specs
            .iter()
            .map(|spec| self.build_phase(spec))
            .collect::<Result<Vec<Phase>>>()?;
        PhaseSet::new(phases)
    }

    fn build_phase(&self, spec: &PhaseSpec) -> Result<Phase> {
        let registry = Arc::clone(&self.registry);
        match spec.id.as_deref() {
            Some(COLLECT) => spec.build(CollectPhase {
                inner: InstallableUnitPhase::new(registry, COLLECT, UnitSide::To),
                sink: Arc::clone(&self.sink),
            }),
            Some(UNCONFIGURE) => spec.build(InstallableUnitPhase::new(registry, UNCONFIGURE, UnitSide::From)),
            Some(UNINSTALL) => spec.build(
                InstallableUnitPhase::new(registry, UNINSTALL, UnitSide::From)
                    .with_profile_update(ProfileUpdate::RemoveUnit),
            ),
            Some(INSTALL) => spec.build(
                InstallableUnitPhase::new(registry, INSTALL, UnitSide::To)
                    .with_profile_update(ProfileUpdate::AddUnit),
            ),
            Some(CONFIGURE) => spec.build(InstallableUnitPhase::new(registry, CONFIGURE, UnitSide::To)),
            Some(other) => spec.build(InstallableUnitPhase::new(registry, other, UnitSide::To)),
            None => spec.build(InstallableUnitPhase::new(registry, "", UnitSide::To)),
        }
    }
}

/// `collect`: gathers artifact requests and hands them to the sink
struct CollectPhase {
    inner: InstallableUnitPhase,
    sink: Arc<dyn ArtifactSink>,
}

impl PhaseHandler for CollectPhase {
    fn initialize_phase(&self, profile: &Profile, phase_id: &str, params: &mut Parameters) -> Status {
        params.insert(PARM_ARTIFACT_REQUESTS, ArtifactRequests::default());
        self.inner.initialize_phase(profile, phase_id, params)
    }

    fn complete_phase(&self, profile: &Profile, phase_id: &str, params: &mut Parameters) -> Status {
        let mut status = self.inner.complete_phase(profile, phase_id, params);
        if status.is_failure() {
            return status;
        }

        let requests = params
            .get::<ArtifactRequests>(PARM_ARTIFACT_REQUESTS)
            .and_then(|list| list.lock().ok().map(|mut list| std::mem::take(&mut *list)))
            .unwrap_or_default();
        log::debug!("Collected {} artifact request(s)", requests.len());
        status.merge(self.sink.fetch(profile, requests));
        status
    }

    fn initialize_operand(&self, profile: &Profile, operand: &Operand, params: &mut Parameters) -> Status {
        self.inner.initialize_operand(profile, operand, params)
    }

    fn complete_operand(&self, profile: &Profile, operand: &Operand, params: &mut Parameters) -> Status {
        self.inner.complete_operand(profile, operand, params)
    }

    fn actions(&self, operand: &Operand, params: &Parameters) -> Result<Vec<ActionRef>> {
        self.inner.actions(operand, params)
    }
}
