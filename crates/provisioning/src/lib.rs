//! # Provisioning
//!
//! A transactional engine for applying changes to the set of installed
//! units in a profile.
//!
//! The engine consumes a pre-computed list of operands and runs it
//! through an ordered set of phases. Every action that runs is recorded
//! in a session ledger first; if any step fails or the run is cancelled,
//! the session undoes everything in exact reverse order.
//!
//! ## Core Concepts
//!
//! - **Operand**: one unit transition (install, uninstall or update)
//! - **Action**: the smallest reversible unit of work (`execute`/`undo`)
//! - **Phase**: a named, weighted stage with lifecycle hooks
//! - **Touchpoint**: turns a unit's instructions into actions
//! - **EngineSession**: the ledger that drives rollback
//! - **Engine**: runs phases over operands and commits or rolls back
//!
//! ## Example
//!
//! ```ignore
//! use provisioning::{
//!     CancellationToken, Engine, InstallableUnit, Operand, Profile,
//!     ProvisioningContext, StandardPhases, TouchpointRegistry,
//! };
//! use std::sync::Arc;
//!
//! let registry = Arc::new(TouchpointRegistry::new());
//! let phases = StandardPhases::new(registry).build()?;
//!
//! let mut profile = Profile::new("default");
//! let unit = InstallableUnit::new("app", "1.0.0").into_ref();
//!
//! let status = Engine::new().perform(
//!     &mut profile,
//!     &phases,
//!     &[Operand::install(unit)],
//!     &ProvisioningContext::new(),
//!     &CancellationToken::new(),
//! );
//! assert!(status.is_ok());
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`Touchpoint`]: resolves instruction statements into actions
//! - [`PhaseHandler`]: stage-specific hooks and actions
//! - [`ProgressCallback`]: receives progress updates
//! - [`ArtifactSink`]: receives the artifact requests of `collect`
//! - [`Planner`]: turns a change request into a plan

pub mod action;
pub mod cancel;
pub mod context;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod operand;
pub mod parameters;
pub mod phase;
pub mod plan;
pub mod profile;
pub mod session;
pub mod status;
pub mod touchpoint;
pub mod unit;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types at crate root
pub use action::{
    ActionContext, ActionRef, AddUnitAction, NullAction, ParameterizedAction, ProvisioningAction,
    RemoveUnitAction,
};
pub use cancel::CancellationToken;
pub use context::{
    ArtifactRequest, ArtifactSink, DiscardArtifacts, NoProgress, ProgressCallback,
    ProvisioningContext, queue_artifact, unqueue_artifact,
};
pub use engine::Engine;
pub use error::{Error, ErrorCategory, Result};
pub use operand::{Operand, OperandKind};
pub use parameters::Parameters;
pub use phase::{
    InstallableUnitPhase, Phase, PhaseHandler, PhaseSet, PhaseSpec, ProfileUpdate, StandardPhases,
    UnitSide, standard_phase_specs,
};
pub use plan::{
    DirectPlanner, PlanView, Planner, ProfileChangeRequest, ProvisioningPlan, UnitSelector,
};
pub use profile::Profile;
pub use session::EngineSession;
pub use status::{Severity, Status};
pub use touchpoint::{Touchpoint, TouchpointRegistry};
pub use unit::{InstallableUnit, TouchpointType, UnitRef};
