//! Provisioning context and provider traits
//!
//! These traits let the engine report progress and hand off collected
//! artifact requests without depending on a UI or a transport.

use crate::operand::Operand;
use crate::parameters::{PARM_ARTIFACT_REQUESTS, Parameters};
use crate::profile::Profile;
use crate::status::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Caller-supplied properties for one run
///
/// Stored in the phase parameters under
/// [`PARM_CONTEXT`](crate::parameters::PARM_CONTEXT).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningContext {
    properties: BTreeMap<String, String>,
}

impl ProvisioningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// A request to make one artifact of a unit available locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRequest {
    /// `id@version` of the unit the artifact belongs to
    pub unit: String,
    /// Artifact name or location as given by the instruction
    pub artifact: String,
    /// Where the artifact should end up, if the instruction said so
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

/// Shared list of artifact requests filled during `collect`
pub type ArtifactRequests = Mutex<Vec<ArtifactRequest>>;

/// Queue a request on the run's shared list
///
/// Returns `false` when no collect phase has set up a list in `params`.
pub fn queue_artifact(params: &Parameters, request: ArtifactRequest) -> bool {
    let Some(requests) = params.get::<ArtifactRequests>(PARM_ARTIFACT_REQUESTS) else {
        return false;
    };
    match requests.lock() {
        Ok(mut list) => {
            list.push(request);
            true
        }
        Err(_) => false,
    }
}

/// Remove a previously queued request (used by undo)
pub fn unqueue_artifact(params: &Parameters, request: &ArtifactRequest) -> bool {
    let Some(requests) = params.get::<ArtifactRequests>(PARM_ARTIFACT_REQUESTS) else {
        return false;
    };
    let Ok(mut list) = requests.lock() else {
        return false;
    };
    match list.iter().rposition(|queued| queued == request) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

/// Receiver of the artifact requests a collect phase gathered
///
/// Transfer and caching live outside the engine; this is where they plug in.
pub trait ArtifactSink: Send + Sync {
    /// Fetch (or otherwise satisfy) the requests; a failing status fails
    /// the collect phase.
    fn fetch(&self, profile: &Profile, requests: Vec<ArtifactRequest>) -> Status;
}

/// Sink that accepts every request and does nothing
pub struct DiscardArtifacts;

impl ArtifactSink for DiscardArtifacts {
    fn fetch(&self, _profile: &Profile, requests: Vec<ArtifactRequest>) -> Status {
        if !requests.is_empty() {
            log::debug!("Discarding {} artifact request(s)", requests.len());
        }
        Status::ok()
    }
}

/// Progress callback for engine runs
///
/// Implement this trait to receive progress updates during `perform`.
pub trait ProgressCallback: Send {
    /// Called when a phase starts; weights let callers size a progress bar
    fn on_phase_start(&mut self, phase_id: &str, weight: u32, total_weight: u32);

    /// Called before an operand is processed within a phase
    fn on_operand(&mut self, phase_id: &str, operand: &Operand);

    /// Called when a phase completes successfully
    fn on_phase_complete(&mut self, phase_id: &str, weight: u32);

    /// Called when a failure or cancellation starts the rollback
    fn on_rollback(&mut self, trigger: &Status);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_phase_start(&mut self, _phase_id: &str, _weight: u32, _total_weight: u32) {}
    fn on_operand(&mut self, _phase_id: &str, _operand: &Operand) {}
    fn on_phase_complete(&mut self, _phase_id: &str, _weight: u32) {}
    fn on_rollback(&mut self, _trigger: &Status) {}
}
