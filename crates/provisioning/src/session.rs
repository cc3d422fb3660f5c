//! Engine session: the transactional ledger of one run
//!
//! The session records which actions ran for which operand in which
//! phase, in execution order, and can undo all of it in exact reverse.
//!
//! A new action record starts whenever the operand differs from the one
//! of the last record. Records are never merged by operand identity, so an
//! operand that recurs after another one gets a second record and undo
//! order follows execution order.

use crate::action::ActionRef;
use crate::context::ProvisioningContext;
use crate::error::{Error, Result};
use crate::operand::Operand;
use crate::parameters::Parameters;
use crate::phase::Phase;
use crate::profile::Profile;
use crate::status::Status;
use std::sync::Arc;

/// Actions executed consecutively for one operand
#[derive(Debug)]
pub struct ActionRecord {
    operand: Operand,
    actions: Vec<ActionRef>,
}

impl ActionRecord {
    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    pub fn actions(&self) -> &[ActionRef] {
        &self.actions
    }
}

#[derive(Debug)]
struct LedgerEntry {
    phase: Arc<Phase>,
    records: Vec<ActionRecord>,
}

#[derive(Debug)]
struct OpenPhase {
    phase: Arc<Phase>,
    records: Vec<ActionRecord>,
    params: Option<Parameters>,
}

/// Ledger for one `perform`; committed or rolled back at its end
#[derive(Debug, Default)]
pub struct EngineSession {
    ledger: Vec<LedgerEntry>,
    current: Option<OpenPhase>,
}

impl EngineSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `phase`; fails if another phase is open
    pub fn record_phase_start(&mut self, phase: Arc<Phase>) -> Result<()> {
        if let Some(open) = &self.current {
            return Err(Error::PhaseAlreadyStarted {
                open: open.phase.id().to_string(),
            });
        }
        self.current = Some(OpenPhase {
            phase,
            records: Vec::new(),
            params: None,
        });
        Ok(())
    }

    /// Keep the open phase's parameters for a rollback of that phase
    pub fn set_phase_parameters(&mut self, params: Parameters) -> Result<()> {
        let open = self.current.as_mut().ok_or(Error::NoPhaseStarted {
            operation: "set parameters for",
        })?;
        open.params = Some(params);
        Ok(())
    }

    /// Take back the open phase's parameters, e.g. before `post_perform`
    pub fn take_phase_parameters(&mut self) -> Option<Parameters> {
        self.current.as_mut().and_then(|open| open.params.take())
    }

    /// Record `action` as executed for `operand` in the open phase
    pub fn record_action(&mut self, action: ActionRef, operand: &Operand) -> Result<()> {
        let open = self.current.as_mut().ok_or(Error::NoPhaseStarted {
            operation: "record an action in",
        })?;
        match open.records.last_mut() {
            Some(record) if record.operand.same_as(operand) => record.actions.push(action),
            _ => open.records.push(ActionRecord {
                operand: operand.clone(),
                actions: vec![action],
            }),
        }
        Ok(())
    }

    /// Close `phase` and append it to the ledger
    pub fn record_phase_end(&mut self, phase: &Arc<Phase>) -> Result<()> {
        let open = self
            .current
            .as_ref()
            .ok_or(Error::NoPhaseStarted { operation: "end" })?;
        if !Arc::ptr_eq(&open.phase, phase) {
            return Err(Error::PhaseMismatch {
                open: open.phase.id().to_string(),
                given: phase.id().to_string(),
            });
        }

        if let Some(open) = self.current.take() {
            self.ledger.push(LedgerEntry {
                phase: open.phase,
                records: open.records,
            });
        }
        Ok(())
    }

    /// Forget everything recorded; nothing can be undone afterwards
    pub fn commit(&mut self) {
        self.ledger.clear();
        self.current = None;
    }

    /// Undo everything recorded, newest first
    ///
    /// The open phase (if any) goes first, then the ledger in reverse phase
    /// order. A phase whose parameters are no longer held gets a fresh
    /// `pre_perform`; that includes the open phase when its `complete_phase`
    /// failed, since the engine takes its parameters back before
    /// `post_perform`. Undo failures are collected into the returned status;
    /// the walk always completes and the session is empty afterwards.
    pub fn rollback(&mut self, profile: &mut Profile, context: &ProvisioningContext) -> Status {
        let mut result = Status::multi("Rollback");

        if let Some(open) = self.current.take() {
            log::warn!("Rolling back open phase '{}'", open.phase.id());
            result.merge(Self::rollback_phase(
                &open.phase,
                &open.records,
                open.params,
                profile,
                context,
            ));
        }

        while let Some(entry) = self.ledger.pop() {
            log::warn!("Rolling back phase '{}'", entry.phase.id());
            result.merge(Self::rollback_phase(
                &entry.phase,
                &entry.records,
                None,
                profile,
                context,
            ));
        }

        result
    }

    fn rollback_phase(
        phase: &Phase,
        records: &[ActionRecord],
        params: Option<Parameters>,
        profile: &mut Profile,
        context: &ProvisioningContext,
    ) -> Status {
        let mut status = Status::multi(format!("Rollback of phase '{}'", phase.id()));
        let params = match params {
            Some(params) => params,
            None => phase.pre_perform(&mut status, profile, context),
        };

        for record in records.iter().rev() {
            phase.undo(&mut status, profile, &params, &record.operand, &record.actions);
        }

        phase.post_perform(&mut status, profile, params);
        status
    }

    pub fn is_phase_open(&self) -> bool {
        self.current.is_some()
    }

    /// Number of completed phases waiting for commit or rollback
    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    /// Action records of the open phase
    pub fn current_records(&self) -> &[ActionRecord] {
        match &self.current {
            Some(open) => open.records.as_slice(),
            None => &[],
        }
    }
}
