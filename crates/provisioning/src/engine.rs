//! Engine: drives a phase set over a list of operands
//!
//! For each phase, in order: open it in the session, `pre_perform`, run
//! every operand, `post_perform`, close it. The first failing step (or an
//! observed cancellation) stops forward progress and rolls the session
//! back. A successful run is committed.

use crate::cancel::CancellationToken;
use crate::context::{NoProgress, ProgressCallback, ProvisioningContext};
use crate::operand::Operand;
use crate::phase::PhaseSet;
use crate::plan::ProvisioningPlan;
use crate::profile::Profile;
use crate::session::EngineSession;
use crate::status::Status;
use std::sync::Arc;

/// The provisioning engine
///
/// Stateless; every run gets its own [`EngineSession`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }

    /// Apply `operands` to `profile` through every phase of `phases`
    pub fn perform(
        &self,
        profile: &mut Profile,
        phases: &PhaseSet,
        operands: &[Operand],
        context: &ProvisioningContext,
        cancel: &CancellationToken,
    ) -> Status {
        self.perform_with_progress(profile, phases, operands, context, cancel, &mut NoProgress)
    }

    /// [`perform`](Self::perform) with progress reporting
    pub fn perform_with_progress(
        &self,
        profile: &mut Profile,
        phases: &PhaseSet,
        operands: &[Operand],
        context: &ProvisioningContext,
        cancel: &CancellationToken,
        progress: &mut dyn ProgressCallback,
    ) -> Status {
        let mut session = EngineSession::new();
        self.perform_in(&mut session, profile, phases, operands, context, cancel, progress)
    }

    /// Apply a plan; a failing plan is reported without applying anything
    pub fn perform_plan(
        &self,
        profile: &mut Profile,
        phases: &PhaseSet,
        plan: &ProvisioningPlan,
        context: &ProvisioningContext,
        cancel: &CancellationToken,
    ) -> Status {
        if plan.status().is_failure() {
            log::warn!("Plan for profile '{}' failed, nothing applied", profile.id());
            return plan.status().clone();
        }
        self.perform(profile, phases, plan.operands(), context, cancel)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn perform_in(
        &self,
        session: &mut EngineSession,
        profile: &mut Profile,
        phases: &PhaseSet,
        operands: &[Operand],
        context: &ProvisioningContext,
        cancel: &CancellationToken,
        progress: &mut dyn ProgressCallback,
    ) -> Status {
        log::debug!(
            "Performing {} operand(s) on profile '{}' in phases {:?}",
            operands.len(),
            profile.id(),
            phases.ids()
        );
        let mut result = Status::multi(format!("Provisioning profile '{}'", profile.id()));

        match Self::run(session, profile, phases, operands, context, cancel, progress, &mut result) {
            Ok(()) => {
                session.commit();
                log::info!("Committed changes to profile '{}'", profile.id());
                result
            }
            Err(trigger) => {
                log::warn!("Provisioning failed, rolling back profile '{}'", profile.id());
                progress.on_rollback(&trigger);
                let rollback = session.rollback(profile, context);
                if rollback.is_failure() {
                    log::warn!("Rollback of profile '{}' was incomplete", profile.id());
                }
                Status::multi(format!("Provisioning profile '{}' failed", profile.id()))
                    .with(trigger)
                    .with(rollback)
            }
        }
    }

    /// Forward pass; `Err` carries the status that stopped it
    #[allow(clippy::too_many_arguments)]
    fn run(
        session: &mut EngineSession,
        profile: &mut Profile,
        phases: &PhaseSet,
        operands: &[Operand],
        context: &ProvisioningContext,
        cancel: &CancellationToken,
        progress: &mut dyn ProgressCallback,
        result: &mut Status,
    ) -> Result<(), Status> {
        let total_weight = phases.total_weight();
        let protocol = |err: crate::Error| Status::error(format!("Engine session error: {err}"));

        for phase in phases.iter() {
            if cancel.is_cancelled() {
                log::debug!("Cancelled before phase '{}'", phase.id());
                return Err(Status::cancel());
            }
            progress.on_phase_start(phase.id(), phase.weight(), total_weight);
            session.record_phase_start(Arc::clone(phase)).map_err(protocol)?;

            let mut status = Status::multi(format!("Phase '{}'", phase.id()));
            let params = phase.pre_perform(&mut status, profile, context);
            session.set_phase_parameters(params.clone()).map_err(protocol)?;
            if status.is_failure() {
                return Err(status);
            }

            for operand in operands {
                if cancel.is_cancelled() {
                    log::debug!("Cancelled in phase '{}' before {operand}", phase.id());
                    return Err(status.with(Status::cancel()));
                }
                progress.on_operand(phase.id(), operand);
                let operand_status = phase
                    .perform_operand(session, profile, &params, operand)
                    .map_err(protocol)?;
                status.merge(operand_status);
                if status.is_failure() {
                    return Err(status);
                }
            }

            session.take_phase_parameters();
            phase.post_perform(&mut status, profile, params);
            if status.is_failure() {
                return Err(status);
            }
            session.record_phase_end(phase).map_err(protocol)?;
            progress.on_phase_complete(phase.id(), phase.weight());
            result.merge(status);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionContext, ActionRef, ProvisioningAction};
    use crate::phase::{Phase, StandardPhases};
    use crate::status::Severity;
    use crate::testutil::{Hooks, MarkerPhase, RecordingAction, Trace, label, unit};
    use crate::touchpoint::{Touchpoint, TouchpointRegistry};
    use crate::unit::{InstallableUnit, TouchpointType};

    /// Two actions per phase and operand; the one named `fail_at` fails
    fn scripted_phase(id: &str, hooks: &Hooks, trace: &Trace, fail_at: Option<String>) -> Phase {
        let trace = trace.clone();
        let handler = MarkerPhase::new(hooks.clone()).with_actions(move |phase_id, operand| {
            (0..2)
                .map(|i| {
                    let name = format!("{phase_id}:{}:{i}", label(operand));
                    let mut action = RecordingAction::new(&name, &trace);
                    if fail_at.as_deref() == Some(name.as_str()) {
                        action = action.failing();
                    }
                    Arc::new(action) as ActionRef
                })
                .collect()
        });
        Phase::new(id, 10, handler).unwrap()
    }

    fn operands() -> Vec<Operand> {
        vec![
            Operand::install(unit("x")),
            Operand::install(unit("y")),
            Operand::uninstall(unit("z")),
        ]
    }

    fn all_action_names() -> Vec<String> {
        let mut names = Vec::new();
        for phase in ["first", "second"] {
            for operand in ["x", "y", "z"] {
                for i in 0..2 {
                    names.push(format!("{phase}:{operand}:{i}"));
                }
            }
        }
        names
    }

    fn run(fail_at: Option<String>) -> (Status, Trace, Hooks, EngineSession) {
        let hooks = Hooks::default();
        let trace = Trace::default();
        let phases = PhaseSet::new(vec![
            scripted_phase("first", &hooks, &trace, fail_at.clone()),
            scripted_phase("second", &hooks, &trace, fail_at),
        ])
        .unwrap();
        let mut session = EngineSession::new();
        let mut profile = Profile::new("test");
        let status = Engine::new().perform_in(
            &mut session,
            &mut profile,
            &phases,
            &operands(),
            &ProvisioningContext::new(),
            &CancellationToken::new(),
            &mut NoProgress,
        );
        (status, trace, hooks, session)
    }

    #[test]
    fn test_success_commits() {
        let (status, trace, _, session) = run(None);

        assert!(status.is_ok(), "{status}");
        assert_eq!(trace.executed().len(), 12);
        assert!(trace.undone().is_empty());
        assert_eq!(session.ledger_len(), 0);
        assert!(!session.is_phase_open());
    }

    #[test]
    fn test_any_single_failure_undoes_in_exact_reverse() {
        for fail_at in all_action_names() {
            let (status, trace, _, session) = run(Some(fail_at.clone()));

            assert!(status.is_failure(), "failure at {fail_at} not reported");
            let executed: Vec<String> = trace
                .executed()
                .into_iter()
                .map(|e| e.replacen("execute ", "", 1))
                .collect();
            let mut undone: Vec<String> = trace
                .undone()
                .into_iter()
                .map(|e| e.replacen("undo ", "", 1))
                .collect();
            undone.reverse();

            assert_eq!(executed.last(), Some(&fail_at));
            assert_eq!(undone, executed, "failure at {fail_at}");
            assert_eq!(session.ledger_len(), 0);
            assert!(!session.is_phase_open());
        }
    }

    #[test]
    fn test_hooks_bracket_phases_and_operands() {
        let hooks = Hooks::default();
        let phases = PhaseSet::new(vec![
            Phase::new("test", 1, MarkerPhase::new(hooks.clone())).unwrap(),
        ])
        .unwrap();
        let operands = vec![Operand::install(unit("a")), Operand::install(unit("b"))];

        let status = Engine::new().perform(
            &mut Profile::new("test"),
            &phases,
            &operands,
            &ProvisioningContext::new(),
            &CancellationToken::new(),
        );

        assert!(status.is_ok(), "{status}");
        assert_eq!(
            hooks.events(),
            vec![
                "initialize_phase test",
                "initialize_operand a",
                "complete_operand a",
                "initialize_operand b",
                "complete_operand b",
                "complete_phase test",
            ]
        );
    }

    #[test]
    fn test_empty_operands_still_run_phase_hooks() {
        let hooks = Hooks::default();
        let phases =
            PhaseSet::new(vec![Phase::new("test", 1, MarkerPhase::new(hooks.clone())).unwrap()])
                .unwrap();

        let status = Engine::new().perform(
            &mut Profile::new("test"),
            &phases,
            &[],
            &ProvisioningContext::new(),
            &CancellationToken::new(),
        );
        assert!(status.is_ok());
        assert_eq!(hooks.events(), vec!["initialize_phase test", "complete_phase test"]);
    }

    #[test]
    fn test_failing_complete_phase_reruns_pre_perform_on_rollback() {
        let hooks = Hooks::default();
        let trace = Trace::default();
        let source = trace.clone();
        let handler = MarkerPhase::new(hooks.clone())
            .with_actions(move |_, operand| {
                vec![Arc::new(RecordingAction::new(&label(operand), &source)) as ActionRef]
            })
            .failing_complete_phase();
        let phases = PhaseSet::new(vec![Phase::new("test", 1, handler).unwrap()]).unwrap();

        let status = Engine::new().perform(
            &mut Profile::new("test"),
            &phases,
            &[Operand::install(unit("a"))],
            &ProvisioningContext::new(),
            &CancellationToken::new(),
        );

        assert_eq!(status.severity(), Severity::Error);
        assert_eq!(trace.undone(), vec!["undo a"]);
        assert_eq!(
            hooks.events(),
            vec![
                "initialize_phase test",
                "initialize_operand a",
                "complete_operand a",
                "complete_phase test",
                "initialize_phase test",
                "initialize_operand a",
                "complete_operand a",
                "complete_phase test",
            ]
        );
    }

    /// Sets the token while it runs
    #[derive(Debug)]
    struct CancelOnExecute(CancellationToken);

    impl ProvisioningAction for CancelOnExecute {
        fn execute(&self, _ctx: &mut ActionContext<'_>) -> anyhow::Result<Status> {
            self.0.cancel();
            Ok(Status::ok())
        }

        fn undo(&self, _ctx: &mut ActionContext<'_>) -> anyhow::Result<Status> {
            Ok(Status::ok())
        }
    }

    #[test]
    fn test_cancellation_between_operands_rolls_back() {
        let hooks = Hooks::default();
        let trace = Trace::default();
        let cancel = CancellationToken::new();
        let (source, token) = (trace.clone(), cancel.clone());
        let handler = MarkerPhase::new(hooks.clone()).with_actions(move |_, operand| {
            let name = label(operand);
            let mut actions = vec![Arc::new(RecordingAction::new(&name, &source)) as ActionRef];
            if name == "a" {
                actions.push(Arc::new(CancelOnExecute(token.clone())));
            }
            actions
        });
        let phases = PhaseSet::new(vec![Phase::new("test", 1, handler).unwrap()]).unwrap();
        let operands = vec![Operand::install(unit("a")), Operand::install(unit("b"))];

        let status = Engine::new().perform(
            &mut Profile::new("test"),
            &phases,
            &operands,
            &ProvisioningContext::new(),
            &cancel,
        );

        assert!(status.is_failure());
        assert!(status.is_cancelled());
        assert_eq!(trace.executed(), vec!["execute a"]);
        assert_eq!(trace.undone(), vec!["undo a"]);
    }

    #[test]
    fn test_cancelled_before_start() {
        let hooks = Hooks::default();
        let phases =
            PhaseSet::new(vec![Phase::new("test", 1, MarkerPhase::new(hooks.clone())).unwrap()])
                .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let status = Engine::new().perform(
            &mut Profile::new("test"),
            &phases,
            &[Operand::install(unit("a"))],
            &ProvisioningContext::new(),
            &cancel,
        );

        assert_eq!(status.severity(), Severity::Cancel);
        assert!(hooks.events().is_empty());
    }

    #[derive(Debug)]
    struct Warn;

    impl ProvisioningAction for Warn {
        fn execute(&self, _ctx: &mut ActionContext<'_>) -> anyhow::Result<Status> {
            Ok(Status::warning("mirror is slow"))
        }

        fn undo(&self, _ctx: &mut ActionContext<'_>) -> anyhow::Result<Status> {
            Ok(Status::ok())
        }
    }

    #[test]
    fn test_warnings_aggregate_without_failing() {
        let handler =
            MarkerPhase::new(Hooks::default()).with_actions(|_, _| vec![Arc::new(Warn) as ActionRef]);
        let phases = PhaseSet::new(vec![Phase::new("test", 1, handler).unwrap()]).unwrap();

        let status = Engine::new().perform(
            &mut Profile::new("test"),
            &phases,
            &[Operand::install(unit("a"))],
            &ProvisioningContext::new(),
            &CancellationToken::new(),
        );

        assert_eq!(status.severity(), Severity::Warning);
        assert!(!status.is_failure());
        assert!(status.to_string().contains("mirror is slow"));
    }

    #[test]
    fn test_failing_plan_is_not_applied() {
        let hooks = Hooks::default();
        let phases =
            PhaseSet::new(vec![Phase::new("test", 1, MarkerPhase::new(hooks.clone())).unwrap()])
                .unwrap();
        let plan = ProvisioningPlan::new(
            Status::error("unsatisfied dependency"),
            vec![Operand::install(unit("a"))],
        );

        let status = Engine::new().perform_plan(
            &mut Profile::new("test"),
            &phases,
            &plan,
            &ProvisioningContext::new(),
            &CancellationToken::new(),
        );

        assert_eq!(status.message(), Some("unsatisfied dependency"));
        assert!(hooks.events().is_empty());
    }

    #[derive(Default)]
    struct Progress {
        events: Vec<String>,
    }

    impl ProgressCallback for Progress {
        fn on_phase_start(&mut self, phase_id: &str, weight: u32, total_weight: u32) {
            self.events.push(format!("start {phase_id} {weight}/{total_weight}"));
        }

        fn on_operand(&mut self, phase_id: &str, operand: &Operand) {
            self.events.push(format!("{phase_id} {}", label(operand)));
        }

        fn on_phase_complete(&mut self, phase_id: &str, _weight: u32) {
            self.events.push(format!("done {phase_id}"));
        }

        fn on_rollback(&mut self, _trigger: &Status) {
            self.events.push("rollback".into());
        }
    }

    #[test]
    fn test_progress_reports_weights() {
        let phases = PhaseSet::new(vec![
            Phase::new("collect", 100, MarkerPhase::new(Hooks::default())).unwrap(),
            Phase::new("install", 50, MarkerPhase::new(Hooks::default())).unwrap(),
        ])
        .unwrap();
        let mut progress = Progress::default();

        let status = Engine::new().perform_with_progress(
            &mut Profile::new("test"),
            &phases,
            &[Operand::install(unit("a"))],
            &ProvisioningContext::new(),
            &CancellationToken::new(),
            &mut progress,
        );

        assert!(status.is_ok());
        assert_eq!(
            progress.events,
            vec![
                "start collect 100/150",
                "collect a",
                "done collect",
                "start install 50/150",
                "install a",
                "done install",
            ]
        );
    }

    /// Touchpoint whose `fail` action always fails
    #[derive(Debug)]
    struct Flaky;

    #[derive(Debug)]
    struct Fail;

    impl ProvisioningAction for Fail {
        fn execute(&self, _ctx: &mut ActionContext<'_>) -> anyhow::Result<Status> {
            anyhow::bail!("configuration refused")
        }

        fn undo(&self, _ctx: &mut ActionContext<'_>) -> anyhow::Result<Status> {
            Ok(Status::ok())
        }
    }

    impl Touchpoint for Flaky {
        fn touchpoint_type(&self) -> TouchpointType {
            TouchpointType::new("flaky")
        }

        fn action(&self, name: &str) -> Option<ActionRef> {
            (name == "fail").then(|| Arc::new(Fail) as ActionRef)
        }
    }

    fn standard_phases() -> PhaseSet {
        let mut registry = TouchpointRegistry::new();
        registry.register_touchpoint(Arc::new(Flaky));
        StandardPhases::new(Arc::new(registry)).build().unwrap()
    }

    #[test]
    fn test_standard_phases_update_profile() {
        let old = unit("app");
        let new = InstallableUnit::new("app", "2.0.0").into_ref();
        let mut profile = Profile::new("test");
        profile.add_unit(old.clone());

        let status = Engine::new().perform(
            &mut profile,
            &standard_phases(),
            &[Operand::update(old.clone(), new.clone())],
            &ProvisioningContext::new(),
            &CancellationToken::new(),
        );

        assert!(status.is_ok(), "{status}");
        assert!(!profile.contains_unit(&old));
        assert!(profile.contains_unit(&new));
    }

    #[test]
    fn test_standard_phases_restore_profile_on_failure() {
        let old = unit("app");
        let new = InstallableUnit::new("app", "2.0.0")
            .with_touchpoint(TouchpointType::new("flaky"))
            .with_instruction("configure", "fail()")
            .into_ref();
        let mut profile = Profile::new("test");
        profile.add_unit(old.clone());
        let before = profile.clone();

        let status = Engine::new().perform(
            &mut profile,
            &standard_phases(),
            &[Operand::update(old, new)],
            &ProvisioningContext::new(),
            &CancellationToken::new(),
        );

        assert!(status.is_failure());
        assert!(status.to_string().contains("configuration refused"));
        assert_eq!(profile, before);
    }
}
