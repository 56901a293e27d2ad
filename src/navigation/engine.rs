use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::apps::app_script::AppMetadata;
use crate::device::{probe::DeviceProbe, snapshot::DeviceSnapshot};
use crate::export::diagnostics::{DiagnosticSink, FailureCategory, failure_record};
use crate::graph::{error::GraphError, script_graph::ScriptGraph};
use crate::navigation::{
    cancel::CancelToken,
    context::{ActionRecord, RunContext},
    error::{NavigationError, format_ids},
};
use crate::screen::{actions::ActionList, screen_model::ScreenId};
use crate::trace::{logger::TraceLogger, trace::TraceEvent};
use crate::verification::matcher::{match_any, missing_required, observe};

pub const DEFAULT_MAX_TRANSITIONS: usize = 100;

/// Retry behaviour of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-probe (up to each screen's `max_retries`) before failing
    pub retry: bool,

    /// Action lists executed per run before giving up on a cycle
    pub max_transitions: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry: true,
            max_transitions: DEFAULT_MAX_TRANSITIONS,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            retry: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The device is verified to be on this target screen
    Reached(ScreenId),

    /// The run was cancelled at a probe or wait boundary
    Cancelled,
}

/// Drives a device through a script graph: probe, verify, act, re-verify.
///
/// Strictly sequential; one `Navigator` call owns one device for the
/// duration of the run.
pub struct Navigator<'g> {
    graph: &'g ScriptGraph,
    app: &'g AppMetadata,
    exporter: &'g dyn DiagnosticSink,
    tracer: Option<&'g TraceLogger>,
    policy: RetryPolicy,
    cancel: CancelToken,
}

impl<'g> Navigator<'g> {
    pub fn new(graph: &'g ScriptGraph, app: &'g AppMetadata, exporter: &'g dyn DiagnosticSink) -> Self {
        Navigator {
            graph,
            app,
            exporter,
            tracer: None,
            policy: RetryPolicy::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_tracer(mut self, tracer: &'g TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Validate the graph and navigate from its start screens to its end screens.
    pub fn run(
        &self,
        ctx: &mut RunContext<'g>,
        probe: &mut dyn DeviceProbe,
    ) -> Result<NavigationOutcome, NavigationError> {
        self.graph.validate()?;
        let starts = self.graph.start_nodes();
        let ends = self.graph.end_nodes();
        self.advance_with(ctx, probe, &starts, &ends)
    }

    /// Navigate from one of `current` to one of `targets` with a fresh run context.
    pub fn advance(
        &self,
        probe: &mut dyn DeviceProbe,
        current: &[ScreenId],
        targets: &[ScreenId],
    ) -> Result<NavigationOutcome, NavigationError> {
        let mut ctx = RunContext::new(self.graph);
        self.advance_with(&mut ctx, probe, current, targets)
    }

    /// Navigate from one of `current` to one of `targets`.
    ///
    /// `current` is ordered by priority: when several screens match the same
    /// snapshot, the earliest listed wins.
    pub fn advance_with(
        &self,
        ctx: &mut RunContext<'g>,
        probe: &mut dyn DeviceProbe,
        current: &[ScreenId],
        targets: &[ScreenId],
    ) -> Result<NavigationOutcome, NavigationError> {
        if current.is_empty() {
            return Err(GraphError::NoStartNode.into());
        }
        if targets.is_empty() {
            return Err(GraphError::NoEndNode.into());
        }
        for id in current.iter().chain(targets.iter()) {
            if !self.graph.contains(*id) {
                return Err(GraphError::UnknownScreen(*id).into());
            }
        }

        info!(
            app = %self.app.package_name,
            from = %format_ids(current),
            to = %format_ids(targets),
            "navigation started"
        );

        let reaching = self.graph.reaching_set(targets);
        let mut expected: Vec<ScreenId> = current.to_vec();

        loop {
            let (screen, snapshot) = match self.await_screen(ctx, probe, &expected)? {
                Some(found) => found,
                None => return Ok(self.cancelled(ctx, &expected)),
            };
            ctx.enter(screen);

            if targets.contains(&screen) {
                info!(screen = %screen, transitions = ctx.transitions(), "target screen reached");
                self.trace(TraceEvent::now(ctx.probes, "reached").with_screen(screen));
                return Ok(NavigationOutcome::Reached(screen));
            }

            if ctx.transitions() >= self.policy.max_transitions {
                let export = self.export(ctx, FailureCategory::TransitionLimit, &snapshot, &expected);
                self.trace(
                    TraceEvent::now(ctx.probes, "failed")
                        .with_screen(screen)
                        .with_detail("transition limit"),
                );
                return Err(NavigationError::TransitionLimit {
                    limit: self.policy.max_transitions,
                    screen,
                    export,
                });
            }

            let descriptor = self
                .graph
                .screen(screen)
                .ok_or(GraphError::UnknownScreen(screen))?;
            let observed = observe(&snapshot, descriptor);
            let candidates = if descriptor.action_table.is_empty() {
                self.graph.offered_action_lists(screen)
            } else {
                descriptor.select_actions(&observed)
            };
            debug!(screen = %screen, ?candidates, optional = observed.optional.len(), "selecting actions");

            let (list, next) = self
                .choose_route(screen, &candidates, &reaching)
                .ok_or_else(|| NavigationError::NoRoute {
                    from: screen,
                    targets: targets.to_vec(),
                })?;

            if self.cancel.is_cancelled() {
                return Ok(self.cancelled(ctx, &expected));
            }

            self.execute(ctx, probe, screen, list)?;
            ctx.record(ActionRecord {
                screen,
                action_list: list.name.clone(),
                expected_next: next.clone(),
            });
            expected = next;

            if self.cancel.sleep(descriptor.wait) {
                return Ok(self.cancelled(ctx, &expected));
            }
        }
    }

    // ------------------------------------------------------------------------
    // Verification with retries
    // ------------------------------------------------------------------------

    /// Probe until one of `expected` matches. `Ok(None)` means cancelled.
    fn await_screen(
        &self,
        ctx: &mut RunContext<'g>,
        probe: &mut dyn DeviceProbe,
        expected: &[ScreenId],
    ) -> Result<Option<(ScreenId, DeviceSnapshot)>, NavigationError> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            let captured = probe.capture();
            ctx.probes += 1;
            self.trace(TraceEvent::now(ctx.probes, "probe").with_expected(expected));
            let snapshot = match captured {
                Ok(snapshot) => snapshot,
                Err(err) if err.is_device_loss() => {
                    return Err(NavigationError::DeviceUnavailable(err));
                }
                Err(err) => {
                    warn!(error = %err, "unreadable screen capture, counting as a miss");
                    DeviceSnapshot::from_elements(vec![])
                }
            };

            if let Some(screen) = match_any(&snapshot, expected, self.graph) {
                debug!(screen = %screen, "screen matched");
                ctx.clear_retries(expected);
                self.trace(
                    TraceEvent::now(ctx.probes, "matched")
                        .with_screen(screen)
                        .with_expected(expected),
                );
                return Ok(Some((screen, snapshot)));
            }

            let budget = ctx.remaining_budget(expected);
            if self.policy.retry && !budget.is_empty() {
                let wait = budget.iter().map(|(_, w)| *w).max().unwrap_or_default();
                let attempted: Vec<ScreenId> = budget.iter().map(|(id, _)| *id).collect();
                ctx.bump_retries(&attempted);
                debug!(
                    expected = %format_ids(expected),
                    wait_ms = wait.as_millis() as u64,
                    "no expected screen yet, retrying"
                );
                self.trace(
                    TraceEvent::now(ctx.probes, "retry")
                        .with_expected(expected)
                        .with_detail(format!("wait {} ms", wait.as_millis())),
                );
                if self.cancel.sleep(wait) {
                    return Ok(None);
                }
                continue;
            }

            for id in expected {
                if let Some(descriptor) = self.graph.screen(*id) {
                    let missing: Vec<String> = missing_required(&snapshot, descriptor)
                        .iter()
                        .map(|fp| fp.to_string())
                        .collect();
                    warn!(screen = %descriptor, ?missing, "expected screen not on device");
                }
            }

            let export = self.export(ctx, FailureCategory::UnexpectedScreen, &snapshot, expected);
            self.trace(
                TraceEvent::now(ctx.probes, "failed")
                    .with_expected(expected)
                    .with_detail("unexpected screen"),
            );
            return Err(NavigationError::UnexpectedScreen {
                searched_for: expected.to_vec(),
                observed: Box::new(snapshot),
                export,
            });
        }
    }

    // ------------------------------------------------------------------------
    // Action selection and execution
    // ------------------------------------------------------------------------

    /// First candidate offered by an outgoing transition whose destination
    /// can still reach a target. Returns the action list and every screen
    /// that list may lead to.
    fn choose_route(
        &self,
        screen: ScreenId,
        candidates: &[String],
        reaching: &HashSet<ScreenId>,
    ) -> Option<(&'g ActionList, Vec<ScreenId>)> {
        let outgoing = self.graph.transitions_from(screen);

        for name in candidates {
            let routable = outgoing
                .iter()
                .any(|t| t.action_list(name).is_some() && reaching.contains(&t.to));
            if !routable {
                continue;
            }

            let list = outgoing.iter().find_map(|t| t.action_list(name))?;
            let mut next: Vec<ScreenId> = Vec::new();
            for t in outgoing.iter().filter(|t| t.action_list(name).is_some()) {
                if !next.contains(&t.to) {
                    next.push(t.to);
                }
            }
            return Some((list, next));
        }

        None
    }

    fn execute(
        &self,
        ctx: &RunContext<'g>,
        probe: &mut dyn DeviceProbe,
        screen: ScreenId,
        list: &ActionList,
    ) -> Result<(), NavigationError> {
        info!(screen = %screen, action_list = %list.name, steps = list.len(), "executing action list");
        self.trace(
            TraceEvent::now(ctx.probes, "act")
                .with_screen(screen)
                .with_action_list(&list.name),
        );

        for (step, action) in list.actions.iter().enumerate() {
            debug!(step, action = %action.describe(), "perform");
            probe
                .perform(action)
                .map_err(|source| NavigationError::ActionExecution {
                    screen,
                    action_list: list.name.clone(),
                    step,
                    source,
                })?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn cancelled(&self, ctx: &RunContext<'g>, expected: &[ScreenId]) -> NavigationOutcome {
        info!(expected = %format_ids(expected), "navigation cancelled");
        self.trace(TraceEvent::now(ctx.probes, "cancelled").with_expected(expected));
        NavigationOutcome::Cancelled
    }

    fn export(
        &self,
        ctx: &RunContext<'g>,
        category: FailureCategory,
        snapshot: &DeviceSnapshot,
        expected: &[ScreenId],
    ) -> Option<std::path::PathBuf> {
        let names = expected
            .iter()
            .filter_map(|id| self.graph.screen(*id))
            .map(|d| d.name.clone())
            .collect();
        let record = failure_record(
            category,
            self.app,
            ctx.current,
            expected,
            names,
            snapshot,
            &ctx.history,
        );
        self.exporter.export_failure(&record)
    }

    fn trace(&self, event: TraceEvent) {
        if let Some(tracer) = self.tracer {
            tracer.log(&event);
        }
    }
}
