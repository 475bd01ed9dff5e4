//! The council controller: one deterministic state machine per
//! council, driving screen → snapshot → dispatch → assess → reduce →
//! screen → log for every submitted query.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use conclave_consensus::{
    synthesis_prompt, AgentBackend, ConsensusEngine, ConsensusMode, Dispatcher, RoleResponse,
};
use conclave_gate::{GateConfig, SecurityGate};
use conclave_monitor::{IntegrityAction, IntegrityMonitor};
use conclave_registry::{RegistryHandle, Role, RoleRegistry};

use crate::config::CouncilConfig;
use crate::error::CouncilError;
use crate::result::{CouncilResult, CouncilStatus, CycleOutcome, CycleSink, CycleSummary, LogRecord};
use crate::state::{CouncilState, StateTrace};

/// Per-cycle bookkeeping, created at submit and consumed at finish.
struct CycleCtx {
    cycle_id: String,
    trace: StateTrace,
    security_events: Vec<String>,
    started: Instant,
    sanitized_query: String,
}

/// The council.
///
/// Owns the gate, the registry handle, the monitor, the dispatcher and
/// the consensus engine, and runs one cycle at a time through the
/// lifecycle states. [`Council::submit`] never returns an error: every
/// terminal condition, including rejection and total role failure, is
/// a [`CycleOutcome`] on the returned [`CouncilResult`].
pub struct Council {
    registry: RegistryHandle,
    gate: SecurityGate,
    monitor: IntegrityMonitor,
    dispatcher: Dispatcher,
    engine: ConsensusEngine,
    default_mode: ConsensusMode,
    state: Mutex<CouncilState>,
    last_cycle: Mutex<Option<CycleSummary>>,
    active_abort: Mutex<Option<watch::Sender<bool>>>,
    // Serializes cycles; status/abort/swap stay available mid-cycle.
    cycle_lock: tokio::sync::Mutex<()>,
    sink: Option<Box<dyn CycleSink>>,
}

impl Council {
    /// Builds a council from configuration and a backend.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InvalidRoles`] when the configured roles fail
    /// validation, [`CouncilError::InvalidMonitor`] when the
    /// divergence ceiling is out of range.
    pub fn new(
        config: &CouncilConfig,
        backend: Arc<dyn AgentBackend>,
    ) -> Result<Self, CouncilError> {
        let registry = RoleRegistry::from_roles(config.build_roles())?;
        let monitor = IntegrityMonitor::with_metric(
            config.divergence_ceiling,
            config.max_recursion_depth,
            config.similarity_metric,
        )?;
        let gate = SecurityGate::with_config(GateConfig {
            enable_injection_detection: config.security.enable_injection_detection,
            max_input_length: config.max_input_length,
        });

        Ok(Self {
            registry: RegistryHandle::new(registry),
            gate,
            monitor,
            dispatcher: Dispatcher::new(backend),
            engine: ConsensusEngine::with_metric(config.similarity_metric),
            default_mode: config.consensus_mode,
            state: Mutex::new(CouncilState::Idle),
            last_cycle: Mutex::new(None),
            active_abort: Mutex::new(None),
            cycle_lock: tokio::sync::Mutex::new(()),
            sink: None,
        })
    }

    /// Attaches a log sink; one record per cycle is delivered to it.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn CycleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Runs one full cycle with the configured consensus mode.
    pub async fn submit(&self, query: &str) -> CouncilResult {
        self.submit_with_mode(query, None).await
    }

    /// Runs one full cycle, optionally overriding the consensus mode.
    pub async fn submit_with_mode(
        &self,
        query: &str,
        mode: Option<ConsensusMode>,
    ) -> CouncilResult {
        let _cycle = self.cycle_lock.lock().await;
        let mode = mode.unwrap_or(self.default_mode);

        let mut ctx = CycleCtx {
            cycle_id: Uuid::new_v4().to_string(),
            trace: StateTrace::new(),
            security_events: Vec::new(),
            started: Instant::now(),
            sanitized_query: String::new(),
        };
        ctx.trace.push(CouncilState::Idle);
        info!(cycle = %ctx.cycle_id, %mode, "cycle started");

        // ASSEMBLING: screen the query and snapshot the roles.
        self.transition(&mut ctx, CouncilState::Assembling);
        let screening = self.gate.screen_input(query);
        for finding in &screening.findings {
            ctx.security_events.push(format!("input screening: {finding}"));
        }
        if screening.truncated {
            ctx.security_events.push(format!(
                "input truncated to {} characters",
                self.gate.config().max_input_length
            ));
        }
        ctx.sanitized_query = screening.sanitized.clone();
        if let Some(reason) = screening.rejection {
            return self.finish(
                ctx,
                CycleOutcome::InputRejected {
                    reason: reason.to_string(),
                },
                None,
                None,
                Vec::new(),
                0.0,
                0,
                false,
            );
        }

        let snapshot = self.registry.snapshot();
        if snapshot.enabled_count() == 0 {
            return self.finish(
                ctx,
                CycleOutcome::NoRolesAvailable,
                None,
                None,
                Vec::new(),
                0.0,
                0,
                false,
            );
        }

        // Arm the abort channel for this cycle.
        let (abort_tx, abort_rx) = watch::channel(false);
        *self.lock_abort() = Some(abort_tx);

        // DELIBERATING: dispatch rounds until the monitor says stop.
        self.transition(&mut ctx, CouncilState::Deliberating);
        let mut prompt = ctx.sanitized_query.clone();
        let mut depth = 0u32;
        let mut divergence = 0.0f64;
        let mut low_confidence = false;
        let collector = loop {
            let round = self
                .dispatcher
                .dispatch(&snapshot, &prompt, abort_rx.clone())
                .await;
            if round.aborted {
                return self.finish(
                    ctx,
                    CycleOutcome::Aborted,
                    None,
                    None,
                    Vec::new(),
                    divergence,
                    depth,
                    false,
                );
            }
            let collector = round.collector;
            if !collector.is_viable() {
                return self.finish(
                    ctx,
                    CycleOutcome::AllRolesFailed,
                    None,
                    None,
                    collector.into_responses(),
                    divergence,
                    depth,
                    false,
                );
            }

            let assessment = {
                let successes = collector.successes();
                let texts: Vec<&str> = successes.iter().map(|r| r.text.as_str()).collect();
                self.monitor.assess(&texts, depth, mode.is_iterative())
            };
            divergence = assessment.divergence;
            match assessment.action {
                IntegrityAction::Proceed => break collector,
                IntegrityAction::RequestRound => {
                    depth += 1;
                    ctx.security_events.push(format!(
                        "divergence {:.3} over ceiling {:.3}; deliberative round {depth}",
                        assessment.divergence,
                        self.monitor.divergence_ceiling()
                    ));
                    debug!(cycle = %ctx.cycle_id, depth, "re-dispatching deliberative round");
                    prompt = synthesis_prompt(&ctx.sanitized_query, &collector.successes());
                }
                IntegrityAction::ForceConsensus => {
                    low_confidence = true;
                    ctx.security_events.push(format!(
                        "divergence {:.3} over ceiling {:.3} with no recursion budget; \
                         forcing consensus",
                        assessment.divergence,
                        self.monitor.divergence_ceiling()
                    ));
                    break collector;
                }
            }
        };

        // CONSENSUS: reduce the surviving round.
        self.transition(&mut ctx, CouncilState::Consensus);
        let outcome = match self.engine.resolve(mode, &collector, &snapshot) {
            Ok(outcome) => outcome,
            Err(err) => {
                // Unreachable after the viability check above; treated
                // as a failed round rather than a panic.
                warn!(cycle = %ctx.cycle_id, error = %err, "consensus yielded no outcome");
                return self.finish(
                    ctx,
                    CycleOutcome::AllRolesFailed,
                    None,
                    None,
                    collector.into_responses(),
                    divergence,
                    depth,
                    low_confidence,
                );
            }
        };

        // The synthesized response is screened before release; a hit
        // here withholds the output entirely.
        let hits = self.gate.screen_output(&outcome.final_response);
        if !hits.is_empty() {
            for finding in &hits {
                ctx.security_events.push(format!("output screening: {finding}"));
            }
            let reason = hits
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return self.finish(
                ctx,
                CycleOutcome::IntegrityViolation { reason },
                None,
                Some(outcome.chosen_algorithm),
                collector.into_responses(),
                divergence,
                depth,
                low_confidence,
            );
        }

        // OUTPUT: release.
        self.transition(&mut ctx, CouncilState::Output);
        self.finish(
            ctx,
            CycleOutcome::Completed,
            Some(outcome.final_response),
            Some(outcome.chosen_algorithm),
            collector.into_responses(),
            divergence,
            depth,
            low_confidence,
        )
    }

    /// Cancels the in-flight cycle, if any. Returns whether an abort
    /// signal was delivered.
    pub fn abort(&self) -> bool {
        match self.lock_abort().as_ref() {
            Some(sender) => sender.send(true).is_ok(),
            None => false,
        }
    }

    /// Read-only status snapshot; never mutates cycle state.
    pub fn status(&self) -> CouncilStatus {
        CouncilStatus {
            state: *self.lock_state(),
            registered_roles: self.registry.snapshot().role_names(),
            last_cycle_summary: self.lock_last_cycle().clone(),
        }
    }

    /// Replaces the role set. A cycle already past ASSEMBLING keeps
    /// its own snapshot; the new set applies from the next cycle.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InvalidRoles`] when the new set fails
    /// validation; the current set stays in place.
    pub fn swap_registry(&self, roles: Vec<Role>) -> Result<(), CouncilError> {
        let registry = RoleRegistry::from_roles(roles)?;
        self.registry.swap(registry);
        info!("role registry swapped");
        Ok(())
    }

    /// The consensus mode used when submit does not override it.
    pub fn default_mode(&self) -> ConsensusMode {
        self.default_mode
    }

    fn transition(&self, ctx: &mut CycleCtx, state: CouncilState) {
        *self.lock_state() = state;
        ctx.trace.push(state);
        debug!(cycle = %ctx.cycle_id, %state, "state transition");
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        mut ctx: CycleCtx,
        outcome: CycleOutcome,
        final_response: Option<String>,
        chosen_algorithm: Option<ConsensusMode>,
        responses: Vec<RoleResponse>,
        divergence_score: f64,
        recursion_depth: u32,
        low_confidence: bool,
    ) -> CouncilResult {
        self.transition(&mut ctx, CouncilState::Logged);
        let elapsed = ctx.started.elapsed();
        let sanitized_query = ctx.sanitized_query;

        let result = CouncilResult {
            cycle_id: ctx.cycle_id,
            outcome,
            final_response,
            chosen_algorithm,
            responses,
            state_trace: ctx.trace,
            divergence_score,
            recursion_depth,
            low_confidence,
            security_events: ctx.security_events,
            elapsed,
        };

        let record = LogRecord::from_result(&result, &sanitized_query);
        if let Some(sink) = &self.sink {
            sink.record(&record);
        }
        *self.lock_last_cycle() = Some(CycleSummary {
            cycle_id: result.cycle_id.clone(),
            outcome: result.outcome.clone(),
            chosen_algorithm: result.chosen_algorithm,
            divergence_score: result.divergence_score,
            elapsed: result.elapsed,
            finished_at: record.finished_at,
        });

        *self.lock_abort() = None;
        *self.lock_state() = CouncilState::Idle;
        info!(
            cycle = %result.cycle_id,
            outcome = result.outcome.label(),
            ?elapsed,
            "cycle finished"
        );
        result
    }

    fn lock_state(&self) -> MutexGuard<'_, CouncilState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_last_cycle(&self) -> MutexGuard<'_, Option<CycleSummary>> {
        self.last_cycle.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_abort(&self) -> MutexGuard<'_, Option<watch::Sender<bool>>> {
        self.active_abort.lock().unwrap_or_else(|p| p.into_inner())
    }
}
