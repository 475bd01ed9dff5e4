//! Fan-out / fan-in of role invocations.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use conclave_registry::RoleRegistry;

use crate::backend::{extract_confidence, AgentBackend, BackendError};
use crate::collector::{ResponseCollector, RoleResponse};

/// Result of one dispatch round.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// The filled response table. Empty when the round was aborted.
    pub collector: ResponseCollector,
    /// True when a council-wide abort discarded the round.
    pub aborted: bool,
}

/// Fans a sanitized query out to every enabled role and joins when all
/// invocations reach a terminal outcome.
///
/// Invocations run as independent tasks on the shared tokio runtime -
/// its worker threads persist across cycles, so nothing is spawned per
/// call beyond the task itself. There is no per-call deadline; the join
/// loop below is an explicit barrier, released only when every role has
/// reported or the round is aborted.
pub struct Dispatcher {
    backend: Arc<dyn AgentBackend>,
}

impl Dispatcher {
    /// Creates a dispatcher over a backend.
    pub fn new(backend: Arc<dyn AgentBackend>) -> Self {
        Self { backend }
    }

    /// Runs one round against every enabled role in the snapshot.
    ///
    /// A failing role is captured as `Failed` in its own entry and
    /// never aborts its siblings. When `abort` fires, outstanding
    /// invocations are dropped and all in-flight results discarded.
    pub async fn dispatch(
        &self,
        registry: &RoleRegistry,
        prompt: &str,
        abort: watch::Receiver<bool>,
    ) -> DispatchOutcome {
        let mut join_set = JoinSet::new();

        for role in registry.enabled_roles() {
            let role = role.clone();
            let backend = Arc::clone(&self.backend);
            let prompt = prompt.to_string();
            let abort = abort.clone();

            join_set.spawn(async move {
                let start = Instant::now();
                tokio::select! {
                    result = backend.invoke(&role, &prompt) => {
                        let elapsed = start.elapsed();
                        Some(match result {
                            Ok(reply) => {
                                let confidence =
                                    reply.confidence.or_else(|| extract_confidence(&reply.text));
                                debug!(role = %role.name, ?elapsed, "role responded");
                                RoleResponse::success(&role.name, reply.text, confidence, elapsed)
                            }
                            Err(BackendError::Timeout(reason)) => {
                                debug!(role = %role.name, %reason, "role timed out");
                                RoleResponse::timed_out(&role.name, elapsed)
                            }
                            Err(err) => {
                                debug!(role = %role.name, %err, "role failed");
                                RoleResponse::failed(&role.name, err.to_string(), elapsed)
                            }
                        })
                    }
                    _ = wait_abort(abort) => None,
                }
            });
        }

        let dispatched = join_set.len();
        info!(roles = dispatched, "dispatched council round");

        let mut collector = ResponseCollector::new();
        let mut aborted = false;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Some(response)) => collector.record(response),
                Ok(None) => aborted = true,
                Err(join_err) => {
                    // A panicking backend loses its entry; the barrier
                    // still releases once every task is joined.
                    error!(%join_err, "role invocation task failed to join");
                }
            }
        }

        if aborted {
            info!("round aborted; discarding in-flight results");
            return DispatchOutcome {
                collector: ResponseCollector::new(),
                aborted: true,
            };
        }

        DispatchOutcome {
            collector,
            aborted: false,
        }
    }
}

/// Resolves when the abort signal is raised. If the abort channel's
/// sender is gone no abort can ever arrive, so pend forever rather
/// than resolving.
async fn wait_abort(mut abort: watch::Receiver<bool>) {
    if abort.wait_for(|raised| *raised).await.is_err() {
        std::future::pending::<()>().await;
    }
}
