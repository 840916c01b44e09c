//! Pregel Runtime - superstep orchestrator
//!
//! Each round follows the sequence: Read → Map → Shuffle → Reduce → Merge →
//! Write. The orchestrator alone owns the cumulative augmentation map and the
//! convergence countdown; both are updated between rounds only.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::checkpoint::{Checkpoint, Checkpointer};
use super::config::PregelConfig;
use super::error::PregelError;
use super::message::FlowMessage;
use super::state::{AugmentationMap, ConvergencePhase, ConvergenceState, RoundInput};
use super::store::VertexStore;
use super::vertex::{ComputeContext, VertexId};
use crate::flow::{MapStats, ReducerProgram, VertexProgram};

/// What happened in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Round number (0-indexed)
    pub superstep: usize,
    /// Source-excess paths kept across all vertices after the reduce
    pub source_paths: usize,
    /// Full paths admitted at the sink
    pub accepted_paths: usize,
    /// Flow value added by the round
    pub accepted_flow: i64,
    /// Convergence countdown after observing the round
    pub countdown: usize,
}

/// Result of a converged run
#[derive(Debug, Clone)]
pub struct FlowResult {
    /// Run identifier
    pub run_id: String,
    /// Cumulative accepted flow per edge
    pub augmentation: AugmentationMap,
    /// Number of rounds executed
    pub supersteps: usize,
    /// Per-round summaries
    pub history: Vec<RoundSummary>,
}

impl FlowResult {
    /// Net flow into the sink
    pub fn flow_value(&self) -> i64 {
        self.augmentation.net_flow_into(&VertexId::sink())
    }
}

/// Requests a run to stop at the next round boundary
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Request the abort
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if an abort was requested
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Orchestrator-owned state carried across rounds
struct RunState {
    superstep: usize,
    augmentation: AugmentationMap,
    convergence: ConvergenceState,
    history: Vec<RoundSummary>,
}

/// Output of one executed round
struct RoundOutcome {
    next: RoundInput,
    source_paths: usize,
    accepted_paths: usize,
    map_stats: MapStats,
}

/// Pregel runtime for the augmenting-path search
///
/// Drives rounds over the records held in a [`VertexStore`] until the kept
/// source-path count stays unchanged for a full convergence window.
pub struct PregelRuntime {
    /// Configuration for the runtime
    config: PregelConfig,
    /// Round hand-off
    store: Arc<dyn VertexStore>,
    /// Optional checkpoint backend
    checkpointer: Option<Arc<dyn Checkpointer>>,
    /// Unique identifier for this run (used for checkpointing)
    run_id: String,
    abort: AbortHandle,
}

impl PregelRuntime {
    /// Create a runtime with default configuration
    pub fn new(store: Arc<dyn VertexStore>) -> Self {
        Self {
            config: PregelConfig::default(),
            store,
            checkpointer: None,
            run_id: uuid::Uuid::new_v4().to_string(),
            abort: AbortHandle::default(),
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: PregelConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the run ID
    ///
    /// Checkpoints are only restored into a runtime with the same run ID.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Attach a checkpointer
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Get the run ID
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the configuration
    pub fn config(&self) -> &PregelConfig {
        &self.config
    }

    /// Handle that stops the run at the next round boundary
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Run from materialized initial records until convergence
    ///
    /// Fails with `MissingEndpoint` before any round if `s` or `t` has no record.
    pub async fn run(&self, input: RoundInput) -> Result<FlowResult, PregelError> {
        for endpoint in [VertexId::source(), VertexId::sink()] {
            if !input.contains(&endpoint) {
                return Err(PregelError::missing_endpoint(endpoint));
            }
        }
        if let Some(reserved) = input.records.keys().find(|id| id.is_reserved_key()) {
            return Err(PregelError::config_error(format!(
                "{reserved} is reserved and cannot be a vertex id"
            )));
        }

        tracing::info!(
            run_id = %self.run_id,
            vertices = input.vertex_count(),
            "Starting max-flow run"
        );
        self.store.write_round(&input).await?;

        let state = RunState {
            superstep: 0,
            augmentation: AugmentationMap::new(),
            convergence: ConvergenceState::new(self.config.convergence_window),
            history: Vec::new(),
        };
        self.drive(state).await
    }

    /// Resume from the latest checkpoint
    ///
    /// Returns `None` if there is no checkpoint to resume from.
    pub async fn resume(&self) -> Result<Option<FlowResult>, PregelError> {
        let checkpointer = self
            .checkpointer
            .as_ref()
            .ok_or_else(|| PregelError::checkpoint_error("No checkpointer configured"))?;
        let Some(checkpoint) = checkpointer.latest().await? else {
            return Ok(None);
        };
        if checkpoint.run_id != self.run_id {
            return Err(PregelError::checkpoint_mismatch(
                &self.run_id,
                &checkpoint.run_id,
            ));
        }

        tracing::info!(
            run_id = %checkpoint.run_id,
            superstep = checkpoint.superstep,
            "Restored from checkpoint"
        );
        self.store.write_round(&checkpoint.input).await?;

        let state = RunState {
            superstep: checkpoint.superstep,
            augmentation: checkpoint.augmentation,
            convergence: checkpoint.convergence,
            history: checkpoint.history,
        };
        self.drive(state).await.map(Some)
    }

    async fn drive(&self, mut state: RunState) -> Result<FlowResult, PregelError> {
        let started = Instant::now();
        loop {
            if self.abort.is_aborted() {
                tracing::warn!(superstep = state.superstep, "Run aborted between rounds");
                return Err(PregelError::Aborted {
                    superstep: state.superstep,
                    partial: Box::new(state.augmentation),
                });
            }
            if started.elapsed() >= self.config.workflow_timeout {
                tracing::warn!(
                    superstep = state.superstep,
                    timeout = ?self.config.workflow_timeout,
                    "Run timed out between rounds"
                );
                return Err(PregelError::WorkflowTimeout(self.config.workflow_timeout));
            }
            if state.superstep >= self.config.max_supersteps {
                return Err(PregelError::MaxSuperstepsExceeded(state.superstep));
            }

            let input = self.store.read_round().await?;
            let outcome = self.execute_superstep(state.superstep, input).await?;

            let delta = &outcome.next.delta;
            state.augmentation = state.augmentation.apply(delta);
            let phase = state.convergence.observe(outcome.source_paths);
            let summary = RoundSummary {
                superstep: state.superstep,
                source_paths: outcome.source_paths,
                accepted_paths: outcome.accepted_paths,
                accepted_flow: delta.net_flow_into(&VertexId::sink()),
                countdown: state.convergence.countdown(),
            };
            if self.config.tracing_enabled {
                tracing::info!(
                    superstep = summary.superstep,
                    source_paths = summary.source_paths,
                    accepted_paths = summary.accepted_paths,
                    accepted_flow = summary.accepted_flow,
                    countdown = summary.countdown,
                    "Superstep complete"
                );
                tracing::debug!(
                    saturated = outcome.map_stats.saturated,
                    pruned = outcome.map_stats.pruned,
                    candidates = outcome.map_stats.candidates,
                    extensions = outcome.map_stats.extensions,
                    "Map phase"
                );
            }
            state.history.push(summary);
            state.superstep += 1;

            self.store.write_round(&outcome.next).await?;
            if self.config.should_checkpoint(state.superstep) {
                self.save_checkpoint(&state, outcome.next).await?;
            }

            if phase == ConvergencePhase::Converged {
                tracing::info!(
                    run_id = %self.run_id,
                    supersteps = state.superstep,
                    flow = state.augmentation.net_flow_into(&VertexId::sink()),
                    "Converged"
                );
                return Ok(FlowResult {
                    run_id: self.run_id.clone(),
                    augmentation: state.augmentation,
                    supersteps: state.superstep,
                    history: state.history,
                });
            }
        }
    }

    /// Execute a single round over `input`
    async fn execute_superstep(
        &self,
        superstep: usize,
        input: RoundInput,
    ) -> Result<RoundOutcome, PregelError> {
        // 1. Map every vertex against the previous round's delta
        let delta = Arc::new(input.delta);
        let mapped = self
            .for_each_vertex("map", input.records, move |id, record| {
                let mut ctx = ComputeContext::new(superstep, &delta);
                let stats = VertexProgram::new(id, record).compute(&mut ctx);
                (stats, ctx.into_outbox())
            })
            .await?;

        // 2. Shuffle by target key, in sender order
        let mut map_stats = MapStats::default();
        let mut inboxes: BTreeMap<VertexId, Vec<FlowMessage>> = BTreeMap::new();
        for (stats, outbox) in mapped {
            map_stats.saturated += stats.saturated;
            map_stats.pruned += stats.pruned;
            map_stats.candidates += stats.candidates;
            map_stats.extensions += stats.extensions;
            for (target, messages) in outbox {
                inboxes.entry(target).or_default().extend(messages);
            }
        }

        // 3. Reduce every key
        let max_paths = self.config.max_paths;
        let order = self.config.candidate_order;
        let reduced = self
            .for_each_vertex("reduce", inboxes, move |key, messages| {
                let output = ReducerProgram::new(key.clone(), max_paths, order).reduce(messages);
                (key, output)
            })
            .await?;

        // 4. Collect the next round's records and the sink's accepted map
        let mut outcome = RoundOutcome {
            next: RoundInput::default(),
            source_paths: 0,
            accepted_paths: 0,
            map_stats,
        };
        for (key, output) in reduced {
            outcome.source_paths += output.kept_source_paths;
            if let Some(accepted) = output.accepted {
                outcome.next.delta = accepted;
                outcome.accepted_paths = output.accepted_paths;
            }
            outcome.next.records.insert(key, output.record);
        }
        Ok(outcome)
    }

    /// Run `work` once per vertex as bounded parallel tasks
    ///
    /// Results come back in input order. A failed task fails the round.
    async fn for_each_vertex<W, T, F>(
        &self,
        phase: &'static str,
        items: impl IntoIterator<Item = (VertexId, W)>,
        work: F,
    ) -> Result<Vec<T>, PregelError>
    where
        W: Send + 'static,
        T: Send + 'static,
        F: Fn(VertexId, W) -> T + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism));
        let work = Arc::new(work);
        let mut handles = Vec::new();

        for (id, item) in items {
            let semaphore = Arc::clone(&semaphore);
            let work = Arc::clone(&work);
            let task_id = id.clone();
            let handle = tokio::spawn(async move {
                // Acquire semaphore permit for parallelism control
                let _permit = semaphore.acquire_owned().await.map_err(|e| {
                    PregelError::vertex_error_with_source(task_id.clone(), "semaphore closed", e)
                })?;
                Ok::<T, PregelError>((*work)(task_id, item))
            });
            handles.push((id, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let result = handle.await.map_err(|e| {
                PregelError::vertex_error_with_source(id, format!("{phase} task failed"), e)
            })??;
            results.push(result);
        }
        Ok(results)
    }

    async fn save_checkpoint(&self, state: &RunState, next: RoundInput) -> Result<(), PregelError> {
        let Some(checkpointer) = &self.checkpointer else {
            return Ok(());
        };
        let checkpoint = Checkpoint::new(
            &self.run_id,
            state.superstep,
            next,
            state.augmentation.clone(),
            state.convergence.clone(),
        )
        .with_history(state.history.clone());
        checkpointer.save(&checkpoint).await?;
        tracing::info!(
            run_id = %self.run_id,
            superstep = state.superstep,
            "Checkpoint saved"
        );

        if self.config.keep_checkpoints > 0 {
            let pruned = checkpointer.prune(self.config.keep_checkpoints).await?;
            if pruned > 0 {
                tracing::debug!(pruned, keep = self.config.keep_checkpoints, "Old checkpoints pruned");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Edge, EdgeId};
    use crate::graph::FlowNetwork;
    use crate::pregel::checkpoint::MemoryCheckpointer;
    use crate::pregel::store::MemoryStore;
    use crate::pregel::VertexRecord;
    use tokio::time::Duration;

    /// Initial records for a graph given as `(from, to, capacity)` triples
    fn materialize(edges: &[(&str, &str, i64)]) -> RoundInput {
        let mut network = FlowNetwork::new();
        for &(from, to, capacity) in edges {
            network.add_edge(from, to, capacity).unwrap();
        }
        network.materialize().unwrap()
    }

    fn diamond() -> RoundInput {
        materialize(&[("s", "a", 10), ("s", "b", 5), ("a", "t", 5), ("b", "t", 10)])
    }

    fn runtime() -> PregelRuntime {
        PregelRuntime::new(Arc::new(MemoryStore::new()))
            .with_config(PregelConfig::default().with_parallelism(4).with_tracing(false))
    }

    #[tokio::test]
    async fn test_runtime_creation() {
        let runtime = runtime().with_run_id("run-1");
        assert_eq!(runtime.run_id(), "run-1");
        assert_eq!(runtime.config().parallelism, 4);
        assert!(!runtime.abort_handle().is_aborted());
    }

    #[tokio::test]
    async fn test_diamond_max_flow() {
        let result = runtime().run(diamond()).await.unwrap();

        assert_eq!(result.flow_value(), 10);
        assert_eq!(result.augmentation.get(&EdgeId::between("s", "a")), 5);
        assert_eq!(result.augmentation.get(&EdgeId::between("s", "b")), 5);
        assert_eq!(result.history[0].accepted_flow, 10);
        assert_eq!(result.history[0].accepted_paths, 2);
        // Two changes in the kept count, then a full window unchanged
        assert_eq!(result.supersteps, 7);
        assert_eq!(result.history.last().unwrap().countdown, 0);
    }

    #[tokio::test]
    async fn test_direct_edge_found_in_first_round() {
        let result = runtime()
            .run(materialize(&[("s", "t", 7)]))
            .await
            .unwrap();

        assert_eq!(result.flow_value(), 7);
        assert_eq!(
            result.augmentation,
            [(EdgeId::between("s", "t"), 7)].into_iter().collect()
        );
        assert_eq!(result.history[0].accepted_flow, 7);
        assert!(result.history[1..].iter().all(|round| round.accepted_flow == 0));
        assert_eq!(result.supersteps, 6);
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails_before_any_round() {
        let mut records = BTreeMap::new();
        records.insert(
            VertexId::source(),
            VertexRecord::with_edges(vec![Edge::new("s", "a", 3)]),
        );
        records.insert(VertexId::new("a"), VertexRecord::default());

        let store = Arc::new(MemoryStore::new());
        let err = PregelRuntime::new(store.clone())
            .run(RoundInput::new(records))
            .await
            .unwrap_err();
        assert!(matches!(err, PregelError::MissingEndpoint(ref id) if id.is_sink()));
        // Nothing was handed to the store
        assert!(store.read_round().await.is_err());
    }

    #[tokio::test]
    async fn test_reserved_key_rejected() {
        let mut input = diamond();
        input.records.insert(VertexId::new("A_p"), VertexRecord::default());
        let err = runtime().run(input).await.unwrap_err();
        assert!(matches!(err, PregelError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_max_supersteps_exceeded() {
        let runtime = PregelRuntime::new(Arc::new(MemoryStore::new()))
            .with_config(PregelConfig::default().with_max_supersteps(3));
        let err = runtime.run(diamond()).await.unwrap_err();
        assert!(matches!(err, PregelError::MaxSuperstepsExceeded(3)));
    }

    #[tokio::test]
    async fn test_abort_between_rounds() {
        let runtime = runtime();
        runtime.abort_handle().abort();

        let err = runtime.run(diamond()).await.unwrap_err();
        match err {
            PregelError::Aborted { superstep, partial } => {
                assert_eq!(superstep, 0);
                assert!(partial.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_workflow_timeout_enforced() {
        let runtime = PregelRuntime::new(Arc::new(MemoryStore::new())).with_config(
            PregelConfig::default()
                .with_workflow_timeout(Duration::ZERO)
                .with_tracing(false),
        );
        let err = runtime.run(diamond()).await.unwrap_err();
        assert!(matches!(err, PregelError::WorkflowTimeout(d) if d.is_zero()));
    }

    #[tokio::test]
    async fn test_workflow_timeout_leaves_generous_runs_alone() {
        let runtime = PregelRuntime::new(Arc::new(MemoryStore::new())).with_config(
            PregelConfig::default()
                .with_workflow_timeout(Duration::from_secs(60))
                .with_tracing(false),
        );
        assert_eq!(runtime.run(diamond()).await.unwrap().flow_value(), 10);
    }

    #[tokio::test]
    async fn test_window_of_one_stops_early() {
        let runtime = PregelRuntime::new(Arc::new(MemoryStore::new())).with_config(
            PregelConfig::default()
                .with_convergence_window(1)
                .with_tracing(false),
        );
        let result = runtime.run(diamond()).await.unwrap();
        // 2, 1, 1: the first repeat stops the run
        assert_eq!(result.supersteps, 3);
        assert_eq!(result.flow_value(), 10);
    }

    #[tokio::test]
    async fn test_checkpoint_and_resume() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let config = PregelConfig::default()
            .with_checkpoint_interval(2)
            .with_tracing(false);

        let first = PregelRuntime::new(Arc::new(MemoryStore::new()))
            .with_config(config.clone())
            .with_run_id("diamond")
            .with_checkpointer(checkpointer.clone());
        let full = first.run(diamond()).await.unwrap();
        assert_eq!(checkpointer.list().await.unwrap(), vec![2, 4, 6]);

        let second = PregelRuntime::new(Arc::new(MemoryStore::new()))
            .with_config(config)
            .with_run_id("diamond")
            .with_checkpointer(checkpointer.clone());
        let resumed = second.resume().await.unwrap().unwrap();

        assert_eq!(resumed.supersteps, full.supersteps);
        assert_eq!(resumed.augmentation, full.augmentation);
        assert_eq!(resumed.history, full.history);
    }

    #[tokio::test]
    async fn test_keep_checkpoints_prunes_older_rounds() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let result = PregelRuntime::new(Arc::new(MemoryStore::new()))
            .with_config(
                PregelConfig::default()
                    .with_checkpoint_interval(1)
                    .with_keep_checkpoints(2)
                    .with_tracing(false),
            )
            .with_checkpointer(checkpointer.clone())
            .run(diamond())
            .await
            .unwrap();

        assert_eq!(result.supersteps, 7);
        assert_eq!(checkpointer.list().await.unwrap(), vec![6, 7]);
    }

    #[tokio::test]
    async fn test_resume_rejects_other_run() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let config = PregelConfig::default()
            .with_checkpoint_interval(1)
            .with_tracing(false);
        PregelRuntime::new(Arc::new(MemoryStore::new()))
            .with_config(config.clone())
            .with_run_id("original")
            .with_checkpointer(checkpointer.clone())
            .run(diamond())
            .await
            .unwrap();

        let err = PregelRuntime::new(Arc::new(MemoryStore::new()))
            .with_config(config)
            .with_run_id("other")
            .with_checkpointer(checkpointer)
            .resume()
            .await
            .unwrap_err();
        assert!(matches!(err, PregelError::CheckpointMismatch { .. }));
    }

    #[tokio::test]
    async fn test_resume_without_checkpoint() {
        let resumable = runtime().with_checkpointer(Arc::new(MemoryCheckpointer::new()));
        assert!(resumable.resume().await.unwrap().is_none());

        let err = runtime().resume().await.unwrap_err();
        assert!(matches!(err, PregelError::CheckpointError(_)));
    }
}
