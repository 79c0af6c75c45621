use std::sync::{
    mpsc::{self, Receiver, TryRecvError},
    Arc,
};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    controller::SubStateHandle,
    corpus::CorpusVersionTracker,
    error::TrainError,
    event::EventChannel,
    model::{Algorithm, Configuration, Registry, Shared, TopicModel, TopicModelSlot},
    runner::{training::{self, TrainingInput}, AnalysisRunner},
};

/// Why the active runner changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerChangeReason {
    /// Another configuration was selected
    Switched,
    /// A training run was committed for the selected configuration
    Trained,
    /// The selected configuration's model went stale and was dropped
    Discarded,
}

/// Payload of [`TopicRunnerController::runner_changed`]
#[derive(Debug, Clone)]
pub struct RunnerChanged {
    pub config: String,
    pub reason: RunnerChangeReason,
    pub slot: Shared<TopicModelSlot>,
}

impl RunnerChanged {
    /// Algorithm of the now active runner, if any
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.slot.read().runner().map(AnalysisRunner::kind)
    }
}

/// How a finished training run was handled
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingStatus {
    Installed { algorithm: Algorithm, corpus_version: u64 },
    /// The corpus was re-imported while training ran
    Superseded { trained_on: u64, live: u64 },
    /// The configuration was deleted or replaced while training ran
    Orphaned,
    Failed(TrainError),
}

/// Payload of [`TopicRunnerController::trained`]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub config: String,
    pub status: TrainingStatus,
}

impl TrainingOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self.status, TrainingStatus::Installed { .. })
    }
}

struct PendingTraining {
    config: String,
    slot: Shared<TopicModelSlot>,
    receiver: Receiver<Result<TopicModel, TrainError>>,
}

/// Owns the trained-result lifecycle of the selected configuration
///
/// Training runs on the rayon pool; finished runs are committed only by
/// [`TopicRunnerController::poll`] or [`TopicRunnerController::wait`], on
/// the caller's thread. At most one run per configuration is in flight.
pub struct TopicRunnerController {
    slot: SubStateHandle<TopicModelSlot>,
    config: RwLock<String>,
    tracker: CorpusVersionTracker,
    pending: Mutex<Vec<PendingTraining>>,
    runner_changed: EventChannel<RunnerChanged>,
    trained: EventChannel<TrainingOutcome>,
}

impl TopicRunnerController {
    pub fn new(config: &Configuration, tracker: CorpusVersionTracker) -> Self {
        Self {
            slot: SubStateHandle::new(config.topic_model.clone()),
            config: RwLock::new(config.name().to_string()),
            tracker,
            pending: Mutex::new(Vec::new()),
            runner_changed: EventChannel::new(),
            trained: EventChannel::new(),
        }
    }

    /// Published whenever the active runner may differ from before
    pub fn runner_changed(&self) -> &EventChannel<RunnerChanged> {
        &self.runner_changed
    }

    /// Published once per finished training run, after it was committed
    pub fn trained(&self) -> &EventChannel<TrainingOutcome> {
        &self.trained
    }

    /// Re-point to `config`, dropping a stale model before anyone is told
    pub fn bind(&self, config: &Configuration) {
        self.slot.rebind(config.topic_model.clone());
        *self.config.write() = config.name().to_string();
        let live = self.tracker.current();
        self.slot.update(|slot| slot.discard_if_stale(live));
        self.publish(RunnerChangeReason::Switched);
    }

    pub fn is_bound_to(&self, config: &Configuration) -> bool {
        self.slot.is_bound_to(&config.topic_model)
    }

    pub fn config_name(&self) -> String {
        self.config.read().clone()
    }

    pub fn slot(&self) -> Shared<TopicModelSlot> {
        self.slot.handle()
    }

    pub fn has_runner(&self) -> bool {
        self.slot.read(TopicModelSlot::is_present)
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        self.slot.read(|s| s.runner().map(AnalysisRunner::kind))
    }

    /// Run `f` against the active runner
    pub fn with_runner<R>(&self, f: impl FnOnce(Option<&AnalysisRunner>) -> R) -> R {
        self.slot.read(|s| f(s.runner()))
    }

    /// Re-check the active model against the live corpus version
    /// Publishes `runner_changed` only when something was discarded.
    pub fn discard_if_stale(&self) -> bool {
        let live = self.tracker.current();
        let discarded = self.slot.update(|slot| slot.discard_if_stale(live));
        if discarded {
            self.publish(RunnerChangeReason::Discarded);
        }
        discarded
    }

    pub fn is_training(&self, config: &str) -> bool {
        self.pending.lock().iter().any(|p| p.config == config)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Start training `config` in the background
    /// Rejected while a run for the same configuration is still pending.
    pub fn start(&self, config: &Configuration, input: TrainingInput) -> Result<(), TrainError> {
        let mut pending = self.pending.lock();
        if pending.iter().any(|p| p.config == config.name()) {
            warn!(config = config.name(), "training request rejected, run in flight");
            return Err(TrainError::AlreadyRunning {
                config: config.name().to_string(),
            });
        }
        let (sender, receiver) = mpsc::channel();
        info!(
            config = config.name(),
            algorithm = %input.parameters.algorithm,
            corpus_version = input.corpus_version,
            "training started"
        );
        rayon::spawn(move || {
            // receiver may be gone if the controller was dropped
            let _ = sender.send(training::train(input));
        });
        pending.push(PendingTraining {
            config: config.name().to_string(),
            slot: config.topic_model.clone(),
            receiver,
        });
        Ok(())
    }

    /// Commit every run that has finished, without blocking
    pub fn poll(&self, registry: &Registry) -> Vec<TrainingOutcome> {
        let finished = {
            let mut pending = self.pending.lock();
            let mut finished = Vec::new();
            let mut index = 0;
            while index < pending.len() {
                let received = pending[index].receiver.try_recv();
                match received {
                    Ok(result) => finished.push((pending.remove(index), result)),
                    Err(TryRecvError::Disconnected) => finished.push((
                        pending.remove(index),
                        Err(TrainError::WorkerDisconnected),
                    )),
                    Err(TryRecvError::Empty) => index += 1,
                }
            }
            finished
        };
        finished
            .into_iter()
            .map(|(run, result)| self.commit(registry, run, result))
            .collect()
    }

    /// Block until every pending run has finished and commit them
    pub fn wait(&self, registry: &Registry) -> Vec<TrainingOutcome> {
        let runs = std::mem::take(&mut *self.pending.lock());
        runs.into_iter()
            .map(|run| {
                let result = run
                    .receiver
                    .recv()
                    .unwrap_or(Err(TrainError::WorkerDisconnected));
                self.commit(registry, run, result)
            })
            .collect()
    }

    fn commit(
        &self,
        registry: &Registry,
        run: PendingTraining,
        result: Result<TopicModel, TrainError>,
    ) -> TrainingOutcome {
        let registered = registry
            .get(&run.config)
            .map_or(false, |c| Arc::ptr_eq(&c.topic_model, &run.slot));
        let status = match result {
            Err(err) => {
                warn!(config = %run.config, error = %err, "training failed");
                TrainingStatus::Failed(err)
            }
            Ok(_) if !registered => {
                debug!(config = %run.config, "training result dropped, configuration is gone");
                TrainingStatus::Orphaned
            }
            Ok(model) if model.used_corpus_version_id() != self.tracker.current() => {
                let status = TrainingStatus::Superseded {
                    trained_on: model.used_corpus_version_id(),
                    live: self.tracker.current(),
                };
                info!(config = %run.config, ?status, "training result dropped, corpus changed");
                status
            }
            Ok(model) => {
                let status = TrainingStatus::Installed {
                    algorithm: model.runner().kind(),
                    corpus_version: model.used_corpus_version_id(),
                };
                run.slot.write().install(model);
                info!(config = %run.config, "topic model installed");
                status
            }
        };
        let outcome = TrainingOutcome {
            config: run.config,
            status,
        };
        if outcome.is_installed() && self.slot.is_bound_to(&run.slot) {
            self.publish(RunnerChangeReason::Trained);
        }
        self.trained.publish(&outcome);
        outcome
    }

    fn publish(&self, reason: RunnerChangeReason) {
        let event = RunnerChanged {
            config: self.config_name(),
            reason,
            slot: self.slot.handle(),
        };
        self.runner_changed.publish(&event);
    }
}

impl std::fmt::Debug for TopicRunnerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRunnerController")
            .field("config", &self.config_name())
            .field("has_runner", &self.has_runner())
            .field("pending", &self.pending_count())
            .finish()
    }
}
