use tracing::debug;

use crate::{
    controller::SubStateHandle,
    event::EventChannel,
    model::{Algorithm, Configuration, ModelParameters},
};

/// Edits the algorithm choice and hyperparameters of the selected configuration
#[derive(Debug)]
pub struct ParameterController {
    parameters: SubStateHandle<ModelParameters>,
    changed: EventChannel<ModelParameters>,
}

impl ParameterController {
    pub fn new(config: &Configuration) -> Self {
        Self {
            parameters: SubStateHandle::new(config.parameters.clone()),
            changed: EventChannel::new(),
        }
    }

    /// Published with the new values after every bind or edit
    pub fn changed(&self) -> &EventChannel<ModelParameters> {
        &self.changed
    }

    pub fn bind(&self, config: &Configuration) {
        self.parameters.rebind(config.parameters.clone());
        self.changed.publish(&self.parameters.snapshot());
    }

    pub fn is_bound_to(&self, config: &Configuration) -> bool {
        self.parameters.is_bound_to(&config.parameters)
    }

    pub fn parameters(&self) -> ModelParameters {
        self.parameters.snapshot()
    }

    /// Replace all values at once
    /// Out-of-range values are reported and nothing changes.
    pub fn apply(&self, parameters: ModelParameters) -> Result<(), Vec<String>> {
        let problems = parameters.validate();
        if !problems.is_empty() {
            debug!(?problems, "parameters rejected");
            return Err(problems);
        }
        self.parameters.update(|p| *p = parameters.clone());
        self.changed.publish(&parameters);
        Ok(())
    }

    pub fn set_algorithm(&self, algorithm: Algorithm) -> Result<(), Vec<String>> {
        let mut next = self.parameters();
        next.algorithm = algorithm;
        self.apply(next)
    }

    pub fn set_topic_count(&self, topic_count: usize) -> Result<(), Vec<String>> {
        let mut next = self.parameters();
        next.topic_count = topic_count;
        self.apply(next)
    }

    pub fn set_iterations(&self, iterations: usize) -> Result<(), Vec<String>> {
        let mut next = self.parameters();
        next.iterations = iterations;
        self.apply(next)
    }

    pub fn set_priors(&self, alpha: f64, beta: f64) -> Result<(), Vec<String>> {
        let mut next = self.parameters();
        next.alpha = alpha;
        next.beta = beta;
        self.apply(next)
    }
}
