//! Controllers bound to the sub-state of the selected configuration
//!
//! Each controller holds a [`SubStateHandle`] that the registry's
//! `config_switched` event re-points, and publishes its own change event.

pub mod parameters;
pub mod stopwords;
pub mod synonyms;
pub mod topic_runner;

pub use parameters::ParameterController;
pub use stopwords::StopwordController;
pub use synonyms::SynonymController;
pub use topic_runner::{
    RunnerChangeReason, RunnerChanged, TopicRunnerController, TrainingOutcome, TrainingStatus,
};

use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::Shared;

/// Re-pointable reference to one piece of configuration sub-state
///
/// The outer lock only guards which `Shared<T>` is current; it is released
/// before the sub-state itself is locked.
#[derive(Debug)]
pub struct SubStateHandle<T> {
    current: RwLock<Shared<T>>,
}

impl<T> SubStateHandle<T> {
    pub fn new(initial: Shared<T>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Point at another configuration's sub-state
    pub fn rebind(&self, next: Shared<T>) {
        *self.current.write() = next;
    }

    /// The sub-state currently pointed at
    pub fn handle(&self) -> Shared<T> {
        self.current.read().clone()
    }

    pub fn is_bound_to(&self, other: &Shared<T>) -> bool {
        Arc::ptr_eq(&*self.current.read(), other)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let handle = self.handle();
        let guard = handle.read();
        f(&guard)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let handle = self.handle();
        let mut guard = handle.write();
        f(&mut guard)
    }
}

impl<T: Clone> SubStateHandle<T> {
    /// Owned copy of the current sub-state
    pub fn snapshot(&self) -> T {
        self.read(T::clone)
    }
}
