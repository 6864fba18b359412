//! Per-node bookkeeping for a backward pass.
//!
//! A `GradEngine` is a join barrier: it counts the consumer edges that still
//! owe this node a gradient and sums what has arrived so far. The owning node
//! fires once the count drops to zero.

use std::cell::Cell;

use crate::error::GradError;

#[derive(Default, Debug)]
pub(crate) struct GradEngine {
    num_dep: Cell<usize>,
    acc: Cell<Option<f64>>,
    working: Cell<bool>,
}

impl GradEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the idle state. Calling it on an idle engine is a no-op.
    pub fn reset(&self) {
        self.num_dep.set(0);
        self.acc.set(None);
        self.working.set(false);
    }

    pub fn activate(&self) -> Result<(), GradError> {
        if self.working.get() {
            return Err(GradError::EngineReactivated);
        }
        self.working.set(true);
        Ok(())
    }

    pub fn is_working(&self) -> bool {
        self.working.get()
    }

    pub fn accumulate(&self, grad: f64) -> Result<(), GradError> {
        if !self.working.get() {
            return Err(GradError::EngineNotLive);
        }
        self.acc.set(Some(self.acc.get().unwrap_or(0.) + grad));
        Ok(())
    }

    pub fn add_dependency(&self) {
        self.num_dep.set(self.num_dep.get() + 1);
    }

    pub fn remove_dependency(&self) -> Result<(), GradError> {
        let num_dep = self.num_dep.get();
        if num_dep == 0 {
            return Err(GradError::DependencyUnderflow);
        }
        self.num_dep.set(num_dep - 1);
        Ok(())
    }

    pub fn zero_dependency(&self) -> bool {
        self.num_dep.get() == 0
    }

    pub fn ready_backward(&self) -> bool {
        self.working.get() && self.zero_dependency()
    }

    /// Sum of the contributions received. A node touched by discovery that
    /// never got a contribution reports 0.
    pub fn take_grad(&self) -> f64 {
        self.acc.get().unwrap_or(0.)
    }
}

#[test]
fn test_engine_lifecycle() {
    let engine = GradEngine::new();
    assert!(!engine.is_working());
    assert!(!engine.ready_backward());

    engine.activate().unwrap();
    engine.add_dependency();
    engine.add_dependency();
    assert!(!engine.ready_backward());

    engine.accumulate(1.5).unwrap();
    engine.remove_dependency().unwrap();
    assert!(!engine.ready_backward());
    engine.accumulate(2.).unwrap();
    engine.remove_dependency().unwrap();
    assert!(engine.ready_backward());
    assert_eq!(engine.take_grad(), 3.5);

    engine.reset();
    assert!(!engine.is_working());
    assert!(engine.zero_dependency());
    assert_eq!(engine.take_grad(), 0.);
    engine.reset();
    assert!(!engine.is_working());
}

#[test]
fn test_engine_misuse() {
    let engine = GradEngine::new();
    assert_eq!(engine.accumulate(1.), Err(GradError::EngineNotLive));
    assert_eq!(engine.remove_dependency(), Err(GradError::DependencyUnderflow));

    engine.activate().unwrap();
    assert_eq!(engine.activate(), Err(GradError::EngineReactivated));
    assert_eq!(engine.remove_dependency(), Err(GradError::DependencyUnderflow));
}

#[test]
fn test_engine_untouched_grad() {
    let engine = GradEngine::new();
    engine.activate().unwrap();
    engine.add_dependency();
    engine.remove_dependency().unwrap();
    assert!(engine.ready_backward());
    assert_eq!(engine.take_grad(), 0.);
}
