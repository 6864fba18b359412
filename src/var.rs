use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    rc::Rc,
};

use log::{debug, trace};

use crate::{engine::GradEngine, error::GradError, op::Operator, operand::Operand};

#[derive(Debug)]
struct VarPayload {
    name: Option<String>,
    value: f64,
    /// `None` for leaves.
    op: Cell<Option<&'static dyn Operator>>,
    parents: RefCell<Vec<Operand>>,
    grad: Cell<Option<f64>>,
    engine: GradEngine,
}

/// A differentiable scalar together with the operator and operands that produced it.
///
/// `Var` is a cheap handle; cloning it shares the same node, so one node can be
/// an operand of many others. A backward pass visits a shared node once and sums
/// the gradients of all its consumers before going further.
#[derive(Clone, Debug)]
pub struct Var(Rc<VarPayload>);

impl Var {
    /// Creates a leaf, i.e. an independent variable.
    pub fn new(value: f64) -> Var {
        Self::new_payload(None, value, None, vec![])
    }

    pub fn named(name: impl Into<String>, value: f64) -> Var {
        Self::new_payload(Some(name.into()), value, None, vec![])
    }

    fn new_payload(
        name: Option<String>,
        value: f64,
        op: Option<&'static dyn Operator>,
        parents: Vec<Operand>,
    ) -> Var {
        Self(Rc::new(VarPayload {
            name,
            value,
            op: Cell::new(op),
            parents: RefCell::new(parents),
            grad: Cell::new(None),
            engine: GradEngine::new(),
        }))
    }

    /// Builds a node from `op` applied to `operands`, recording both for the
    /// backward pass. Fails if the operands are outside the operator's domain.
    pub fn apply(op: &'static dyn Operator, operands: Vec<Operand>) -> Result<Var, GradError> {
        if operands.len() != op.arity() {
            return Err(GradError::ArityMismatch {
                op: op.name(),
                expected: op.arity(),
                got: operands.len(),
            });
        }
        let values: Vec<_> = operands.iter().map(Operand::value).collect();
        op.check(&values)?;
        Ok(Self::build(op, operands, &values))
    }

    /// Same as `apply`, for operators that are defined everywhere.
    pub(crate) fn from_op(op: &'static dyn Operator, operands: Vec<Operand>) -> Var {
        debug_assert_eq!(operands.len(), op.arity());
        let values: Vec<_> = operands.iter().map(Operand::value).collect();
        Self::build(op, operands, &values)
    }

    fn build(op: &'static dyn Operator, operands: Vec<Operand>, values: &[f64]) -> Var {
        let value = op.compute(values);
        let name = Self::expr_name(op, &operands);
        Self::new_payload(name, value, Some(op), operands)
    }

    #[cfg(feature = "expr_name")]
    fn expr_name(op: &dyn Operator, operands: &[Operand]) -> Option<String> {
        let args: Vec<_> = operands.iter().map(Operand::label).collect();
        Some(op.format_name(&args))
    }

    #[cfg(not(feature = "expr_name"))]
    fn expr_name(_op: &dyn Operator, _operands: &[Operand]) -> Option<String> {
        None
    }

    pub fn value(&self) -> f64 {
        self.0.value
    }

    /// Gradient resolved by the last backward pass that reached this leaf.
    pub fn grad(&self) -> Option<f64> {
        self.0.grad.get()
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn op(&self) -> Option<&'static dyn Operator> {
        self.0.op.get()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.op.get().is_none()
    }

    pub fn operands(&self) -> Vec<Operand> {
        self.0.parents.borrow().clone()
    }

    /// Whether a backward pass is currently in flight through this node.
    pub fn is_live(&self) -> bool {
        self.0.engine.is_working()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    fn label(&self) -> &str {
        self.name().unwrap_or("_")
    }

    /// The entry point to backpropagation, seeded with a gradient of 1.
    pub fn backprop(&self) -> Result<(), GradError> {
        self.backprop_with(1.)
    }

    /// Propagates `seed` from this node to every node it depends on.
    ///
    /// On failure the pass is rolled back: every reachable engine is reset and
    /// every reachable gradient is cleared.
    pub fn backprop_with(&self, seed: f64) -> Result<(), GradError> {
        debug!("backprop from {} with seed {seed}", self.label());
        if let Err(e) = self.backprop_int(seed) {
            debug!("backprop from {} aborted: {e}", self.label());
            self.abort();
            return Err(e);
        }
        debug!("backprop from {} finished", self.label());
        Ok(())
    }

    fn backprop_int(&self, seed: f64) -> Result<(), GradError> {
        let engine = &self.0.engine;
        if !engine.is_working() {
            engine.activate()?;
            engine.accumulate(seed)?;
        }

        // Register one dependency per edge of the reachable subgraph
        for parent in self.0.parents.borrow().iter().filter_map(Operand::as_var) {
            parent.start_task()?;
        }

        self.propagate()
    }

    /// Called once per consumer edge. The first visit expands the operands,
    /// later ones only count the edge.
    fn start_task(&self) -> Result<(), GradError> {
        let engine = &self.0.engine;
        if engine.is_working() {
            engine.add_dependency();
            return Ok(());
        }

        trace!("discover {}", self.label());
        engine.activate()?;
        engine.add_dependency();
        for parent in self.0.parents.borrow().iter().filter_map(Operand::as_var) {
            parent.start_task()?;
        }
        Ok(())
    }

    /// Fires this node: all consumers have delivered, so hand the local
    /// gradients to the operands and go idle.
    fn propagate(&self) -> Result<(), GradError> {
        let grad = self.0.engine.take_grad();
        trace!("fire {} with grad {grad}", self.label());

        match self.0.op.get() {
            None => self.0.grad.set(Some(grad)),
            Some(op) => {
                let parents = self.0.parents.borrow();
                let grads = op.gradient(grad, self.0.value, &parents)?;
                if grads.len() != parents.len() {
                    return Err(GradError::GradientCountMismatch {
                        op: op.name(),
                        expected: parents.len(),
                        got: grads.len(),
                    });
                }
                // Every variable operand counted this edge in discovery, so it
                // must get a delivery or it never fires.
                for (index, (parent, grad)) in parents.iter().zip(grads).enumerate() {
                    let Some(parent) = parent.as_var() else {
                        continue;
                    };
                    let grad = grad.ok_or(GradError::MissingGradient {
                        op: op.name(),
                        index,
                    })?;
                    parent.receive(grad)?;
                }
            }
        }

        self.0.engine.reset();
        Ok(())
    }

    fn receive(&self, grad: f64) -> Result<(), GradError> {
        trace!("{} receives {grad}", self.label());
        let engine = &self.0.engine;
        engine.accumulate(grad)?;
        engine.remove_dependency()?;
        if engine.ready_backward() {
            self.propagate()?;
        }
        Ok(())
    }

    fn abort(&self) {
        let mut visited = HashSet::new();
        self.abort_rec(&mut visited);
    }

    fn abort_rec(&self, visited: &mut HashSet<usize>) {
        if !visited.insert(self.id()) {
            return;
        }
        self.0.engine.reset();
        self.0.grad.set(None);
        for parent in self.0.parents.borrow().iter().filter_map(Operand::as_var) {
            parent.abort_rec(visited);
        }
    }

    /// Cuts this node off from the operands that produced it. It becomes a
    /// leaf with no gradient.
    pub fn detach(&self) {
        self.0.parents.borrow_mut().clear();
        self.0.op.set(None);
        self.0.grad.set(None);
        self.0.engine.reset();
    }
}
