//! Forward/backward contracts of the elementary operators.
//!
//! Every operator implements [`Operator`]: `compute` gives the forward value from
//! operand values and `gradient` gives one local gradient per operand, in operand
//! order, or `None` for a constant operand.

use std::fmt::Debug;

use crate::{error::GradError, operand::Operand, var::Var};

/// A trait that represents an operation recorded in the graph.
pub trait Operator: Debug {
    fn name(&self) -> &'static str;

    /// Number of operands the operator takes.
    fn arity(&self) -> usize;

    /// Domain check run before `compute` when a node is built.
    fn check(&self, _inputs: &[f64]) -> Result<(), GradError> {
        Ok(())
    }

    fn compute(&self, inputs: &[f64]) -> f64;

    /// Local gradients with respect to each of `inputs`, given the upstream
    /// gradient `grad` and the value `output` this operator produced.
    fn gradient(
        &self,
        grad: f64,
        output: f64,
        inputs: &[Operand],
    ) -> Result<Vec<Option<f64>>, GradError>;

    /// Expression name for a node built from operands named `args`.
    fn format_name(&self, args: &[String]) -> String {
        format!("{}({})", self.name(), args.join(", "))
    }
}

/// Gradient for `input` if it is a variable. Constants never get one.
fn guard(input: &Operand, grad: impl FnOnce() -> f64) -> Option<f64> {
    input.is_var().then(grad)
}

#[derive(Debug, Clone, Copy)]
pub struct AddOp;

impl Operator for AddOp {
    fn name(&self) -> &'static str {
        "add"
    }
    fn arity(&self) -> usize {
        2
    }
    fn compute(&self, inputs: &[f64]) -> f64 {
        inputs[0] + inputs[1]
    }
    fn gradient(
        &self,
        grad: f64,
        _output: f64,
        inputs: &[Operand],
    ) -> Result<Vec<Option<f64>>, GradError> {
        Ok(inputs.iter().map(|x| guard(x, || grad)).collect())
    }
    fn format_name(&self, args: &[String]) -> String {
        format!("({} + {})", args[0], args[1])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SubOp;

impl Operator for SubOp {
    fn name(&self) -> &'static str {
        "sub"
    }
    fn arity(&self) -> usize {
        2
    }
    fn compute(&self, inputs: &[f64]) -> f64 {
        inputs[0] - inputs[1]
    }
    fn gradient(
        &self,
        grad: f64,
        _output: f64,
        inputs: &[Operand],
    ) -> Result<Vec<Option<f64>>, GradError> {
        Ok(vec![guard(&inputs[0], || grad), guard(&inputs[1], || -grad)])
    }
    fn format_name(&self, args: &[String]) -> String {
        format!("({} - {})", args[0], args[1])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MulOp;

impl Operator for MulOp {
    fn name(&self) -> &'static str {
        "mul"
    }
    fn arity(&self) -> usize {
        2
    }
    fn compute(&self, inputs: &[f64]) -> f64 {
        inputs[0] * inputs[1]
    }
    fn gradient(
        &self,
        grad: f64,
        _output: f64,
        inputs: &[Operand],
    ) -> Result<Vec<Option<f64>>, GradError> {
        let (x1, x2) = (inputs[0].value(), inputs[1].value());
        Ok(vec![
            guard(&inputs[0], || x2 * grad),
            guard(&inputs[1], || x1 * grad),
        ])
    }
    fn format_name(&self, args: &[String]) -> String {
        format!("{} * {}", args[0], args[1])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DivOp;

impl Operator for DivOp {
    fn name(&self) -> &'static str {
        "div"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check(&self, inputs: &[f64]) -> Result<(), GradError> {
        if inputs[1] == 0. {
            return Err(GradError::DivideByZero);
        }
        Ok(())
    }
    fn compute(&self, inputs: &[f64]) -> f64 {
        inputs[0] / inputs[1]
    }
    fn gradient(
        &self,
        grad: f64,
        _output: f64,
        inputs: &[Operand],
    ) -> Result<Vec<Option<f64>>, GradError> {
        let (x1, x2) = (inputs[0].value(), inputs[1].value());
        if x2 == 0. {
            return Err(GradError::DivideByZero);
        }
        Ok(vec![
            guard(&inputs[0], || grad / x2),
            guard(&inputs[1], || -x1 * grad / (x2 * x2)),
        ])
    }
    fn format_name(&self, args: &[String]) -> String {
        format!("{} / {}", args[0], args[1])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NegOp;

impl Operator for NegOp {
    fn name(&self) -> &'static str {
        "neg"
    }
    fn arity(&self) -> usize {
        1
    }
    fn compute(&self, inputs: &[f64]) -> f64 {
        -inputs[0]
    }
    fn gradient(
        &self,
        grad: f64,
        _output: f64,
        inputs: &[Operand],
    ) -> Result<Vec<Option<f64>>, GradError> {
        Ok(vec![guard(&inputs[0], || -grad)])
    }
    fn format_name(&self, args: &[String]) -> String {
        format!("-{}", args[0])
    }
}

/// `y = x^p`.
///
/// * dy/dx = p * x^(p - 1) = p * y / x, defined at x == 0 only for p >= 1 (where it is 0).
/// * dy/dp = y * ln(x), defined for x > 0. At x == 0 it is 0 for p > 0 and undefined for p <= 0.
#[derive(Debug, Clone, Copy)]
pub struct PowOp;

impl Operator for PowOp {
    fn name(&self) -> &'static str {
        "pow"
    }
    fn arity(&self) -> usize {
        2
    }
    fn check(&self, inputs: &[f64]) -> Result<(), GradError> {
        if inputs[0] == 0. && inputs[1] < 0. {
            return Err(GradError::ZeroToNegativePower);
        }
        Ok(())
    }
    fn compute(&self, inputs: &[f64]) -> f64 {
        inputs[0].powf(inputs[1])
    }
    fn gradient(
        &self,
        grad: f64,
        output: f64,
        inputs: &[Operand],
    ) -> Result<Vec<Option<f64>>, GradError> {
        let (x, p) = (inputs[0].value(), inputs[1].value());

        let x_grad = if inputs[0].is_var() {
            if x == 0. && p < 1. {
                return Err(GradError::NonDifferentiablePower);
            }
            Some(if x == 0. { 0. } else { grad * p * output / x })
        } else {
            None
        };

        let p_grad = if inputs[1].is_var() {
            if x < 0. {
                return Err(GradError::NegativeBaseExponentGradient);
            }
            // 0^p jumps from 1 to 0 at p == 0
            if x == 0. && p <= 0. {
                return Err(GradError::NonDifferentiablePower);
            }
            Some(if x == 0. { 0. } else { grad * output * x.ln() })
        } else {
            None
        };

        Ok(vec![x_grad, p_grad])
    }
    fn format_name(&self, args: &[String]) -> String {
        format!("{}^{}", args[0], args[1])
    }
}

pub fn add(x1: impl Into<Operand>, x2: impl Into<Operand>) -> Var {
    Var::from_op(&AddOp, vec![x1.into(), x2.into()])
}

pub fn sub(x1: impl Into<Operand>, x2: impl Into<Operand>) -> Var {
    Var::from_op(&SubOp, vec![x1.into(), x2.into()])
}

pub fn mul(x1: impl Into<Operand>, x2: impl Into<Operand>) -> Var {
    Var::from_op(&MulOp, vec![x1.into(), x2.into()])
}

pub fn neg(x: impl Into<Operand>) -> Var {
    Var::from_op(&NegOp, vec![x.into()])
}

pub fn div(x1: impl Into<Operand>, x2: impl Into<Operand>) -> Result<Var, GradError> {
    Var::apply(&DivOp, vec![x1.into(), x2.into()])
}

/// `1 / x`
pub fn reciprocal(x: impl Into<Operand>) -> Result<Var, GradError> {
    div(1., x)
}

pub fn pow(x: impl Into<Operand>, p: impl Into<Operand>) -> Result<Var, GradError> {
    Var::apply(&PowOp, vec![x.into(), p.into()])
}

/// Modular exponentiation is not supported; any modulus is rejected.
pub fn pow_mod(
    x: impl Into<Operand>,
    p: impl Into<Operand>,
    modulus: Option<f64>,
) -> Result<Var, GradError> {
    if modulus.is_some() {
        return Err(GradError::UnsupportedModulus);
    }
    pow(x, p)
}
