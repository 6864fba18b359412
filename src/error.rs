use thiserror::Error;

/// Everything that can go wrong while building a graph or running a backward pass.
///
/// None of these are recoverable mid-pass. A failed `backprop` leaves no
/// gradients behind in the subgraph it touched.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GradError {
    #[error("Cannot reactivate when backward engine is working.")]
    EngineReactivated,
    #[error("Cannot accumulate gradient if engine is not alive.")]
    EngineNotLive,
    #[error("Cannot remove a dependency since engine has already no dependencies.")]
    DependencyUnderflow,

    #[error("division by zero")]
    DivideByZero,
    #[error("0 cannot be raised to a negative power")]
    ZeroToNegativePower,
    #[error("0 with a power < 1 is not differentiable")]
    NonDifferentiablePower,
    #[error("negative base raised to a variable power is not differentiable")]
    NegativeBaseExponentGradient,

    #[error("modulus is not supported by the power operator")]
    UnsupportedModulus,
    #[error("operator `{op}` returned {got} gradients for {expected} operands")]
    GradientCountMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("operator `{op}` returned no gradient for variable operand {index}")]
    MissingGradient { op: &'static str, index: usize },
    #[error("operator `{op}` expects {expected} operands, got {got}")]
    ArityMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },
}
