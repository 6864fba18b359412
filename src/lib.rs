//! Reverse-mode differentiation of scalar expressions.
//!
//! Each [`Var`] remembers the operator and operands it was built from. Calling
//! [`Var::backprop`] on an output first marks every node it depends on, counting
//! one pending delivery per edge, and then lets gradients flow from the output to
//! the leaves. A node shared by several consumers fires only after all of them
//! have delivered, so its gradient is the full sum.
//!
//! ```
//! use depgrad::Var;
//!
//! let x1 = Var::named("x1", 1.);
//! let x2 = Var::named("x2", 2.);
//! let x3 = Var::named("x3", 3.);
//! let y1 = &x1 * &x2;
//! let y2 = &x2 + &x3;
//! let y3 = (&y1 / &y2).unwrap();
//! y3.backprop().unwrap();
//! assert!((x2.grad().unwrap() - 0.12).abs() < 1e-12);
//! ```

mod engine;
pub mod error;
pub mod op;
mod operand;
mod ops;
mod var;

pub use error::GradError;
pub use op::Operator;
pub use operand::Operand;
pub use var::Var;
