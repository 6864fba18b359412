//! Arithmetic and comparison sugar on [`Var`]. Every operator here only dispatches
//! to the functions in [`crate::op`].

use std::{
    cmp::Ordering,
    ops::{Add, Div, Mul, Neg, Sub},
};

use approx::relative_eq;

use crate::{error::GradError, op, operand::Operand, var::Var};

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $func:path, $output:ty) => {
        impl $trait<&Var> for &Var {
            type Output = $output;
            fn $method(self, rhs: &Var) -> Self::Output {
                $func(self, rhs)
            }
        }

        impl $trait<Var> for &Var {
            type Output = $output;
            fn $method(self, rhs: Var) -> Self::Output {
                $func(self, rhs)
            }
        }

        impl $trait<&Var> for Var {
            type Output = $output;
            fn $method(self, rhs: &Var) -> Self::Output {
                $func(self, rhs)
            }
        }

        impl $trait<Var> for Var {
            type Output = $output;
            fn $method(self, rhs: Var) -> Self::Output {
                $func(self, rhs)
            }
        }

        impl $trait<f64> for &Var {
            type Output = $output;
            fn $method(self, rhs: f64) -> Self::Output {
                $func(self, rhs)
            }
        }

        impl $trait<f64> for Var {
            type Output = $output;
            fn $method(self, rhs: f64) -> Self::Output {
                $func(self, rhs)
            }
        }

        // Reflected forms keep the constant in the left operand position
        impl $trait<&Var> for f64 {
            type Output = $output;
            fn $method(self, rhs: &Var) -> Self::Output {
                $func(self, rhs)
            }
        }

        impl $trait<Var> for f64 {
            type Output = $output;
            fn $method(self, rhs: Var) -> Self::Output {
                $func(self, rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, op::add, Var);
impl_binary_op!(Sub, sub, op::sub, Var);
impl_binary_op!(Mul, mul, op::mul, Var);
impl_binary_op!(Div, div, op::div, Result<Var, GradError>);

impl Neg for &Var {
    type Output = Var;
    fn neg(self) -> Self::Output {
        op::neg(self)
    }
}

impl Neg for Var {
    type Output = Var;
    fn neg(self) -> Self::Output {
        op::neg(self)
    }
}

impl Var {
    pub fn pow(&self, p: impl Into<Operand>) -> Result<Var, GradError> {
        op::pow(self, p)
    }

    /// `pow` with an optional modulus. Any modulus is an error.
    pub fn pow_mod(&self, p: impl Into<Operand>, modulus: Option<f64>) -> Result<Var, GradError> {
        op::pow_mod(self, p, modulus)
    }

    pub fn recip(&self) -> Result<Var, GradError> {
        op::reciprocal(self)
    }
}

fn is_close(lhs: f64, rhs: f64) -> bool {
    relative_eq!(lhs, rhs, epsilon = 0., max_relative = 1e-9)
}

/// Values are compared, not identities. Use [`Var::ptr_eq`] for the latter.
/// Equality tolerates rounding, ordering does not.
impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        is_close(self.value(), other.value())
    }
}

impl PartialEq<f64> for Var {
    fn eq(&self, other: &f64) -> bool {
        is_close(self.value(), *other)
    }
}

impl PartialEq<Var> for f64 {
    fn eq(&self, other: &Var) -> bool {
        is_close(*self, other.value())
    }
}

impl PartialOrd for Var {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value().partial_cmp(&other.value())
    }
}

impl PartialOrd<f64> for Var {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        PartialOrd::<f64>::partial_cmp(&self.value(), other)
    }
}

impl PartialOrd<Var> for f64 {
    fn partial_cmp(&self, other: &Var) -> Option<Ordering> {
        PartialOrd::<f64>::partial_cmp(self, &other.value())
    }
}
