use crate::var::Var;

/// An input of an operator: either a node of the graph or a plain number.
///
/// Constants take part in the forward computation but never receive a gradient.
#[derive(Clone, Debug)]
pub enum Operand {
    Constant(f64),
    Var(Var),
}

impl Operand {
    pub fn value(&self) -> f64 {
        match self {
            Self::Constant(val) => *val,
            Self::Var(var) => var.value(),
        }
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Self::Constant(_) => None,
            Self::Var(var) => Some(var),
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Self::Var(_))
    }

    #[cfg(feature = "expr_name")]
    pub(crate) fn label(&self) -> String {
        match self {
            Self::Constant(val) => val.to_string(),
            Self::Var(var) => var.name().unwrap_or("?").to_string(),
        }
    }
}

impl From<f64> for Operand {
    fn from(val: f64) -> Self {
        Self::Constant(val)
    }
}

impl From<Var> for Operand {
    fn from(var: Var) -> Self {
        Self::Var(var)
    }
}

impl From<&Var> for Operand {
    fn from(var: &Var) -> Self {
        Self::Var(var.clone())
    }
}
