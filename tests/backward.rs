use approx::assert_abs_diff_eq;
use depgrad::{op, GradError, Operand, Operator, Var};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_add() {
    init();
    let (x1, x2) = (Var::new(1.), Var::new(2.));
    (&x1 + &x2).backprop().unwrap();
    assert_eq!(x1.grad(), Some(1.));
    assert_eq!(x2.grad(), Some(1.));

    let x1 = Var::new(1.);
    (&x1 + 2.).backprop().unwrap();
    assert_eq!(x1.grad(), Some(1.));

    let x2 = Var::new(2.);
    (1. + &x2).backprop().unwrap();
    assert_eq!(x2.grad(), Some(1.));
}

#[test]
fn test_sub() {
    let (x1, x2) = (Var::new(1.), Var::new(2.));
    (&x1 - &x2).backprop().unwrap();
    assert_eq!(x1.grad(), Some(1.));
    assert_eq!(x2.grad(), Some(-1.));

    let x1 = Var::new(1.);
    (&x1 - 2.).backprop().unwrap();
    assert_eq!(x1.grad(), Some(1.));

    let x2 = Var::new(2.);
    let x3 = 1. - &x2;
    assert_eq!(x3.value(), -1.);
    x3.backprop().unwrap();
    assert_eq!(x2.grad(), Some(-1.));
}

#[test]
fn test_mul() {
    let (x1, x2) = (Var::new(2.), Var::new(3.));
    (&x1 * &x2).backprop().unwrap();
    assert_eq!(x1.grad(), Some(3.));
    assert_eq!(x2.grad(), Some(2.));

    let x1 = Var::new(2.);
    (&x1 * 3.).backprop().unwrap();
    assert_eq!(x1.grad(), Some(3.));

    let x2 = Var::new(3.);
    (2. * &x2).backprop().unwrap();
    assert_eq!(x2.grad(), Some(2.));
}

#[test]
fn test_truediv() {
    let (x1, x2) = (Var::new(1.), Var::new(2.));
    (&x1 / &x2).unwrap().backprop().unwrap();
    assert_eq!(x1.grad(), Some(0.5));
    assert_eq!(x2.grad(), Some(-0.25));

    let x1 = Var::new(1.);
    (&x1 / 2.).unwrap().backprop().unwrap();
    assert_eq!(x1.grad(), Some(0.5));

    let x2 = Var::new(2.);
    (1. / &x2).unwrap().backprop().unwrap();
    assert_eq!(x2.grad(), Some(-0.25));
}

#[test]
fn test_reciprocal() {
    let x = Var::new(2.);
    let y = op::reciprocal(&x).unwrap();
    assert_eq!(y.value(), 0.5);
    y.backprop().unwrap();
    assert_eq!(x.grad(), Some(-0.25));
}

#[test]
fn test_neg() {
    let x = Var::new(2.);
    (-&x).backprop().unwrap();
    assert_eq!(x.grad(), Some(-1.));

    let (x1, x2) = (Var::new(1.), Var::new(2.));
    (&x1 + -&x2).backprop().unwrap();
    assert_eq!(x1.grad(), Some(1.));
    assert_eq!(x2.grad(), Some(-1.));
}

#[test]
fn test_pow() {
    let (x, p) = (Var::new(2.), Var::new(3.));
    let y = x.pow(&p).unwrap();
    assert_eq!(y.value(), 8.);
    y.backprop().unwrap();
    assert_abs_diff_eq!(x.grad().unwrap(), 12., epsilon = 1e-12);
    assert_abs_diff_eq!(p.grad().unwrap(), 8. * 2f64.ln(), epsilon = 1e-12);

    let x = Var::new(0.);
    x.pow(2.).unwrap().backprop().unwrap();
    assert_eq!(x.grad(), Some(0.));
}

#[test]
fn test_pow_upstream_grad() {
    // z = 2 * x^p, so both local gradients carry the upstream factor 2
    let (x, p) = (Var::new(2.), Var::new(3.));
    let z = 2. * &x.pow(&p).unwrap();
    z.backprop().unwrap();
    assert_abs_diff_eq!(x.grad().unwrap(), 24., epsilon = 1e-12);
    assert_abs_diff_eq!(p.grad().unwrap(), 2. * 8. * 2f64.ln(), epsilon = 1e-12);

    let (x, p) = (Var::new(3.), Var::new(2.));
    x.pow(&p).unwrap().backprop_with(-0.5).unwrap();
    assert_abs_diff_eq!(p.grad().unwrap(), -0.5 * 9. * 3f64.ln(), epsilon = 1e-12);
}

#[test]
fn test_topo1() {
    init();
    let (x1, x2, x3) = (
        Var::named("x1", 1.),
        Var::named("x2", 2.),
        Var::named("x3", 3.),
    );
    let y1 = &x1 * &x2;
    let y2 = &x2 + &x3;
    let y3 = (&y1 / &y2).unwrap();
    y3.backprop().unwrap();

    for var in [&x1, &x2, &x3, &y1, &y2, &y3] {
        assert!(!var.is_live());
    }

    assert_abs_diff_eq!(x1.grad().unwrap(), 0.4, epsilon = 1e-12);
    assert_abs_diff_eq!(x2.grad().unwrap(), 0.12, epsilon = 1e-12);
    assert_abs_diff_eq!(x3.grad().unwrap(), -0.08, epsilon = 1e-12);
}

#[test]
fn test_shared_twice() {
    let a = Var::named("a", 1.);
    let b = Var::named("b", 3.);
    let c = Var::named("c", 5.);
    let ab = &a + &b;
    let ac = &a + &c;
    let abac = &ab + &ac;

    abac.backprop().unwrap();
    assert_eq!(a.grad(), Some(2.));
    assert_eq!(b.grad(), Some(1.));
    assert_eq!(c.grad(), Some(1.));
}

#[test]
fn test_same_operand() {
    let x = Var::new(3.);
    let y = &x * &x;
    let z = &y * &x;
    z.backprop().unwrap();
    assert_eq!(x.grad(), Some(27.));
}

#[test]
fn test_deep_diamond() {
    // y = x + x, repeated: every level doubles the gradient, and the
    // expression name too
    let depth = if cfg!(feature = "expr_name") { 10 } else { 30 };
    let x = Var::new(1.);
    let mut y = x.clone();
    for _ in 0..depth {
        y = &y + &y;
    }
    y.backprop().unwrap();
    assert_eq!(x.grad(), Some(2f64.powi(depth)));
}

#[test]
fn test_reuse() {
    let (x1, x2, x3) = (Var::new(1.), Var::new(2.), Var::new(3.));
    let y = (&(&x1 * &x2) / &(&x2 + &x3)).unwrap();

    y.backprop().unwrap();
    let first = [x1.grad(), x2.grad(), x3.grad()];
    y.backprop().unwrap();
    let second = [x1.grad(), x2.grad(), x3.grad()];
    assert_eq!(first, second);
}

#[test]
fn test_seed() {
    let x = Var::new(2.);
    let y = &x * 3.;
    y.backprop_with(0.5).unwrap();
    assert_eq!(x.grad(), Some(1.5));
}

#[test]
fn test_constant_operand() {
    let x = Var::new(1.);
    let y = &x + 5.;
    y.backprop().unwrap();
    assert_eq!(x.grad(), Some(1.));

    let operands = y.operands();
    assert!(matches!(operands[1], Operand::Constant(c) if c == 5.));
    assert!(operands[0].as_var().unwrap().ptr_eq(&x));
}

#[test]
fn test_output_leaf() {
    let x = Var::new(4.);
    x.backprop().unwrap();
    assert_eq!(x.grad(), Some(1.));
    assert!(!x.is_live());
}

#[test]
fn test_intermediate_grad_not_recorded() {
    let x = Var::new(1.);
    let y = &x * 2.;
    let z = &y + 1.;
    z.backprop().unwrap();
    assert_eq!(y.grad(), None);
    assert_eq!(x.grad(), Some(2.));
}

#[test]
fn test_div_by_zero() {
    let x = Var::new(1.);
    assert_eq!((&x / 0.).unwrap_err(), GradError::DivideByZero);
    assert_eq!((&x / Var::new(0.)).unwrap_err(), GradError::DivideByZero);
    assert_eq!(op::reciprocal(0.).unwrap_err(), GradError::DivideByZero);
}

#[test]
fn test_pow_domain() {
    assert_eq!(
        Var::new(0.).pow(-1.).unwrap_err(),
        GradError::ZeroToNegativePower
    );

    let x = Var::new(0.);
    let p = Var::new(0.5);
    let y = x.pow(&p).unwrap();
    assert_eq!(y.backprop(), Err(GradError::NonDifferentiablePower));

    // 0^p has no derivative in p at p == 0
    let p = Var::new(0.);
    let y = op::pow(0., &p).unwrap();
    assert_eq!(y.value(), 1.);
    assert_eq!(y.backprop(), Err(GradError::NonDifferentiablePower));
    assert_eq!(p.grad(), None);
    assert!(!p.is_live());

    let p = Var::new(2.);
    op::pow(0., &p).unwrap().backprop().unwrap();
    assert_eq!(p.grad(), Some(0.));

    let x = Var::new(-2.);
    let p = Var::new(2.);
    let y = x.pow(&p).unwrap();
    assert_eq!(y.value(), 4.);
    assert_eq!(y.backprop(), Err(GradError::NegativeBaseExponentGradient));

    assert_eq!(
        Var::new(2.).pow_mod(3., Some(5.)).unwrap_err(),
        GradError::UnsupportedModulus
    );
}

#[test]
fn test_failed_pass_leaves_nothing() {
    init();
    let a = Var::named("a", 2.);
    let b = Var::named("b", 0.);
    let p = Var::named("p", 0.5);
    let bp = b.pow(&p).unwrap();
    // `a` is reached and resolved before `bp` fails
    let c = &a * &bp;
    assert_eq!(c.backprop(), Err(GradError::NonDifferentiablePower));

    for var in [&a, &b, &p, &bp, &c] {
        assert!(!var.is_live());
        assert_eq!(var.grad(), None);
    }

    // The graph is usable again once the failing branch is cut
    bp.detach();
    c.backprop().unwrap();
    assert_eq!(a.grad(), Some(0.));
    assert_eq!(bp.grad(), Some(2.));
    assert_eq!(b.grad(), None);
}

#[test]
fn test_detach() {
    let x = Var::named("x", 3.);
    let y = &x * 2.;
    let z = &y + 1.;
    z.backprop().unwrap();
    assert_eq!(x.grad(), Some(2.));

    y.detach();
    assert!(y.is_leaf());
    assert!(y.operands().is_empty());
    assert_eq!(y.grad(), None);
    assert_eq!(y.value(), 6.);

    x.detach();
    assert_eq!(x.grad(), None);
    z.backprop().unwrap();
    assert_eq!(y.grad(), Some(1.));
    assert_eq!(x.grad(), None);
}

#[derive(Debug)]
struct Square;

impl Operator for Square {
    fn name(&self) -> &'static str {
        "square"
    }
    fn arity(&self) -> usize {
        1
    }
    fn compute(&self, inputs: &[f64]) -> f64 {
        inputs[0] * inputs[0]
    }
    fn gradient(
        &self,
        grad: f64,
        _output: f64,
        inputs: &[Operand],
    ) -> Result<Vec<Option<f64>>, GradError> {
        Ok(vec![inputs[0].is_var().then(|| 2. * inputs[0].value() * grad)])
    }
}

#[test]
fn test_custom_operator() {
    let x = Var::new(3.);
    let y = Var::apply(&Square, vec![(&x).into()]).unwrap();
    assert_eq!(y.value(), 9.);
    assert_eq!(y.op().unwrap().name(), "square");
    (&y + &x).backprop().unwrap();
    assert_eq!(x.grad(), Some(7.));

    assert_eq!(
        Var::apply(&Square, vec![(&x).into(), 1.0.into()]).unwrap_err(),
        GradError::ArityMismatch {
            op: "square",
            expected: 1,
            got: 2
        }
    );
}

/// Identity that reports too few gradients, or none for its variable operand.
#[derive(Debug)]
struct Lossy {
    short: bool,
}

static SHORT: Lossy = Lossy { short: true };
static SILENT: Lossy = Lossy { short: false };

impl Operator for Lossy {
    fn name(&self) -> &'static str {
        "lossy"
    }
    fn arity(&self) -> usize {
        1
    }
    fn compute(&self, inputs: &[f64]) -> f64 {
        inputs[0]
    }
    fn gradient(
        &self,
        _grad: f64,
        _output: f64,
        _inputs: &[Operand],
    ) -> Result<Vec<Option<f64>>, GradError> {
        Ok(if self.short { vec![] } else { vec![None] })
    }
}

#[test]
fn test_operator_gradient_misaligned() {
    init();
    let x = Var::new(2.);

    let y = Var::apply(&SHORT, vec![(&x).into()]).unwrap();
    assert_eq!(
        y.backprop(),
        Err(GradError::GradientCountMismatch {
            op: "lossy",
            expected: 1,
            got: 0
        })
    );
    assert!(!x.is_live());
    assert!(!y.is_live());

    let y = Var::apply(&SILENT, vec![(&x).into()]).unwrap();
    assert_eq!(
        y.backprop(),
        Err(GradError::MissingGradient {
            op: "lossy",
            index: 0
        })
    );
    assert!(!x.is_live());

    // Later passes through the same leaf are unaffected
    (&x * 3.).backprop().unwrap();
    assert_eq!(x.grad(), Some(3.));
}
