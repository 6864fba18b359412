//! Dependency graph in diamond shape. `x2` feeds both `y1` and `y2`, so its
//! gradient is the sum over both paths.

use depgrad::Var;

fn main() -> Result<(), depgrad::GradError> {
    env_logger::init();

    let x1 = Var::named("x1", 1.);
    let x2 = Var::named("x2", 2.);
    let x3 = Var::named("x3", 3.);
    let y1 = &x1 * &x2;
    let y2 = &x2 + &x3;
    let y3 = (&y1 / &y2)?;

    y3.backprop()?;
    println!("y3: {}", y3.value());
    for x in [&x1, &x2, &x3] {
        println!("d y3 / d {}: {:?}", x.name().unwrap_or("?"), x.grad());
    }
    Ok(())
}
