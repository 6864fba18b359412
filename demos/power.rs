//! Gradients of `x^p` with respect to both the base and the exponent, and the
//! points where they are not defined.

use depgrad::Var;

fn main() {
    env_logger::init();

    for (x, p) in [(2., 3.), (0., 2.), (0., 0.5), (-2., 2.)] {
        let xv = Var::named("x", x);
        let pv = Var::named("p", p);
        let y = match xv.pow(&pv) {
            Ok(y) => y,
            Err(e) => {
                println!("{x}^{p}: {e}");
                continue;
            }
        };
        match y.backprop() {
            Ok(()) => println!(
                "{x}^{p} = {}, dx: {:?}, dp: {:?}",
                y.value(),
                xv.grad(),
                pv.grad()
            ),
            Err(e) => println!("{x}^{p} = {}, backprop failed: {e}", y.value()),
        }
    }
}
