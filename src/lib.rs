/*!
Saiteki (最適 in Japanese) means optimal.

<script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
<script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>

This crate for Rust provides a **matrix-free engine for continuous nonlinear
programs**
\\[
\begin{array}{ll}
{\rm minimize} & f(x) \\\\
{\rm subject \ to} & g(x) = 0, \quad h(x) \succeq_\mathcal{K} 0,
\end{array}
\\]
where \\(x\\) lives in an abstract inner-product space, and the cone
\\(\mathcal{K}\\) carries the structure of a Euclidean Jordan algebra.

# General usage

1. Pick the spaces.  [`Rn`] is the built-in dense Euclidean space and
   [`BlockCone`] the built-in symmetric-cone space; anything implementing
   [`solver::HilbertSpace`] (and [`solver::Cone`] for the constraint space)
   plugs in the same way.
1. Implement the oracles: [`solver::ScalarFn`] for the objective
   (value, gradient, Hessian-vector product) and [`solver::VectorFn`] for
   constraints.
1. Create a state, [`solver::CoreState`] for unconstrained problems or
   [`solver::InequalityState`] for cone-constrained ones, and adjust its
   parameters.
1. Invoke [`solver::get_min`] or [`solver::get_min_ineq`].  The stop reason
   is left in the state; the iterate is in `state.x`.

The status table goes to any `core::fmt::Write` sink; warnings go through
the `log` crate, so use any logger crate to surface them.

# Examples

Minimizing \\((x_0+1)^2 + (x_1+1)^2\\) by a trust-region Newton method:

```
use float_eq::assert_float_eq;
use saiteki::Rn;
use saiteki::solver::*;

struct Quad;

impl ScalarFn<Rn<f64>> for Quad
{
    fn eval(&self, x: &Vec<f64>) -> Result<f64, OptError>
    {
        Ok((x[0] + 1.).powi(2) + (x[1] + 1.).powi(2))
    }

    fn grad(&self, x: &Vec<f64>, g: &mut Vec<f64>) -> Result<(), OptError>
    {
        g[0] = 2. * x[0] + 2.;
        g[1] = 2. * x[1] + 2.;
        Ok(())
    }

    fn hessvec(&self, _x: &Vec<f64>, dx: &Vec<f64>, h_dx: &mut Vec<f64>)
        -> Result<(), OptError>
    {
        h_dx[0] = 2. * dx[0];
        h_dx[1] = 2. * dx[1];
        Ok(())
    }
}

let mut state = CoreState::<Rn<f64>>::new(&vec![2.1, 1.1]);
state.h_type = OperatorKind::External;
state.iter_max = 20;
state.verbose = 0;

let mut log = String::new();
get_min(&mut log, &Functions::new(&Quad), &mut NullStateManipulator,
    &mut state).unwrap();

assert_eq!(state.stop, StopCondition::RelativeGradientSmall);
assert_float_eq!(state.x.as_slice(), [-1., -1.].as_ref(), abs_all <= 1e-6);
```
*/

pub mod solver;

//

mod euclid;

pub use euclid::*;

//

mod blockcone;

pub use blockcone::*;
