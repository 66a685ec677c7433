//! Interior-point layering for cone inequality constraints
//!
//! Wraps the user's objective and constraint into a log-barrier merit and
//! runs the core driver with a manipulator that maintains the barrier
//! parameter, the cone multiplier, and strict interiority.  The core loop
//! itself is untouched: everything rides on the
//! [`crate::solver::StateManipulator`] hooks and the `External` Hessian
//! selection.

use core::cell::{Cell, RefCell};
use core::fmt::Write;
use num_traits::{Float, Zero, One};
use crate::solver::{
    Cone, CoreState, Functions, HilbertSpace, InequalityState, OperatorX,
    OptError, OptimLocation, ScalarFn, StateManipulator, VectorFn, get_min,
};

/// The function bundle of an inequality-constrained problem.
pub struct IneqFunctions<'a, X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    /// The objective.
    pub f: &'a dyn ScalarFn<X>,
    /// The cone constraint, \\(h(x) \succeq_\mathcal{K} 0\\).
    pub h: &'a dyn VectorFn<X, Z>,
    /// The external preconditioner, if selected.
    pub minv: Option<&'a dyn OperatorX<X, X>>,
}

impl<'a, X, Z> IneqFunctions<'a, X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    /// Creates a bundle with no external preconditioner.
    pub fn new(f: &'a dyn ScalarFn<X>, h: &'a dyn VectorFn<X, Z>) -> Self
    {
        IneqFunctions {f, h, minv: None}
    }
}

//

// Interior-point data shared between the merit oracle and the manipulator
// for the duration of one solve.
struct IpmData<X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    z: RefCell<Z::Vector>,
    h_x: RefCell<Z::Vector>,
    mu: Cell<Z::F>,
    e: Z::Vector,
    inner_e_e: Z::F,
    // scratch space
    zw1: RefCell<Z::Vector>,
    zw2: RefCell<Z::Vector>,
    xw1: RefCell<X::Vector>,
}

impl<X, Z> IpmData<X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    fn new(x: &X::Vector, z: &Z::Vector, mu: Z::F) -> Self
    {
        let mut z0 = Z::create(z);
        Z::copy(z, &mut z0);
        let mut h_x = Z::create(z);
        Z::zero(&mut h_x);
        let mut e = Z::create(z);
        Z::id(&mut e);
        let inner_e_e = Z::innr(&e, &e);
        let mut zw1 = Z::create(z);
        Z::zero(&mut zw1);
        let mut zw2 = Z::create(z);
        Z::zero(&mut zw2);
        let mut xw1 = X::create(x);
        X::zero(&mut xw1);

        IpmData {
            z: RefCell::new(z0),
            h_x: RefCell::new(h_x),
            mu: Cell::new(mu),
            e,
            inner_e_e,
            zw1: RefCell::new(zw1),
            zw2: RefCell::new(zw2),
            xw1: RefCell::new(xw1),
        }
    }
}

//

// The log-barrier merit.  Its value probes the constraint wherever it is
// asked; its gradient and Hessian action are only meaningful at the current
// iterate, where the h(x) cache is fresh -- which is the only place the
// engine evaluates them.
struct BarrierMerit<'a, X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    f: &'a dyn ScalarFn<X>,
    h: &'a dyn VectorFn<X, Z>,
    data: &'a IpmData<X, Z>,
}

impl<'a, X, Z> ScalarFn<X> for BarrierMerit<'a, X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    // phi(x) = f(x) - mu log det h(x); NaN off the interior, which the
    // acceptance logic treats as a rejection.
    fn eval(&self, x: &X::Vector) -> Result<X::F, OptError>
    {
        let v = self.f.eval(x)?;
        let mut h_of_x = self.data.zw1.borrow_mut();
        self.h.eval(x, &mut h_of_x)?;
        let barrier = Z::barr(&h_of_x);

        Ok(v - self.data.mu.get() * barrier)
    }

    // grad phi = grad f - mu h'(x)* L(h(x))^{-1} e
    fn grad(&self, x: &X::Vector, g: &mut X::Vector) -> Result<(), OptError>
    {
        self.f.grad(x, g)?;

        let h_x = self.data.h_x.borrow();
        let mut w = self.data.zw1.borrow_mut();
        Z::linv(&h_x, &self.data.e, &mut w);
        let mut hs = self.data.xw1.borrow_mut();
        self.h.ps(x, &w, &mut hs)?;
        X::axpy(-self.data.mu.get(), &hs, g);

        Ok(())
    }

    // hess phi dx = hess f dx + h'(x)* L(h(x))^{-1} L(z) h'(x) dx
    fn hessvec(
        &self,
        x: &X::Vector,
        dx: &X::Vector,
        h_dx: &mut X::Vector,
    ) -> Result<(), OptError>
    {
        self.f.hessvec(x, dx, h_dx)?;

        let h_x = self.data.h_x.borrow();
        let z = self.data.z.borrow();
        let mut w1 = self.data.zw1.borrow_mut();
        let mut w2 = self.data.zw2.borrow_mut();
        self.h.p(x, dx, &mut w1)?;
        Z::prod(&z, &w1, &mut w2);
        Z::linv(&h_x, &w2, &mut w1);
        let mut hs = self.data.xw1.borrow_mut();
        self.h.ps(x, &w1, &mut hs)?;
        X::axpy(X::F::one(), &hs, h_dx);

        Ok(())
    }
}

//

struct IpmManipulator<'a, X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    h: &'a dyn VectorFn<X, Z>,
    merit: &'a BarrierMerit<'a, X, Z>,
    data: &'a IpmData<X, Z>,
    sigma: Z::F,
    gamma: Z::F,
    user: &'a mut dyn StateManipulator<X>,
}

impl<'a, X, Z> StateManipulator<X> for IpmManipulator<'a, X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    fn manipulate(&mut self, st: &mut CoreState<X>, loc: OptimLocation)
        -> Result<(), OptError>
    {
        let f0 = X::F::zero();
        let f1 = X::F::one();
        let f2 = f1 + f1;

        match loc {
            OptimLocation::BeforeStep => {
                // Fraction to the boundary of the linearized constraint.
                let damp = {
                    let h_x = self.data.h_x.borrow();
                    let mut dh = self.data.zw1.borrow_mut();
                    self.h.p(&st.x, &st.s, &mut dh)?;
                    let alpha_fb = Z::srch(&h_x, &dh);
                    if alpha_fb >= f0 && self.gamma * alpha_fb < f1 {
                        Some(self.gamma * alpha_fb)
                    }
                    else {
                        None
                    }
                };

                if let Some(t) = damp {
                    X::scal(t, &mut st.s);
                    st.norm_s = X::norm(&st.s);
                }

                if damp.is_some() {
                    let mut xps = X::create(&st.x);
                    X::copy(&st.x, &mut xps);
                    X::axpy(f1, &st.s, &mut xps);
                    let mut obj_xps = self.merit.eval(&xps)?;
                    let mut tries = 0;
                    while obj_xps.is_nan() && tries < 32 {
                        X::scal(f2.recip(), &mut st.s);
                        X::copy(&st.x, &mut xps);
                        X::axpy(f1, &st.s, &mut xps);
                        obj_xps = self.merit.eval(&xps)?;
                        tries += 1;
                    }
                    if obj_xps.is_nan() {
                        log::warn!(
                            "no interior point found along the damped step");
                    }
                    st.obj_xps = obj_xps;
                    st.norm_s = X::norm(&st.s);
                }
            },
            OptimLocation::AfterStepBeforeGradient => {
                // Refresh the constraint cache at the new iterate, then the
                // dual, which the primal update keeps strictly interior.
                let mut h_x = self.data.h_x.borrow_mut();
                self.h.eval(&st.x, &mut h_x)?;

                let mut w = self.data.zw1.borrow_mut();
                Z::linv(&h_x, &self.data.e, &mut w);
                let mut z = self.data.z.borrow_mut();
                Z::copy(&w, &mut z);
                Z::scal(self.data.mu.get(), &mut z);
            },
            OptimLocation::EndOfOptimizationIteration => {
                // Shrink the barrier toward complementarity, then bring the
                // cached merit value and gradient in line with the new mu so
                // the next direction and stopping test are coherent.
                {
                    let h_x = self.data.h_x.borrow();
                    let z = self.data.z.borrow();
                    let mu_est = Z::innr(&h_x, &z) / self.data.inner_e_e;
                    self.data.mu.set(self.sigma * mu_est);
                }

                st.obj_x = self.merit.eval(&st.x)?;
                let mut g = X::create(&st.x);
                self.merit.grad(&st.x, &mut g)?;
                X::copy(&g, &mut st.g);
                st.norm_g = X::norm(&st.g);
            },
        }

        self.user.manipulate(st, loc)
    }
}

//

/// Solves the inequality-constrained problem in the state by an
/// interior-point method layered over the core driver.
///
/// The initial iterate must satisfy \\(h(x) \in {\rm int}\\,\mathcal{K}\\)
/// and the initial multiplier must be strictly interior.  Select
/// [`crate::solver::OperatorKind::External`] as the Hessian type to solve
/// with the exact merit Hessian; the quasi-Newton and identity choices work
/// on the merit gradient as usual.
///
/// Always returns control with the reason in [`CoreState::stop`].
/// * `log` receives the status table.
/// * `fns` is the function bundle.
/// * `smanip` runs after the interior-point bookkeeping at each hook.
/// * `st` is a checked state; mutated in place, including the multiplier,
///   constraint cache, and barrier parameter.
pub fn get_min_ineq<X, Z, L>(
    log: &mut L,
    fns: &IneqFunctions<'_, X, Z>,
    smanip: &mut dyn StateManipulator<X>,
    st: &mut InequalityState<X, Z>,
) -> Result<(), OptError>
where X: HilbertSpace, Z: Cone<F = X::F>, L: Write
{
    let f0 = X::F::zero();
    let f1 = X::F::one();

    st.check()?;

    let data = IpmData::<X, Z>::new(&st.core.x, &st.ineq.z, st.ineq.mu);

    {
        let mut h_x = data.h_x.borrow_mut();
        fns.h.eval(&st.core.x, &mut h_x)?;

        // Strict interiority of both h(x) and z: each must be able to back
        // away from the identity direction.
        let mut neg_e = Z::create(&data.e);
        Z::copy(&data.e, &mut neg_e);
        Z::scal(-f1, &mut neg_e);
        if !(Z::srch(&h_x, &neg_e) > f0) {
            return Err(OptError::Config(
                "the initial point is not strictly feasible".into()));
        }
        if !(Z::srch(&data.z.borrow(), &neg_e) > f0) {
            return Err(OptError::Config(
                "the initial multiplier is not strictly interior".into()));
        }

        if data.mu.get().is_nan() {
            let z = data.z.borrow();
            data.mu.set(Z::innr(&h_x, &z) / data.inner_e_e);
        }
        if !(data.mu.get() > f0) {
            return Err(OptError::Config(
                "the seeded barrier parameter is not positive".into()));
        }
    }

    let merit = BarrierMerit {f: fns.f, h: fns.h, data: &data};
    let mut manip = IpmManipulator {
        h: fns.h,
        merit: &merit,
        data: &data,
        sigma: st.ineq.sigma,
        gamma: st.ineq.gamma,
        user: smanip,
    };
    let core_fns = Functions {f: &merit, minv: fns.minv};

    let result = get_min(log, &core_fns, &mut manip, &mut st.core);

    // Hand the interior-point quantities back to the state, whether or not
    // the run ended cleanly.
    Z::copy(&data.z.borrow(), &mut st.ineq.z);
    Z::copy(&data.h_x.borrow(), &mut st.ineq.h_x);
    st.ineq.mu = data.mu.get();

    result
}
