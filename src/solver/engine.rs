//! The optimization driver
//!
//! Composes the Krylov solvers, quasi-Newton operators, and line-search
//! rules into a single [`get_min`] loop over the state.  The globalization
//! is either a trust region whose trial step is a truncated-CG solve with a
//! radius constraint, or a line search over one of the direction families.

use core::fmt::Write;
use num_traits::{Float, Zero, One, ToPrimitive, NumCast};
use crate::solver::{
    AlgorithmClass, CoreState, Direction, HessOp, HilbertSpace, IdentityOp,
    KrylovStop, OperatorKind, OperatorX, OptError, OptimLocation, PrecondOp,
    ScalarFn, StepRule, StopCondition, linesearch, truncated_cg,
};

//

/// The function bundle of an unconstrained problem.
pub struct Functions<'a, X: HilbertSpace>
{
    /// The objective.
    pub f: &'a dyn ScalarFn<X>,
    /// The external preconditioner, required when
    /// [`CoreState::minv_type`] is [`OperatorKind::External`].
    pub minv: Option<&'a dyn OperatorX<X, X>>,
}

impl<'a, X: HilbertSpace> Functions<'a, X>
{
    /// Creates a bundle with no external preconditioner.
    pub fn new(f: &'a dyn ScalarFn<X>) -> Self
    {
        Functions {f, minv: None}
    }
}

//

/// A callback with free reign over the state at fixed points of the loop.
///
/// Outer algorithms (interior point, augmented Lagrangian) layer themselves
/// on top of the core through this hook.  Use cautiously.
pub trait StateManipulator<X: HilbertSpace>
{
    /// * `st` is the core state, mutable.
    /// * `loc` says where in the loop the call is made.
    fn manipulate(&mut self, st: &mut CoreState<X>, loc: OptimLocation)
        -> Result<(), OptError>
    {
        let _ = (st, loc);
        Ok(())
    }
}

/// A manipulator that does nothing.
pub struct NullStateManipulator;

impl<X: HilbertSpace> StateManipulator<X> for NullStateManipulator {}

//

/// Evaluates the stopping test.
///
/// A manipulator-requested `External` stop is honored once the tolerance
/// tests have had their chance.
pub fn check_stop<X: HilbertSpace>(st: &CoreState<X>) -> StopCondition
{
    if st.norm_g < st.eps_g * st.norm_gtyp {
        StopCondition::RelativeGradientSmall
    }
    else if st.norm_s < st.eps_s * st.norm_styp {
        StopCondition::RelativeStepSmall
    }
    else if st.iter >= st.iter_max {
        StopCondition::MaxItersExceeded
    }
    else if st.stop == StopCondition::External {
        StopCondition::External
    }
    else {
        StopCondition::NotConverged
    }
}

// Writes one row of the status table; a star marks repeated rows after a
// rejected step.
fn print_state<X, L>(log: &mut L, st: &CoreState<X>, noiter: bool)
    -> Result<(), OptError>
where X: HilbertSpace, L: Write
{
    if st.verbose < 1 {
        return Ok(());
    }

    let mut line = String::new();
    if noiter {
        line.push_str("   * ");
    }
    else {
        line.push_str(&format!("{:>4} ", st.iter));
    }
    line.push_str(&format!(
        "{:>11.3e} {:>11.3e} {:>11.3e} ",
        st.obj_x.to_f64().unwrap_or(f64::NAN),
        st.norm_g.to_f64().unwrap_or(f64::NAN),
        st.norm_s.to_f64().unwrap_or(f64::NAN)));

    if st.algorithm_class == AlgorithmClass::TrustRegion
        || st.dir == Direction::NewtonCG
    {
        let why = match st.krylov_stop {
            KrylovStop::NegativeCurvature => "Neg Curv",
            KrylovStop::RelativeErrorSmall => "Rel Err ",
            KrylovStop::MaxItersExceeded => "Max Iter",
            KrylovStop::TrustRegionViolated => "Trst Reg",
        };
        line.push_str(&format!(
            "{:>11.3e} {:>6} {:>10} ",
            st.krylov_rel_err.to_f64().unwrap_or(f64::NAN),
            st.krylov_iter, why));
    }

    if st.algorithm_class == AlgorithmClass::LineSearch {
        line.push_str(&format!("{:>6} ", st.linesearch_iter));
    }

    writeln!(log, "{}", line).or(Err(OptError::Log))
}

fn print_header<X, L>(log: &mut L, st: &CoreState<X>) -> Result<(), OptError>
where X: HilbertSpace, L: Write
{
    if st.verbose < 1 {
        return Ok(());
    }

    let mut line = String::new();
    line.push_str(&format!(
        "{:>4} {:>11} {:>11} {:>11} ", "Iter", "Obj Value", "norm(g)", "norm(s)"));
    if st.algorithm_class == AlgorithmClass::TrustRegion
        || st.dir == Direction::NewtonCG
    {
        line.push_str(&format!(
            "{:>11} {:>6} {:>10} ", "Kry Error", "KryIt", "Kry Why"));
    }
    if st.algorithm_class == AlgorithmClass::LineSearch {
        line.push_str(&format!("{:>6} ", "LS It"));
    }

    writeln!(log, "{}", line).or(Err(OptError::Log))
}

//

// Trust-region acceptance.  Evaluates the objective at the trial point and
// the quadratic model with the same Hessian the subproblem used, then
// updates the radius.
fn check_step<X: HilbertSpace>(
    fns: &Functions<'_, X>,
    st: &mut CoreState<X>,
) -> Result<bool, OptError>
{
    let f1 = X::F::one();
    let f2 = f1 + f1;
    let half = f1 / f2;
    let small = NumCast::from(1e-4).unwrap_or_else(X::F::min_positive_value);

    let mut xps = X::create(&st.x);
    X::copy(&st.x, &mut xps);
    X::axpy(f1, &st.s, &mut xps);
    let obj_xps = fns.f.eval(&xps)?;

    let mut hs_v = X::create(&st.x);
    {
        let hess = HessOp::build(
            st.h_type, &st.old_y, &st.old_s, st.norm_g, st.delta_max,
            fns.f, &st.x)?;
        hess.apply(&st.s, &mut hs_v)?;
    }

    st.obj_xps = obj_xps;
    let model = st.obj_x + X::innr(&st.g, &st.s)
        + half * X::innr(&hs_v, &st.s);

    // If the model fails to decrease, the subproblem solve was meaningless
    // (a nonsymmetric Hessian approximation, for instance).  Shrink and
    // reject rather than trusting the ratio.
    if model > st.obj_x {
        st.delta = st.norm_s / f2;
        st.rho = X::F::nan();
        return Ok(false);
    }

    st.rho = (st.obj_x - st.obj_xps) / (st.obj_x - model);

    if st.rho >= st.eta2 {
        // Only expand when the step pressed against the boundary.
        if (st.norm_s - st.delta).abs() < small * st.delta {
            st.delta = (st.delta * f2).min(st.delta_max);
        }
        Ok(true)
    }
    else if st.rho >= st.eta1 {
        Ok(true)
    }
    else {
        st.delta = st.norm_s / f2;
        Ok(false)
    }
}

// Finds the trust-region step: loop the truncated-CG solve and the
// acceptance test until a step is accepted.
fn get_step_tr<X, L>(
    log: &mut L,
    fns: &Functions<'_, X>,
    st: &mut CoreState<X>,
) -> Result<(), OptError>
where X: HilbertSpace, L: Write
{
    let f1 = X::F::one();
    let tiny = NumCast::from(1e-16).unwrap_or_else(X::F::min_positive_value);

    st.rejected_trustregion = 0;
    loop {
        // Persistent rejection may mean the quasi-Newton history itself is
        // the problem.
        if st.rejected_trustregion > st.history_reset {
            st.old_y.clear();
            st.old_s.clear();
        }
        if st.rejected_trustregion > 0 {
            print_state(log, st, true)?;
        }

        let mut b = X::create(&st.x);
        X::copy(&st.g, &mut b);
        X::scal(-f1, &mut b);

        let mut step = X::create(&st.x);
        let mut cp = X::create(&st.x);
        let mut cntr = X::create(&st.x);
        X::zero(&mut cntr);

        let (norm_r, kiter, kstop) = {
            let hess = HessOp::build(
                st.h_type, &st.old_y, &st.old_s, st.norm_g, st.delta_max,
                fns.f, &st.x)?;
            let minv = PrecondOp::build(
                st.minv_type, &st.old_y, &st.old_s, fns.minv)?;
            truncated_cg(
                &hess, &b, &IdentityOp, &IdentityOp, &minv,
                st.eps_krylov, st.krylov_iter_max, st.delta,
                &cntr, false, &mut step, &mut cp)?
        };

        X::copy(&step, &mut st.s);
        st.krylov_iter = kiter;
        st.krylov_iter_total += kiter;
        st.krylov_stop = kstop;
        st.krylov_rel_err = norm_r / (tiny + X::norm(&b));
        st.norm_s = X::norm(&st.s);

        st.rejected_trustregion += 1;

        if check_step(fns, st)? {
            break;
        }
    }
    st.rejected_trustregion -= 1;

    Ok(())
}

// Finds the line-search step: direction rule, then step rule, then rescale.
fn get_step_ls<X, L>(
    log: &mut L,
    fns: &Functions<'_, X>,
    st: &mut CoreState<X>,
) -> Result<(), OptError>
where X: HilbertSpace, L: Write
{
    let f2 = X::F::one() + X::F::one();

    match st.dir {
        Direction::SteepestDescent => linesearch::steepest_descent(st),
        Direction::FletcherReeves => linesearch::fletcher_reeves(st),
        Direction::PolakRibiere => linesearch::polak_ribiere(st),
        Direction::HestenesStiefel => linesearch::hestenes_stiefel(st),
        Direction::BFGS => linesearch::bfgs_direction(st)?,
        Direction::NewtonCG => linesearch::newton_cg(fns.f, fns.minv, st)?,
    }

    match st.kind {
        StepRule::GoldenSection => {
            loop {
                linesearch::golden_section(fns.f, st)?;

                // No decrease (or a NaN probe): shrink and search again.
                if !(st.obj_x < st.obj_xps || st.obj_xps.is_nan()) {
                    break;
                }
                st.norm_s = st.alpha * X::norm(&st.s);
                print_state(log, st, true)?;
                st.alpha = st.alpha / f2;
            }
        },
        StepRule::BackTracking => {
            let shrink = NumCast::from(2f64.powi(st.linesearch_iter_max as i32 + 1))
                .unwrap_or_else(X::F::infinity);
            loop {
                linesearch::back_tracking(fns.f, st)?;

                if !(st.obj_x < st.obj_xps || st.obj_xps.is_nan()) {
                    break;
                }
                st.norm_s = st.alpha * X::norm(&st.s);
                print_state(log, st, true)?;
                st.alpha = st.alpha / shrink;
            }
        },
        StepRule::TwoPointA | StepRule::TwoPointB => {
            if st.iter > 1 {
                linesearch::two_point(fns.f, st)?;
            }
            else {
                linesearch::golden_section(fns.f, st)?;
            }
        },
        StepRule::Brents => {
            return Err(OptError::NotImplemented(
                "Brent's line search is reserved"));
        },
    }

    // Fold the step length into the step itself.
    X::scal(st.alpha, &mut st.s);
    st.norm_s = X::norm(&st.s);

    Ok(())
}

// Updates the quasi-Newton history with the pair from the accepted step.
fn update_quasi<X: HilbertSpace>(st: &mut CoreState<X>)
{
    let f0 = X::F::zero();
    let f1 = X::F::one();

    if st.stored_history == 0 {
        return;
    }

    let mut s = X::create(&st.x);
    X::copy(&st.x, &mut s);
    X::axpy(-f1, &st.x_prev, &mut s);

    let mut y = X::create(&st.x);
    X::copy(&st.g, &mut y);
    X::axpy(-f1, &st.g_prev, &mut y);

    // Any BFGS variant in play requires a positive <y, s>; a violating
    // pair is discarded at insertion time.
    let uses_bfgs = st.minv_type == OperatorKind::InvBFGS
        || st.h_type == OperatorKind::BFGS
        || st.dir == Direction::BFGS;
    if uses_bfgs && X::innr(&y, &s) <= f0 {
        return;
    }

    st.old_s.push_front(s);
    st.old_y.push_front(y);
    if st.old_s.len() > st.stored_history {
        st.old_s.pop_back();
        st.old_y.pop_back();
    }
}

//

/// Solves the optimization problem in the state.
///
/// Always returns control with the reason in [`CoreState::stop`]; an `Err`
/// means a configuration, oracle, or history failure, with the state left
/// inspectable.
/// * `log` receives the status table.
/// * `fns` is the function bundle.
/// * `smanip` is invoked at the locations of
///   [`OptimLocation`]; use [`NullStateManipulator`] when no layering is
///   wanted.
/// * `st` is a checked state; mutated in place.
pub fn get_min<X, L>(
    log: &mut L,
    fns: &Functions<'_, X>,
    smanip: &mut dyn StateManipulator<X>,
    st: &mut CoreState<X>,
) -> Result<(), OptError>
where X: HilbertSpace, L: Write
{
    st.check()?;

    // Surface bad operator selections before any compute.
    match st.h_type {
        OperatorKind::InvBFGS | OperatorKind::InvSR1 => {
            return Err(OptError::Config(format!(
                "not a valid Hessian approximation: {}", st.h_type.as_str())));
        },
        _ => {},
    }
    match st.minv_type {
        OperatorKind::External if fns.minv.is_none() => {
            return Err(OptError::UnsupportedOperator(
                "an external preconditioner must be provided explicitly"));
        },
        OperatorKind::Identity | OperatorKind::InvBFGS
        | OperatorKind::InvSR1 | OperatorKind::External => {},
        _ => {
            return Err(OptError::Config(format!(
                "not a valid preconditioner: {}", st.minv_type.as_str())));
        },
    }

    // Evaluate the objective and gradient unless a capture already did.
    if st.obj_x.is_nan() {
        st.obj_x = fns.f.eval(&st.x)?;
        fns.f.grad(&st.x, &mut st.g)?;
        st.norm_g = X::norm(&st.g);
        st.norm_gtyp = st.norm_g;
    }

    print_header(log, st)?;

    loop {
        print_state(log, st, false)?;

        match st.algorithm_class {
            AlgorithmClass::TrustRegion => get_step_tr(log, fns, st)?,
            AlgorithmClass::LineSearch => get_step_ls(log, fns, st)?,
        }

        smanip.manipulate(st, OptimLocation::BeforeStep)?;

        if st.norm_styp.is_nan() {
            st.norm_styp = st.norm_s;
        }

        // The previous iterate feeds both the nonlinear-CG directions and
        // the quasi-Newton history.
        X::copy(&st.x, &mut st.x_prev);
        X::copy(&st.g, &mut st.g_prev);
        X::copy(&st.s, &mut st.s_prev);

        X::axpy(X::F::one(), &st.s, &mut st.x);
        st.obj_x = st.obj_xps;

        smanip.manipulate(st, OptimLocation::AfterStepBeforeGradient)?;

        fns.f.grad(&st.x, &mut st.g)?;
        st.norm_g = X::norm(&st.g);

        update_quasi(st);

        st.iter += 1;
        st.stop = check_stop(st);

        smanip.manipulate(st, OptimLocation::EndOfOptimizationIteration)?;

        if st.stop != StopCondition::NotConverged {
            break;
        }
    }

    print_state(log, st, false)?;

    Ok(())
}
