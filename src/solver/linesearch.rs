//! Search directions and step rules for the line-search globalization

use num_traits::{Float, One, NumCast};
use crate::solver::{
    CoreState, HessOp, HilbertSpace, InvBfgs, OperatorX, OptError, PrecondOp,
    IdentityOp, ScalarFn, StepRule, truncated_cg,
};

//

/// \\(s \leftarrow -g\\).
pub(crate) fn steepest_descent<X: HilbertSpace>(st: &mut CoreState<X>)
{
    let f1 = X::F::one();

    X::copy(&st.g, &mut st.s);
    X::scal(-f1, &mut st.s);
}

/// Fletcher-Reeves conjugate gradient direction; steepest descent on the
/// first iteration.
pub(crate) fn fletcher_reeves<X: HilbertSpace>(st: &mut CoreState<X>)
{
    let f1 = X::F::one();

    if st.iter == 1 {
        steepest_descent(st);
    }
    else {
        let beta = X::innr(&st.g, &st.g) / X::innr(&st.g_prev, &st.g_prev);
        X::copy(&st.g, &mut st.s);
        X::scal(-f1, &mut st.s);
        X::axpy(beta, &st.s_prev, &mut st.s);
    }
}

/// Polak-Ribiere conjugate gradient direction.
pub(crate) fn polak_ribiere<X: HilbertSpace>(st: &mut CoreState<X>)
{
    let f1 = X::F::one();

    if st.iter == 1 {
        steepest_descent(st);
    }
    else {
        let beta = (X::innr(&st.g, &st.g) - X::innr(&st.g, &st.g_prev))
            / X::innr(&st.g_prev, &st.g_prev);
        X::copy(&st.g, &mut st.s);
        X::scal(-f1, &mut st.s);
        X::axpy(beta, &st.s_prev, &mut st.s);
    }
}

/// Hestenes-Stiefel conjugate gradient direction.
pub(crate) fn hestenes_stiefel<X: HilbertSpace>(st: &mut CoreState<X>)
{
    let f1 = X::F::one();

    if st.iter == 1 {
        steepest_descent(st);
    }
    else {
        let beta = (X::innr(&st.g, &st.g) - X::innr(&st.g, &st.g_prev))
            / (X::innr(&st.g, &st.s_prev) - X::innr(&st.g_prev, &st.s_prev));
        X::copy(&st.g, &mut st.s);
        X::scal(-f1, &mut st.s);
        X::axpy(beta, &st.s_prev, &mut st.s);
    }
}

/// Limited-memory BFGS direction, \\(s \leftarrow -H_k g\\).
pub(crate) fn bfgs_direction<X: HilbertSpace>(st: &mut CoreState<X>)
    -> Result<(), OptError>
{
    let f1 = X::F::one();

    let hinv = InvBfgs::<X>::new(&st.old_y, &st.old_s);
    hinv.apply(&st.g, &mut st.s)?;
    X::scal(-f1, &mut st.s);

    Ok(())
}

/// Newton-CG direction: truncated CG on \\(A s = -g\\) with no radius.
///
/// Records the Krylov telemetry in the state.  When the very first CG
/// direction exhibits nonpositive curvature the solver falls back to
/// steepest descent.
pub(crate) fn newton_cg<X: HilbertSpace>(
    f: &dyn ScalarFn<X>,
    minv_ext: Option<&dyn OperatorX<X, X>>,
    st: &mut CoreState<X>,
) -> Result<(), OptError>
{
    let f1 = X::F::one();
    let tiny = NumCast::from(1e-16).unwrap_or_else(X::F::min_positive_value);

    let mut b = X::create(&st.x);
    X::copy(&st.g, &mut b);
    X::scal(-f1, &mut b);

    let mut step = X::create(&st.x);
    let mut cp = X::create(&st.x);
    let mut cntr = X::create(&st.x);
    X::zero(&mut cntr);

    let (norm_r, kiter, kstop) = {
        let hess = HessOp::build(
            st.h_type, &st.old_y, &st.old_s, st.norm_g, st.delta_max, f, &st.x)?;
        let minv = PrecondOp::build(
            st.minv_type, &st.old_y, &st.old_s, minv_ext)?;
        truncated_cg(
            &hess, &b, &IdentityOp, &IdentityOp, &minv,
            st.eps_krylov, st.krylov_iter_max, X::F::infinity(),
            &cntr, false, &mut step, &mut cp)?
    };

    X::copy(&step, &mut st.s);
    st.krylov_iter = kiter;
    st.krylov_iter_total += kiter;
    st.krylov_stop = kstop;
    st.krylov_rel_err = norm_r / (tiny + X::norm(&b));

    Ok(())
}

//

/// Golden-section search on the bracket \\([\epsilon, 2\alpha]\\) for a
/// fixed number of narrowing steps; keeps the better of the two inner
/// probes.
pub(crate) fn golden_section<X: HilbertSpace>(
    f: &dyn ScalarFn<X>,
    st: &mut CoreState<X>,
) -> Result<(), OptError>
{
    let f1 = X::F::one();
    let f2 = f1 + f1;
    let f5 = NumCast::from(5.).unwrap_or_else(X::F::nan);

    let mut work = X::create(&st.x);

    // 1 over the golden ratio
    let beta = f2 / (f1 + f5.sqrt());

    let mut a = NumCast::from(1e-16).unwrap_or_else(X::F::min_positive_value);
    let mut b = f2 * st.alpha;

    let mut lambda = a + (f1 - beta) * (b - a);
    let mut mu = a + beta * (b - a);

    X::copy(&st.x, &mut work);
    X::axpy(mu, &st.s, &mut work);
    let mut obj_mu = f.eval(&work)?;

    X::copy(&st.x, &mut work);
    X::axpy(lambda, &st.s, &mut work);
    let mut obj_lambda = f.eval(&work)?;

    for _ in 0..st.linesearch_iter_max {
        // A NaN on the right compares false here and brackets left, which
        // is what keeps the search out of undefined territory.
        if obj_lambda > obj_mu {
            a = lambda;
            lambda = mu;
            obj_lambda = obj_mu;
            mu = a + beta * (b - a);

            X::copy(&st.x, &mut work);
            X::axpy(mu, &st.s, &mut work);
            obj_mu = f.eval(&work)?;
        }
        else {
            b = mu;
            mu = lambda;
            obj_mu = obj_lambda;
            lambda = a + (f1 - beta) * (b - a);

            X::copy(&st.x, &mut work);
            X::axpy(lambda, &st.s, &mut work);
            obj_lambda = f.eval(&work)?;
        }
    }

    st.linesearch_iter = st.linesearch_iter_max;
    st.linesearch_iter_total += st.linesearch_iter_max;

    if obj_lambda < obj_mu {
        st.alpha = lambda;
        st.obj_xps = obj_lambda;
    }
    else {
        st.alpha = mu;
        st.obj_xps = obj_mu;
    }

    Ok(())
}

/// Backtracking search: probe \\(2\alpha, \alpha, \alpha/2, \ldots\\) and
/// keep the best.
pub(crate) fn back_tracking<X: HilbertSpace>(
    f: &dyn ScalarFn<X>,
    st: &mut CoreState<X>,
) -> Result<(), OptError>
{
    let f2 = X::F::one() + X::F::one();

    let mut work = X::create(&st.x);

    let mut alpha_best = f2 * st.alpha;
    X::copy(&st.x, &mut work);
    X::axpy(alpha_best, &st.s, &mut work);
    let mut obj_best = f.eval(&work)?;

    let mut alpha0 = st.alpha;
    for _ in 0..st.linesearch_iter_max.saturating_sub(1) {
        X::copy(&st.x, &mut work);
        X::axpy(alpha0, &st.s, &mut work);
        let obj = f.eval(&work)?;

        if obj < obj_best {
            obj_best = obj;
            alpha_best = alpha0;
        }

        alpha0 = alpha0 / f2;
    }

    st.alpha = alpha_best;
    st.obj_xps = obj_best;
    st.linesearch_iter = st.linesearch_iter_max;
    st.linesearch_iter_total += st.linesearch_iter_max;

    Ok(())
}

/// Barzilai-Borwein two-point step rules.
///
/// Requires a completed outer iteration; the driver substitutes the
/// golden-section rule before that.
pub(crate) fn two_point<X: HilbertSpace>(
    f: &dyn ScalarFn<X>,
    st: &mut CoreState<X>,
) -> Result<(), OptError>
{
    let f1 = X::F::one();

    let mut dx = X::create(&st.x);
    X::copy(&st.x, &mut dx);
    X::axpy(-f1, &st.x_prev, &mut dx);

    let mut dg = X::create(&st.x);
    X::copy(&st.g, &mut dg);
    X::axpy(-f1, &st.g_prev, &mut dg);

    if st.kind == StepRule::TwoPointA {
        st.alpha = X::innr(&dx, &dg) / X::innr(&dg, &dg);
    }
    else {
        st.alpha = X::innr(&dx, &dx) / X::innr(&dx, &dg);
    }

    let mut work = X::create(&st.x);
    X::copy(&st.x, &mut work);
    X::axpy(st.alpha, &st.s, &mut work);
    st.obj_xps = f.eval(&work)?;

    st.linesearch_iter = 1;
    st.linesearch_iter_total += 1;

    Ok(())
}
