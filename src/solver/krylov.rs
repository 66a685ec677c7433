//! Krylov subproblem solvers
//!
//! Three matrix-free solvers feed the outer iteration: restarted GMRES for
//! general linear systems, and truncated conjugate-gradient and truncated
//! MINRES variants adapted for trust-region subproblems with a null-space
//! projector and an off-center radius constraint.

use num_traits::{Float, Zero, One};
use crate::solver::{HilbertSpace, KrylovStop, OperatorX, OptError};

/// Per-iteration hook into [`gmres`].
///
/// Invoked once per Arnoldi step; may observe the residual estimate and
/// retune the convergence tolerance (inexact-Newton forcing terms).
pub trait GmresManipulator<X: HilbertSpace>
{
    /// * `iter` is the number of Arnoldi steps taken so far.
    /// * `norm_r` is the current preconditioned residual estimate.
    /// * `eps` is the absolute stopping tolerance, adjustable in place.
    fn each_iteration(&self, iter: usize, norm_r: X::F, eps: &mut X::F)
    {
        let _ = (iter, norm_r, eps);
    }
}

/// A manipulator that does nothing.
pub struct NullManipulator;

impl<X: HilbertSpace> GmresManipulator<X> for NullManipulator {}

//

// Positive root of ||w_s + sigma w_p|| = delta in the trust-region inner
// product, given the three scalar coefficients.
fn boundary_root<F: Float>(inner_ws_wp: F, norm_wp2: F, norm_ws2: F, delta: F)
    -> F
{
    (-inner_ws_wp
        + (inner_ws_wp * inner_ws_wp + norm_wp2 * (delta * delta - norm_ws2))
            .sqrt())
        / norm_wp2
}

//

/// Solves \\(A x = b\\) by restarted GMRES with left and right
/// preconditioners.
///
/// Returns the achieved residual norm \\(\\|M_L^{-1}(b - A x)\\|\\) and the
/// total number of Arnoldi steps.
/// * `a` is the operator \\(A\\).
/// * `b` is the right-hand side.
/// * `eps` is the absolute residual tolerance, measured in the
///   left-preconditioned norm.
/// * `iter_max` caps the total number of Arnoldi steps.
/// * `rst_freq` restarts the Arnoldi process every that many steps;
///   0 disables restarting.
/// * `ml_inv` and `mr_inv` are the left and right preconditioners.
/// * `manip` is invoked once per Arnoldi step.
/// * `x` is the initial iterate before entry, the solution on exit.
pub fn gmres<X, OA, OL, OR, M>(
    a: &OA,
    b: &X::Vector,
    eps: X::F,
    iter_max: usize,
    rst_freq: usize,
    ml_inv: &OL,
    mr_inv: &OR,
    manip: &M,
    x: &mut X::Vector,
) -> Result<(X::F, usize), OptError>
where
    X: HilbertSpace,
    OA: OperatorX<X, X>,
    OL: OperatorX<X, X>,
    OR: OperatorX<X, X>,
    M: GmresManipulator<X>,
{
    let f0 = X::F::zero();
    let f1 = X::F::one();
    let mut eps = eps;

    let mut t = X::create(b);
    let mut u = X::create(b);
    let mut r = X::create(b);

    // r = Ml (b - A x)
    let residual = |x: &X::Vector, t: &mut X::Vector, r: &mut X::Vector|
        -> Result<X::F, OptError>
    {
        a.apply(x, t)?;
        X::scal(-f1, t);
        X::axpy(f1, b, t);
        ml_inv.apply(t, r)?;
        Ok(X::norm(r))
    };

    let mut norm_r = residual(x, &mut t, &mut r)?;
    let mut iter_total = 0;

    if norm_r <= eps {
        return Ok((norm_r, iter_total));
    }

    loop {
        // One Arnoldi cycle, Givens rotations maintaining the factorization.
        let mut vs: Vec<X::Vector> = Vec::new();
        let mut hs: Vec<Vec<X::F>> = Vec::new();
        let mut cs: Vec<X::F> = Vec::new();
        let mut sn: Vec<X::F> = Vec::new();
        let mut rhs: Vec<X::F> = vec![norm_r];

        let mut v0 = X::create(b);
        X::copy(&r, &mut v0);
        X::scal(norm_r.recip(), &mut v0);
        vs.push(v0);

        loop {
            let j = vs.len() - 1;

            // w = Ml A Mr v_j
            mr_inv.apply(&vs[j], &mut t)?;
            a.apply(&t, &mut u)?;
            let mut w = X::create(b);
            ml_inv.apply(&u, &mut w)?;

            // Modified Gram-Schmidt
            let mut h = vec![f0; j + 2];
            for (i, vi) in vs.iter().enumerate() {
                h[i] = X::innr(&w, vi);
                X::axpy(-h[i], vi, &mut w);
            }
            let h_next = X::norm(&w);
            h[j + 1] = h_next;

            // Apply the accumulated rotations, then a new one to restore
            // the triangular factor.
            for i in 0..j {
                let hi = cs[i] * h[i] + sn[i] * h[i + 1];
                h[i + 1] = -sn[i] * h[i] + cs[i] * h[i + 1];
                h[i] = hi;
            }
            let rr = (h[j] * h[j] + h[j + 1] * h[j + 1]).sqrt();
            let (c, s) = if rr > f0 {
                (h[j] / rr, h[j + 1] / rr)
            }
            else {
                (f1, f0)
            };
            cs.push(c);
            sn.push(s);
            h[j] = rr;
            h[j + 1] = f0;
            hs.push(h);

            let rj = rhs[j];
            rhs[j] = c * rj;
            rhs.push(-s * rj);

            iter_total += 1;
            let norm_r_est = rhs[j + 1].abs();
            manip.each_iteration(iter_total, norm_r_est, &mut eps);

            let converged = norm_r_est <= eps || h_next <= f0;
            let capped = iter_total >= iter_max;
            let restart = rst_freq != 0 && vs.len() >= rst_freq;

            if converged || capped || restart {
                // Back-solve the triangular factor and leave the cycle.
                let n = hs.len();
                let mut y = vec![f0; n];
                for i in (0..n).rev() {
                    let mut v = rhs[i];
                    for k in i + 1..n {
                        v = v - hs[k][i] * y[k];
                    }
                    y[i] = v / hs[i][i];
                }
                X::zero(&mut u);
                for (yi, vi) in y.iter().zip(vs.iter()) {
                    X::axpy(*yi, vi, &mut u);
                }
                mr_inv.apply(&u, &mut t)?;
                X::axpy(f1, &t, x);
                break;
            }

            X::scal(h_next.recip(), &mut w);
            vs.push(w);
        }

        // The residual is recomputed explicitly at every restart and exit.
        norm_r = residual(x, &mut t, &mut r)?;
        if norm_r <= eps || iter_total >= iter_max {
            return Ok((norm_r, iter_total));
        }
    }
}

//

/// Solves the trust-region subproblem
/// \\(\min_p \langle b, -p \rangle + \frac12 \langle p, A p \rangle\\)
/// by truncated conjugate gradients, with a null-space projector and an
/// off-center radius constraint.
///
/// Residual form: iterates toward \\(A x = b\\), stopping early on
/// nonpositive curvature or when the next iterate leaves the region
/// \\(\\|T(x - x\\_{cntr})\\| \le \Delta\\), in which case the step is
/// extended to the boundary along the current direction.
///
/// Returns the achieved residual norm, the iteration count, and the stop
/// reason; the first iterate (the Cauchy point) is always written to
/// `x_cp`.
/// * `a` is the (symmetric) operator \\(A\\).
/// * `b` is the right-hand side.
/// * `w` is an orthogonal projector applied to every direction before the
///   operator and the radius tests.
/// * `tr_op` is the shape operator \\(T\\) defining the trust-region norm.
/// * `minv` is the preconditioner; the identity in most uses.
/// * `eps` is the relative residual tolerance,
///   \\(\\|r\\| \le \varepsilon \\|b\\|\\).
/// * `iter_max` caps the iteration count.
/// * `delta` is the radius; an infinite radius turns the boundary exit into
///   the Newton-CG fallback (first-iteration steepest descent).
/// * `x_cntr` is the center of the region.
/// * `do_starting` keeps the incoming `x` as the initial iterate; otherwise
///   `x` is hard-zeroed first.
pub fn truncated_cg<X, OA, OW, OT, OM>(
    a: &OA,
    b: &X::Vector,
    w: &OW,
    tr_op: &OT,
    minv: &OM,
    eps: X::F,
    iter_max: usize,
    delta: X::F,
    x_cntr: &X::Vector,
    do_starting: bool,
    x: &mut X::Vector,
    x_cp: &mut X::Vector,
) -> Result<(X::F, usize, KrylovStop), OptError>
where
    X: HilbertSpace,
    OA: OperatorX<X, X>,
    OW: OperatorX<X, X>,
    OT: OperatorX<X, X>,
    OM: OperatorX<X, X>,
{
    let f0 = X::F::zero();
    let f1 = X::F::one();
    let f2 = f1 + f1;

    if !do_starting {
        X::zero(x);
    }

    let norm_b = X::norm(b);

    // r = b - A x
    let mut r = X::create(b);
    if do_starting {
        a.apply(x, &mut r)?;
        X::scal(-f1, &mut r);
        X::axpy(f1, b, &mut r);
    }
    else {
        X::copy(b, &mut r);
    }

    // Offset of the iterate from the center, in the trust-region norm.
    let mut tmp = X::create(b);
    X::copy(x, &mut tmp);
    X::axpy(-f1, x_cntr, &mut tmp);
    let mut w_s = X::create(b);
    tr_op.apply(&tmp, &mut w_s)?;

    let mut v = X::create(b);
    minv.apply(&r, &mut v)?;
    let mut p = X::create(b);
    w.apply(&v, &mut p)?;
    let mut inner_r_v = X::innr(&r, &v);

    let mut ap = X::create(b);
    let mut w_p = X::create(b);
    let mut norm_r = X::norm(&r);

    for iter in 1..=iter_max {
        a.apply(&p, &mut ap)?;
        let kappa = X::innr(&p, &ap);

        tr_op.apply(&p, &mut w_p)?;
        let inner_ws_wp = X::innr(&w_s, &w_p);
        let norm_wp2 = X::innr(&w_p, &w_p);
        let norm_ws2 = X::innr(&w_s, &w_s);

        let mut alpha = f0;
        let mut trial2 = f0;
        if kappa > f0 {
            alpha = inner_r_v / kappa;
            trial2 = norm_ws2 + f2 * alpha * inner_ws_wp
                + alpha * alpha * norm_wp2;
        }

        // The !(kappa > 0) comparison also traps a NaN curvature.
        if !(kappa > f0) || trial2 >= delta * delta {
            let stop = if !(kappa > f0) {
                KrylovStop::NegativeCurvature
            }
            else {
                KrylovStop::TrustRegionViolated
            };

            if delta.is_infinite() {
                // No boundary to extend to: fall back to the projected
                // steepest-descent step on the first iteration, else keep
                // the last good iterate.
                if iter == 1 {
                    w.apply(b, x)?;
                }
            }
            else {
                let sigma = boundary_root(inner_ws_wp, norm_wp2, norm_ws2, delta);
                X::axpy(sigma, &p, x);
                X::axpy(-sigma, &ap, &mut r);
            }

            if iter == 1 {
                X::copy(x, x_cp);
            }
            norm_r = X::norm(&r);
            return Ok((norm_r, iter, stop));
        }

        X::axpy(alpha, &p, x);
        X::axpy(alpha, &w_p, &mut w_s);
        X::axpy(-alpha, &ap, &mut r);
        if iter == 1 {
            X::copy(x, x_cp);
        }

        norm_r = X::norm(&r);
        if norm_r <= eps * norm_b {
            return Ok((norm_r, iter, KrylovStop::RelativeErrorSmall));
        }

        minv.apply(&r, &mut v)?;
        let inner_next = X::innr(&r, &v);
        let beta = inner_next / inner_r_v;
        inner_r_v = inner_next;

        // p <- W(v + beta p)
        X::scal(beta, &mut p);
        X::axpy(f1, &v, &mut p);
        w.apply(&p, &mut tmp)?;
        X::copy(&tmp, &mut p);
    }

    Ok((norm_r, iter_max, KrylovStop::MaxItersExceeded))
}

//

/// Solves the trust-region subproblem by truncated MINRES.
///
/// Same inputs and output contract as [`truncated_cg`] except that the
/// initial iterate is always zero; the symmetric-indefinite Lanczos
/// recurrence replaces the CG one, with the same projection, truncation
/// rules, and stopping criteria.  Use this when the operator is symmetric
/// but not necessarily positive definite.
pub fn truncated_minres<X, OA, OW, OT, OM>(
    a: &OA,
    b: &X::Vector,
    w_proj: &OW,
    tr_op: &OT,
    minv: &OM,
    eps: X::F,
    iter_max: usize,
    delta: X::F,
    x_cntr: &X::Vector,
    x: &mut X::Vector,
    x_cp: &mut X::Vector,
) -> Result<(X::F, usize, KrylovStop), OptError>
where
    X: HilbertSpace,
    OA: OperatorX<X, X>,
    OW: OperatorX<X, X>,
    OT: OperatorX<X, X>,
    OM: OperatorX<X, X>,
{
    let f0 = X::F::zero();
    let f1 = X::F::one();
    let f2 = f1 + f1;

    X::zero(x);
    let norm_b = X::norm(b);

    let true_residual = |x: &X::Vector, t: &mut X::Vector| -> Result<X::F, OptError>
    {
        a.apply(x, t)?;
        X::scal(-f1, t);
        X::axpy(f1, b, t);
        Ok(X::norm(t))
    };

    let mut t = X::create(b);

    // Lanczos seed: the projected, preconditioned right-hand side.
    let mut r1 = X::create(b);
    w_proj.apply(b, &mut r1)?;
    let mut y = X::create(b);
    minv.apply(&r1, &mut t)?;
    w_proj.apply(&t, &mut y)?;

    let beta1_sq = X::innr(&r1, &y);
    if !(beta1_sq > f0) {
        X::copy(x, x_cp);
        let nr = true_residual(x, &mut t)?;
        return Ok((nr, 0, KrylovStop::RelativeErrorSmall));
    }
    let beta1 = beta1_sq.sqrt();

    let mut r2 = X::create(b);
    X::copy(&r1, &mut r2);

    // Offset of the iterate from the center, in the trust-region norm.
    X::copy(x, &mut t);
    X::axpy(-f1, x_cntr, &mut t);
    let mut w_s = X::create(b);
    tr_op.apply(&t, &mut w_s)?;

    let mut v = X::create(b);
    let mut av = X::create(b);
    let mut ynew = X::create(b);
    let mut w_w = X::create(b);

    // Direction recurrence, with the matching A-images carried alongside so
    // curvature never costs an extra operator apply.
    let mut w_k = X::create(b);
    let mut w_m1 = X::create(b);
    let mut w_m2 = X::create(b);
    X::zero(&mut w_m1);
    X::zero(&mut w_m2);
    let mut aw_k = X::create(b);
    let mut aw_m1 = X::create(b);
    let mut aw_m2 = X::create(b);
    X::zero(&mut aw_m1);
    X::zero(&mut aw_m2);

    let mut oldb = f0;
    let mut beta = beta1;
    let mut dbar = f0;
    let mut epsln = f0;
    let mut phibar = beta1;
    let mut cs = -f1;
    let mut sn = f0;

    for iter in 1..=iter_max {
        // Lanczos step
        X::copy(&y, &mut v);
        X::scal(beta.recip(), &mut v);

        a.apply(&v, &mut t)?;
        w_proj.apply(&t, &mut av)?;

        X::copy(&av, &mut ynew);
        if iter >= 2 {
            X::axpy(-(beta / oldb), &r1, &mut ynew);
        }
        let alfa = X::innr(&v, &ynew);
        X::axpy(-(alfa / beta), &r2, &mut ynew);
        core::mem::swap(&mut r1, &mut r2);
        core::mem::swap(&mut r2, &mut ynew);

        minv.apply(&r2, &mut t)?;
        w_proj.apply(&t, &mut y)?;

        oldb = beta;
        let beta_sq = X::innr(&r2, &y);
        beta = if beta_sq > f0 {beta_sq.sqrt()} else {f0};

        // Two Givens rotations keep the tridiagonal factor triangular.
        let oldeps = epsln;
        let delta_qr = cs * dbar + sn * alfa;
        let gbar = sn * dbar - cs * alfa;
        epsln = sn * beta;
        dbar = -cs * beta;
        let mut gamma = (gbar * gbar + beta * beta).sqrt();
        if !(gamma > f0) {
            gamma = X::F::min_positive_value();
        }
        cs = gbar / gamma;
        sn = beta / gamma;
        let phi = cs * phibar;
        phibar = sn * phibar;

        // New direction and its A-image
        X::copy(&v, &mut w_k);
        X::axpy(-oldeps, &w_m2, &mut w_k);
        X::axpy(-delta_qr, &w_m1, &mut w_k);
        X::scal(gamma.recip(), &mut w_k);

        X::copy(&av, &mut aw_k);
        X::axpy(-oldeps, &aw_m2, &mut aw_k);
        X::axpy(-delta_qr, &aw_m1, &mut aw_k);
        X::scal(gamma.recip(), &mut aw_k);

        let kappa = X::innr(&w_k, &aw_k);

        tr_op.apply(&w_k, &mut w_w)?;
        let inner_ws_ww = X::innr(&w_s, &w_w);
        let norm_ww2 = X::innr(&w_w, &w_w);
        let norm_ws2 = X::innr(&w_s, &w_s);
        let trial2 = norm_ws2 + f2 * phi * inner_ws_ww
            + phi * phi * norm_ww2;

        if !(kappa > f0) || trial2 >= delta * delta {
            let stop = if !(kappa > f0) {
                KrylovStop::NegativeCurvature
            }
            else {
                KrylovStop::TrustRegionViolated
            };

            if delta.is_infinite() {
                if iter == 1 {
                    w_proj.apply(b, x)?;
                }
            }
            else {
                let sigma = boundary_root(inner_ws_ww, norm_ww2, norm_ws2, delta);
                X::axpy(sigma, &w_k, x);
            }

            if iter == 1 {
                X::copy(x, x_cp);
            }
            let nr = true_residual(x, &mut t)?;
            return Ok((nr, iter, stop));
        }

        X::axpy(phi, &w_k, x);
        X::axpy(phi, &w_w, &mut w_s);
        if iter == 1 {
            X::copy(x, x_cp);
        }

        if phibar <= eps * norm_b {
            let nr = true_residual(x, &mut t)?;
            return Ok((nr, iter, KrylovStop::RelativeErrorSmall));
        }

        core::mem::swap(&mut w_m2, &mut w_m1);
        core::mem::swap(&mut w_m1, &mut w_k);
        core::mem::swap(&mut aw_m2, &mut aw_m1);
        core::mem::swap(&mut aw_m1, &mut aw_k);
    }

    let nr = true_residual(x, &mut t)?;
    Ok((nr, iter_max, KrylovStop::MaxItersExceeded))
}
