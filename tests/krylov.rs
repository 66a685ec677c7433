use float_eq::assert_float_eq;
use saiteki::Rn;
use saiteki::solver::*;

type X = Rn<f64>;

//

// Dense column-major matrix operator for exercising the solvers.
struct DenseOp
{
    m: usize,
    a: Vec<f64>,
}

impl DenseOp
{
    fn new(m: usize) -> Self
    {
        DenseOp {m, a: vec![0.; m * m]}
    }
}

impl OperatorX<X, X> for DenseOp
{
    fn apply(&self, x: &Vec<f64>, y: &mut Vec<f64>) -> Result<(), OptError>
    {
        for i in 0..self.m {
            y[i] = 0.;
            for j in 0..self.m {
                y[i] += self.a[i + self.m * j] * x[j];
            }
        }
        Ok(())
    }
}

// The symmetric test operator A = S + 10 I with S_ij = cos((i + 5(j-1))^4)
// symmetrized.
fn sym_op(m: usize) -> DenseOp
{
    let mut a = DenseOp::new(m);
    for j in 1..=m {
        for i in 1..=m {
            let ii = j + (i - 1) * m;
            let jj = i + (j - 1) * m;
            if i > j {
                a.a[ii - 1] = (ii as f64).powi(4).cos();
                a.a[jj - 1] = a.a[ii - 1];
            }
            else if i == j {
                a.a[ii - 1] = (ii as f64).powi(4).cos() + 10.;
            }
        }
    }
    a
}

fn cos_rhs(m: usize) -> Vec<f64>
{
    (1..=m).map(|i| ((i + 25) as f64).cos()).collect()
}

fn rel_err(x_star: &[f64], x: &[f64]) -> f64
{
    let mut residual = x_star.to_vec();
    X::axpy(-1., &x.to_vec(), &mut residual);
    X::norm(&residual) / (1. + X::norm(&x_star.to_vec()))
}

//

#[test]
fn test_gmres_full()
{
    let m = 5;
    let eps_krylov = 1e-12;
    let iter_max = 200;
    let rst_freq = 0;

    let mut a = DenseOp::new(m);
    for i in 1..=m * m {
        a.a[i - 1] = (i as f64).powi(4).cos();
    }

    let b = cos_rhs(m);

    let mut ml_inv = DenseOp::new(m);
    for i in 1..=m * m {
        ml_inv.a[i - 1] = ((30 + i) as f64).powi(4).cos();
    }

    let mut mr_inv = DenseOp::new(m);
    for i in 1..=m * m {
        mr_inv.a[i - 1] = ((55 + i) as f64).powi(4).cos();
    }

    let mut x = vec![0.; m];

    let (err, iter) = gmres(
        &a, &b, eps_krylov, iter_max, rst_freq, &ml_inv, &mr_inv,
        &NullManipulator, &mut x).unwrap();

    assert!(err < eps_krylov);
    assert_eq!(iter, m);

    let x_star = [
        -1.203932331447497,
        -0.186416740769010,
        -0.457476984550115,
        -0.830522778995837,
        -1.125112777803922,
    ];
    assert!(rel_err(&x_star, &x) < 1e-14);
}

#[test]
fn test_gmres_left_preconditioner()
{
    let m = 5;
    let eps_krylov = 1e-12;

    // Rank-deficient diagonal operator with a matching right-hand side.
    let mut a = DenseOp::new(m);
    a.a[0] = 2.;
    a.a[2 + 2 * m] = 3.;
    a.a[4 + 4 * m] = 4.;

    let mut b = vec![0.; m];
    b[0] = 1.;
    b[2] = 1.;
    b[4] = 1.;

    // The left preconditioner inverts the diagonal by hand.
    let mut ml_inv = DenseOp::new(m);
    ml_inv.a[0] = 1. / 2.;
    ml_inv.a[2 + 2 * m] = 1. / 3.;
    ml_inv.a[4 + 4 * m] = 1. / 4.;

    let mut x = vec![0.; m];

    let (err, iter) = gmres(
        &a, &b, eps_krylov, 200, 0, &ml_inv, &IdentityOp,
        &NullManipulator, &mut x).unwrap();

    assert!(err < eps_krylov);
    assert_eq!(iter, 1);

    let x_star = [0.5, 0., 1. / 3., 0., 0.25];
    assert!(rel_err(&x_star, &x) < 1e-14);
}

#[test]
fn test_gmres_right_preconditioner()
{
    let m = 5;
    let eps_krylov = 1e-12;

    let mut a = DenseOp::new(m);
    a.a[0] = 2.;
    a.a[2 + 2 * m] = 3.;
    a.a[4 + 4 * m] = 4.;

    let mut b = vec![0.; m];
    b[0] = 1.;
    b[2] = 1.;
    b[4] = 1.;

    let mut mr_inv = DenseOp::new(m);
    mr_inv.a[0] = 1. / 2.;
    mr_inv.a[2 + 2 * m] = 1. / 3.;
    mr_inv.a[4 + 4 * m] = 1. / 4.;

    let mut x = vec![0.; m];

    let (err, iter) = gmres(
        &a, &b, eps_krylov, 200, 0, &IdentityOp, &mr_inv,
        &NullManipulator, &mut x).unwrap();

    assert!(err < eps_krylov);
    assert_eq!(iter, 1);

    let x_star = [0.5, 0., 1. / 3., 0., 0.25];
    assert!(rel_err(&x_star, &x) < 1e-14);
}

#[test]
fn test_gmres_restart()
{
    let m = 5;
    let eps_krylov = 1e-12;

    let mut a = DenseOp::new(m);
    for i in 1..=m * m {
        a.a[i - 1] = (i as f64).powi(2).cos();
    }

    let b = cos_rhs(m);
    let mut x = vec![0.; m];

    let (err, iter) = gmres(
        &a, &b, eps_krylov, 1000, 3, &IdentityOp, &IdentityOp,
        &NullManipulator, &mut x).unwrap();

    // Restarting every 3 steps costs far more iterations than the
    // unrestarted solve.
    assert!(err < eps_krylov);
    assert!(iter > m);
}

//

#[test]
fn test_tcg_basic_solve()
{
    let m = 5;
    let eps_krylov = 1e-12;
    let delta = 100.;

    let a = sym_op(m);
    let b = cos_rhs(m);
    let norm_b = X::norm(&b);

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![0.; m];

    let (norm_r, iter, _stop) = truncated_cg(
        &a, &b, &IdentityOp, &IdentityOp, &IdentityOp,
        eps_krylov, 200, delta, &x_cntr, false, &mut x, &mut x_cp).unwrap();

    assert!(norm_r < eps_krylov * norm_b);
    assert_eq!(iter, m);

    let x_star = [
        0.062210523692158425,
        -0.027548098303754341,
        -0.11729291808469694,
        -0.080812473373141375,
        0.032637688404329734,
    ];
    assert!(rel_err(&x_star, &x) < 1e-14);

    // The converged solution moved past the Cauchy point.
    assert!(rel_err(&x_cp, &x) > 1e-4);
}

#[test]
fn test_tcg_tr_stopping()
{
    let m = 5;
    let delta = 0.1;

    let a = sym_op(m);
    let b = cos_rhs(m);

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![0.; m];

    let (_norm_r, _iter, stop) = truncated_cg(
        &a, &b, &IdentityOp, &IdentityOp, &IdentityOp,
        1e-12, 200, delta, &x_cntr, false, &mut x, &mut x_cp).unwrap();

    assert_eq!(stop, KrylovStop::TrustRegionViolated);
    assert_float_eq!(X::norm(&x), delta, rmax <= 1e-8);
}

// A = [1 -1; -1 1], b = [3; 4] has no solution.  CG moves along b on the
// first iteration; with the center at (-3, -4) and radius 7.5 it travels
// exactly half the unconstrained distance.
#[test]
fn test_tcg_tr_stopping_moved_center()
{
    let m = 2;
    let delta = 7.5;

    let mut a = DenseOp::new(m);
    a.a[0] = 1.;
    a.a[1] = -1.;
    a.a[2] = -1.;
    a.a[3] = 1.;

    let b = vec![3., 4.];

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![-3., -4.];

    truncated_cg(
        &a, &b, &IdentityOp, &IdentityOp, &IdentityOp,
        1e-12, 200, delta, &x_cntr, false, &mut x, &mut x_cp).unwrap();

    assert_float_eq!(X::norm(&x), 2.5, rmax <= 1e-8);

    let x_star = [1.5, 2.];
    assert!(rel_err(&x_star, &x) < 1e-14);
}

#[test]
fn test_tcg_cauchy_point()
{
    let m = 5;

    let a = sym_op(m);
    let b = cos_rhs(m);

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![0.; m];

    let (_norm_r, iter, _stop) = truncated_cg(
        &a, &b, &IdentityOp, &IdentityOp, &IdentityOp,
        1e-12, 1, 100., &x_cntr, false, &mut x, &mut x_cp).unwrap();

    // A single iteration returns exactly the Cauchy point.
    assert_eq!(iter, 1);
    assert!(rel_err(&x_cp, &x) < 1e-14);
}

#[test]
fn test_tcg_nullspace_solve()
{
    let m = 5;

    let a = sym_op(m);

    // Projects out all but the first two coordinates.
    let mut w = DenseOp::new(m);
    w.a[0] = 1.;
    w.a[1 + m] = 1.;

    // Right-hand side in the range of A W.
    let mut b = vec![0.; m];
    for i in 0..m {
        b[i] = a.a[i] + a.a[i + m];
    }
    let norm_b = X::norm(&b);

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![0.; m];

    let (norm_r, iter, _stop) = truncated_cg(
        &a, &b, &w, &IdentityOp, &IdentityOp,
        1e-12, 200, 100., &x_cntr, true, &mut x, &mut x_cp).unwrap();

    assert!(norm_r < 1e-12 * norm_b);

    // The projection leaves a two-dimensional subspace.
    assert_eq!(iter, 2);

    let x_star = [1., 1., 0., 0., 0.];
    assert!(rel_err(&x_star, &x) < 1e-14);
    assert!(rel_err(&x_cp, &x) > 1e-4);
}

#[test]
fn test_tcg_starting_solution()
{
    let m = 5;

    let a = sym_op(m);
    let b = cos_rhs(m);
    let norm_b = X::norm(&b);

    let mut x = vec![1.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![0.; m];

    let (norm_r, iter, _stop) = truncated_cg(
        &a, &b, &IdentityOp, &IdentityOp, &IdentityOp,
        1e-12, 200, 100., &x_cntr, true, &mut x, &mut x_cp).unwrap();

    assert!(norm_r < 1e-12 * norm_b);
    assert_eq!(iter, m);

    let x_star = [
        0.062210523692158425,
        -0.027548098303754341,
        -0.11729291808469694,
        -0.080812473373141375,
        0.032637688404329734,
    ];
    assert!(rel_err(&x_star, &x) < 1e-14);
    assert!(rel_err(&x_cp, &x) > 1e-4);
}

//

#[test]
fn test_tminres_basic_solve()
{
    let m = 5;
    let eps_krylov = 1e-12;

    let a = sym_op(m);
    let b = cos_rhs(m);
    let norm_b = X::norm(&b);

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![0.; m];

    let (norm_r, iter, _stop) = truncated_minres(
        &a, &b, &IdentityOp, &IdentityOp, &IdentityOp,
        eps_krylov, 200, 100., &x_cntr, &mut x, &mut x_cp).unwrap();

    assert!(norm_r < eps_krylov * norm_b);
    assert_eq!(iter, m);

    let x_star = [
        0.062210523692158425,
        -0.027548098303754341,
        -0.11729291808469694,
        -0.080812473373141375,
        0.032637688404329734,
    ];
    assert!(rel_err(&x_star, &x) < 1e-14);
    assert!(rel_err(&x_cp, &x) > 1e-4);
}

#[test]
fn test_tminres_tr_stopping()
{
    let m = 5;
    let delta = 0.1;

    let a = sym_op(m);
    let b = cos_rhs(m);

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![0.; m];

    let (_norm_r, _iter, stop) = truncated_minres(
        &a, &b, &IdentityOp, &IdentityOp, &IdentityOp,
        1e-12, 200, delta, &x_cntr, &mut x, &mut x_cp).unwrap();

    assert_eq!(stop, KrylovStop::TrustRegionViolated);
    assert_float_eq!(X::norm(&x), delta, rmax <= 1e-8);
}

// Same singular system as the CG moved-center test, but MINRES moves the
// optimal amount along the first Krylov vector, to (1.5, 2); the center at
// (-3, -4) with radius 6.25 halves that to (0.75, 1).
#[test]
fn test_tminres_tr_stopping_moved_center()
{
    let m = 2;
    let delta = 6.25;

    let mut a = DenseOp::new(m);
    a.a[0] = 1.;
    a.a[1] = -1.;
    a.a[2] = -1.;
    a.a[3] = 1.;

    let b = vec![3., 4.];

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![-3., -4.];

    truncated_minres(
        &a, &b, &IdentityOp, &IdentityOp, &IdentityOp,
        1e-12, 200, delta, &x_cntr, &mut x, &mut x_cp).unwrap();

    assert_float_eq!(X::norm(&x), 1.25, rmax <= 1e-8);

    let x_star = [0.75, 1.];
    assert!(rel_err(&x_star, &x) < 1e-14);
}

#[test]
fn test_tminres_cauchy_point()
{
    let m = 5;

    let a = sym_op(m);
    let b = cos_rhs(m);

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![0.; m];

    let (_norm_r, iter, _stop) = truncated_minres(
        &a, &b, &IdentityOp, &IdentityOp, &IdentityOp,
        1e-12, 1, 100., &x_cntr, &mut x, &mut x_cp).unwrap();

    assert_eq!(iter, 1);
    assert!(rel_err(&x_cp, &x) < 1e-14);
}

#[test]
fn test_tminres_nullspace_solve()
{
    let m = 5;

    let a = sym_op(m);

    let mut w = DenseOp::new(m);
    w.a[0] = 1.;
    w.a[1 + m] = 1.;

    let mut b = vec![0.; m];
    for i in 0..m {
        b[i] = a.a[i] + a.a[i + m];
    }
    let norm_b = X::norm(&b);

    let mut x = vec![0.; m];
    let mut x_cp = vec![0.; m];
    let x_cntr = vec![0.; m];

    let (norm_r, iter, _stop) = truncated_minres(
        &a, &b, &w, &IdentityOp, &IdentityOp,
        1e-12, 200, 100., &x_cntr, &mut x, &mut x_cp).unwrap();

    assert!(norm_r < 1e-12 * norm_b);
    assert_eq!(iter, 2);

    let x_star = [1., 1., 0., 0., 0.];
    assert!(rel_err(&x_star, &x) < 1e-14);
    assert!(rel_err(&x_cp, &x) > 1e-4);
}
