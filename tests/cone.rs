use float_eq::assert_float_eq;
use rand::prelude::*;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use saiteki::{BlockCone, BlockDim, BlockVec};
use saiteki::solver::*;

type Z = BlockCone<f64>;

fn entries_close(x: &BlockVec<f64>, y: &BlockVec<f64>, tol: f64)
{
    let mut d = Z::create(x);
    Z::copy(x, &mut d);
    Z::axpy(-1., y, &mut d);
    assert!(Z::norm(&d) <= tol, "block vectors differ by {}", Z::norm(&d));
}

fn interior_point(rng: &mut Xoshiro256StarStar, dims: &[BlockDim])
    -> BlockVec<f64>
{
    // e + small random symmetric perturbation stays interior.
    let mut x = BlockVec::new(dims);
    Z::id(&mut x);
    let mut p = BlockVec::new(dims);
    for b in p.blocks_mut() {
        match b {
            saiteki::Block::Orthant(v) | saiteki::Block::Quadratic(v) => {
                for u in v.iter_mut() {
                    *u = 0.2 * (rng.gen::<f64>() - 0.5);
                }
            },
            saiteki::Block::Semidefinite {n, a} => {
                let n = *n;
                for j in 0..n {
                    for i in 0..=j {
                        let v = 0.2 * (rng.gen::<f64>() - 0.5);
                        a[i + n * j] = v;
                        a[j + n * i] = v;
                    }
                }
            },
        }
    }
    Z::axpy(1., &p, &mut x);
    x
}

fn random_dir(rng: &mut Xoshiro256StarStar, dims: &[BlockDim]) -> BlockVec<f64>
{
    let mut p = BlockVec::new(dims);
    for b in p.blocks_mut() {
        match b {
            saiteki::Block::Orthant(v) | saiteki::Block::Quadratic(v) => {
                for u in v.iter_mut() {
                    *u = rng.gen::<f64>() - 0.5;
                }
            },
            saiteki::Block::Semidefinite {n, a} => {
                let n = *n;
                for j in 0..n {
                    for i in 0..=j {
                        let v = rng.gen::<f64>() - 0.5;
                        a[i + n * j] = v;
                        a[j + n * i] = v;
                    }
                }
            },
        }
    }
    p
}

const DIMS: &[BlockDim] = &[
    BlockDim::Orthant(3),
    BlockDim::Quadratic(3),
    BlockDim::Semidefinite(3),
];

//

#[test]
fn test_identity_element()
{
    let mut rng = Xoshiro256StarStar::seed_from_u64(0);
    let x = interior_point(&mut rng, DIMS);

    let mut e = BlockVec::new(DIMS);
    Z::id(&mut e);

    let mut xe = Z::create(&x);
    Z::prod(&x, &e, &mut xe);
    entries_close(&xe, &x, 1e-14);
}

#[test]
fn test_linv_inverts_the_product()
{
    let mut rng = Xoshiro256StarStar::seed_from_u64(1);

    for _ in 0..10 {
        let x = interior_point(&mut rng, DIMS);
        let y = random_dir(&mut rng, DIMS);

        // L(x)^{-1} (x o y) = y
        let mut xy = Z::create(&x);
        Z::prod(&x, &y, &mut xy);
        let mut back = Z::create(&x);
        Z::linv(&x, &xy, &mut back);
        entries_close(&back, &y, 1e-10);
    }
}

#[test]
fn test_barrier_values()
{
    // Orthant: sum of logs.
    let mut x = BlockVec::new(&[BlockDim::Orthant(2)]);
    x.vec_mut(0)[0] = 2.;
    x.vec_mut(0)[1] = 0.5;
    assert_float_eq!(Z::barr(&x), 0., abs <= 1e-14);

    x.vec_mut(0)[1] = -0.5;
    assert!(Z::barr(&x).is_nan());

    // Second-order: log of x0^2 - ||xb||^2.
    let mut q = BlockVec::new(&[BlockDim::Quadratic(3)]);
    q.vec_mut(0)[0] = 2.;
    q.vec_mut(0)[1] = 1.;
    q.vec_mut(0)[2] = 1.;
    assert_float_eq!(Z::barr(&q), 2f64.ln(), abs <= 1e-14);

    // Semidefinite: log det.
    let mut s = BlockVec::new(&[BlockDim::Semidefinite(2)]);
    let a = s.sdp_mut(0);
    a[0] = 2.;
    a[1] = 0.5;
    a[2] = 0.5;
    a[3] = 1.;
    assert_float_eq!(Z::barr(&s), 1.75f64.ln(), abs <= 1e-12);

    // Losing definiteness loses the barrier.
    s.sdp_mut(0)[3] = 0.1;
    assert!(Z::barr(&s).is_nan());
}

#[test]
fn test_srch_boundaries()
{
    // Orthant: the tightest coordinate wins.
    let mut x = BlockVec::new(&[BlockDim::Orthant(2)]);
    x.vec_mut(0)[0] = 1.;
    x.vec_mut(0)[1] = 4.;
    let mut dx = BlockVec::new(&[BlockDim::Orthant(2)]);
    dx.vec_mut(0)[0] = -0.5;
    dx.vec_mut(0)[1] = -1.;
    assert_float_eq!(Z::srch(&x, &dx), 2., abs <= 1e-14);

    // Every direction feasible: the unbounded sentinel.
    dx.vec_mut(0)[0] = 1.;
    dx.vec_mut(0)[1] = 0.;
    assert!(Z::srch(&x, &dx) < 0.);

    // Second-order cone, leaving through the boundary at t = 1.
    let mut q = BlockVec::new(&[BlockDim::Quadratic(3)]);
    q.vec_mut(0)[0] = 1.;
    let mut dq = BlockVec::new(&[BlockDim::Quadratic(3)]);
    dq.vec_mut(0)[1] = 1.;
    assert_float_eq!(Z::srch(&q, &dq), 1., abs <= 1e-12);

    // Semidefinite: x + t (-e) exits at the smallest eigenvalue.
    let mut s = BlockVec::new(&[BlockDim::Semidefinite(2)]);
    let a = s.sdp_mut(0);
    a[0] = 2.;
    a[1] = 0.5;
    a[2] = 0.5;
    a[3] = 1.;
    let mut ds = BlockVec::new(&[BlockDim::Semidefinite(2)]);
    Z::id(&mut ds);
    Z::scal(-1., &mut ds);
    let lam_min = (3. - 2f64.sqrt()) / 2.;
    assert_float_eq!(Z::srch(&s, &ds), lam_min, abs <= 1e-10);
}

//

// The semidefinite constraint of the simple SDP problem,
// h(x0, x1) = [x1 x0; x0 1].
struct MatrixIneq;

impl VectorFn<saiteki::Rn<f64>, Z> for MatrixIneq
{
    fn eval(&self, x: &Vec<f64>, y: &mut BlockVec<f64>) -> Result<(), OptError>
    {
        let a = y.sdp_mut(0);
        a[0] = x[1];
        a[1] = x[0];
        a[2] = x[0];
        a[3] = 1.;
        Ok(())
    }

    fn p(&self, _x: &Vec<f64>, dx: &Vec<f64>, y: &mut BlockVec<f64>)
        -> Result<(), OptError>
    {
        let a = y.sdp_mut(0);
        a[0] = dx[1];
        a[1] = dx[0];
        a[2] = dx[0];
        a[3] = 0.;
        Ok(())
    }

    fn ps(&self, _x: &Vec<f64>, dy: &BlockVec<f64>, z: &mut Vec<f64>)
        -> Result<(), OptError>
    {
        let a = dy.sdp(0);
        z[0] = a[1] + a[2];
        z[1] = a[0];
        Ok(())
    }

    fn pps(
        &self,
        _x: &Vec<f64>,
        _dx: &Vec<f64>,
        _dy: &BlockVec<f64>,
        z: &mut Vec<f64>,
    ) -> Result<(), OptError>
    {
        for u in z.iter_mut() {
            *u = 0.;
        }
        Ok(())
    }
}

#[test]
fn test_jacobian_adjoint_identity()
{
    type X = saiteki::Rn<f64>;

    let mut rng = Xoshiro256StarStar::seed_from_u64(2);
    let h = MatrixIneq;
    let dims = [BlockDim::Semidefinite(2)];

    for _ in 0..10 {
        let x = vec![rng.gen::<f64>(), rng.gen::<f64>()];
        let dx = vec![rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5];
        let dy = random_dir(&mut rng, &dims);

        // <h'(x) dx, dy> = <dx, h'(x)* dy>
        let mut p_dx = BlockVec::new(&dims);
        h.p(&x, &dx, &mut p_dx).unwrap();
        let mut ps_dy = vec![0.; 2];
        h.ps(&x, &dy, &mut ps_dy).unwrap();

        assert_float_eq!(
            Z::innr(&p_dx, &dy), X::innr(&dx, &ps_dy), abs <= 1e-12);
    }
}
