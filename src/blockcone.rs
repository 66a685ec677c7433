//! Block symmetric-cone space
//!
//! A product of nonnegative-orthant, second-order, and semidefinite blocks,
//! carrying the Euclidean Jordan algebra each block induces.  This is the
//! built-in constraint space for the inequality-constrained engine; sparse
//! or otherwise specialized representations plug in through the same
//! traits.

use num_traits::Float;
use core::marker::PhantomData;
use crate::solver::{Cone, HilbertSpace};

/// Shape of one block of a [`BlockVec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDim
{
    /// Nonnegative orthant of the given dimension.
    Orthant(usize),
    /// Second-order (Lorentz) cone of the given dimension, counting the
    /// leading entry.
    Quadratic(usize),
    /// Cone of positive semidefinite matrices of the given order.
    Semidefinite(usize),
}

/// One block of a [`BlockVec`].
#[derive(Debug, Clone)]
pub enum Block<F>
{
    Orthant(Vec<F>),
    Quadratic(Vec<F>),
    /// Dense column-major `n * n` storage of a symmetric matrix.
    Semidefinite
    {
        n: usize,
        a: Vec<F>,
    },
}

/// Element of the block symmetric-cone space.
#[derive(Debug, Clone)]
pub struct BlockVec<F>
{
    blocks: Vec<Block<F>>,
}

impl<F: Float> BlockVec<F>
{
    /// Creates a zero element of the given block structure.
    pub fn new(dims: &[BlockDim]) -> Self
    {
        let blocks = dims.iter().map(|d| {
            match *d {
                BlockDim::Orthant(n) => Block::Orthant(vec![F::zero(); n]),
                BlockDim::Quadratic(n) => Block::Quadratic(vec![F::zero(); n]),
                BlockDim::Semidefinite(n) => Block::Semidefinite {
                    n,
                    a: vec![F::zero(); n * n],
                },
            }
        }).collect();

        BlockVec {blocks}
    }

    /// The blocks, in order.
    pub fn blocks(&self) -> &[Block<F>]
    {
        &self.blocks
    }

    /// The blocks, in order, mutable.
    pub fn blocks_mut(&mut self) -> &mut [Block<F>]
    {
        &mut self.blocks
    }

    /// Dense column-major storage of a semidefinite block.
    ///
    /// Panics when the block is not semidefinite.
    pub fn sdp(&self, blk: usize) -> &[F]
    {
        match &self.blocks[blk] {
            Block::Semidefinite {a, ..} => a,
            _ => panic!("block {} is not semidefinite", blk),
        }
    }

    /// Dense column-major storage of a semidefinite block, mutable.
    pub fn sdp_mut(&mut self, blk: usize) -> &mut [F]
    {
        match &mut self.blocks[blk] {
            Block::Semidefinite {a, ..} => a,
            _ => panic!("block {} is not semidefinite", blk),
        }
    }

    /// Entries of an orthant or second-order block.
    pub fn vec(&self, blk: usize) -> &[F]
    {
        match &self.blocks[blk] {
            Block::Orthant(v) | Block::Quadratic(v) => v,
            _ => panic!("block {} is not a vector block", blk),
        }
    }

    /// Entries of an orthant or second-order block, mutable.
    pub fn vec_mut(&mut self, blk: usize) -> &mut [F]
    {
        match &mut self.blocks[blk] {
            Block::Orthant(v) | Block::Quadratic(v) => v,
            _ => panic!("block {} is not a vector block", blk),
        }
    }

    fn entries(&self) -> impl Iterator<Item = &F>
    {
        self.blocks.iter().flat_map(|b| {
            match b {
                Block::Orthant(v) | Block::Quadratic(v) => v.iter(),
                Block::Semidefinite {a, ..} => a.iter(),
            }
        })
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut F>
    {
        self.blocks.iter_mut().flat_map(|b| {
            match b {
                Block::Orthant(v) | Block::Quadratic(v) => v.iter_mut(),
                Block::Semidefinite {a, ..} => a.iter_mut(),
            }
        })
    }
}

//

// Dense column-major helpers for the semidefinite blocks.

fn mat_mul<F: Float>(n: usize, a: &[F], b: &[F], c: &mut [F])
{
    for j in 0..n {
        for i in 0..n {
            let mut sum = F::zero();
            for k in 0..n {
                sum = sum + a[i + n * k] * b[k + n * j];
            }
            c[i + n * j] = sum;
        }
    }
}

fn mat_tmul<F: Float>(n: usize, a: &[F], b: &[F], c: &mut [F])
{
    // c = a^T b
    for j in 0..n {
        for i in 0..n {
            let mut sum = F::zero();
            for k in 0..n {
                sum = sum + a[k + n * i] * b[k + n * j];
            }
            c[i + n * j] = sum;
        }
    }
}

// In-place lower Cholesky factor of a symmetric positive definite matrix;
// None when the matrix is not positive definite.
fn cholesky<F: Float>(n: usize, a: &[F]) -> Option<Vec<F>>
{
    let f0 = F::zero();
    let mut l = vec![f0; n * n];

    for j in 0..n {
        let mut d = a[j + n * j];
        for k in 0..j {
            d = d - l[j + n * k] * l[j + n * k];
        }
        if !(d > f0) {
            return None;
        }
        let ljj = d.sqrt();
        l[j + n * j] = ljj;
        for i in j + 1..n {
            let mut v = a[i + n * j];
            for k in 0..j {
                v = v - l[i + n * k] * l[j + n * k];
            }
            l[i + n * j] = v / ljj;
        }
    }

    Some(l)
}

// Solves L w = b in place for every column of b, L lower triangular.
fn forward_subst<F: Float>(n: usize, l: &[F], b: &mut [F])
{
    for j in 0..n {
        for i in 0..n {
            let mut v = b[i + n * j];
            for k in 0..i {
                v = v - l[i + n * k] * b[k + n * j];
            }
            b[i + n * j] = v / l[i + n * i];
        }
    }
}

fn transpose<F: Float>(n: usize, a: &mut [F])
{
    for j in 0..n {
        for i in 0..j {
            a.swap(i + n * j, j + n * i);
        }
    }
}

// Cyclic Jacobi sweep diagonalizing a symmetric matrix in place; the
// accumulated rotations land in `q` when given.
fn jacobi_sym<F: Float>(n: usize, a: &mut [F], mut q: Option<&mut [F]>)
{
    let f0 = F::zero();
    let f1 = F::one();
    let f2 = f1 + f1;
    let eps = F::from(1e-12).unwrap_or_else(F::epsilon);
    let tol = eps * eps;

    if let Some(q) = q.as_deref_mut() {
        for v in q.iter_mut() {
            *v = f0;
        }
        for i in 0..n {
            q[i + n * i] = f1;
        }
    }

    let mut conv = false;
    let mut sweeps = 0;
    while !conv && sweeps < 64 {
        conv = true;
        sweeps += 1;

        for i in 0..n {
            for j in i + 1..n {
                let aii = a[i + n * i];
                let ajj = a[j + n * j];
                let d = a[i + n * j];

                if d * d > tol * aii.abs() * ajj.abs() && d * d > tol {
                    conv = false;

                    let zeta = (ajj - aii) / (f2 * d);
                    let t = if zeta > f0 {
                        f1 / (zeta + (f1 + zeta * zeta).sqrt())
                    }
                    else {
                        -f1 / (-zeta + (f1 + zeta * zeta).sqrt())
                    };
                    let c = (f1 + t * t).sqrt().recip();
                    let s = c * t;

                    for k in 0..n {
                        let aki = a[k + n * i];
                        let akj = a[k + n * j];
                        a[k + n * i] = c * aki - s * akj;
                        a[k + n * j] = s * aki + c * akj;
                    }
                    for k in 0..n {
                        let aik = a[i + n * k];
                        let ajk = a[j + n * k];
                        a[i + n * k] = c * aik - s * ajk;
                        a[j + n * k] = s * aik + c * ajk;
                    }

                    if let Some(q) = q.as_deref_mut() {
                        for k in 0..n {
                            let qki = q[k + n * i];
                            let qkj = q[k + n * j];
                            q[k + n * i] = c * qki - s * qkj;
                            q[k + n * j] = s * qki + c * qkj;
                        }
                    }
                }
            }
        }
    }

    if !conv {
        log::warn!("jacobi sweep cap reached before convergence");
    }
}

// Smallest positive root of a t^2 + b t + c = 0, or None.
fn smallest_positive_root<F: Float>(a: F, b: F, c: F) -> Option<F>
{
    let f0 = F::zero();
    let f2 = F::one() + F::one();
    let f4 = f2 + f2;
    let eps = F::epsilon();

    if a.abs() <= eps * (b.abs() + c.abs()) {
        if b < f0 {
            return Some(-c / b);
        }
        return None;
    }

    let disc = b * b - f4 * a * c;
    if disc < f0 {
        return None;
    }
    let sq = disc.sqrt();
    let r1 = (-b - sq) / (f2 * a);
    let r2 = (-b + sq) / (f2 * a);
    let (lo, hi) = if r1 <= r2 {(r1, r2)} else {(r2, r1)};

    if lo > f0 {
        Some(lo)
    }
    else if hi > f0 {
        Some(hi)
    }
    else {
        None
    }
}

//

/// `num::Float`-generic block symmetric-cone space.
#[derive(Clone)]
pub struct BlockCone<F>
{
    ph_f: PhantomData<F>,
}

impl<F: Float> HilbertSpace for BlockCone<F>
{
    type F = F;
    type Vector = BlockVec<F>;

    fn create(proto: &BlockVec<F>) -> BlockVec<F>
    {
        let blocks = proto.blocks.iter().map(|b| {
            match b {
                Block::Orthant(v) => Block::Orthant(vec![F::zero(); v.len()]),
                Block::Quadratic(v) => Block::Quadratic(vec![F::zero(); v.len()]),
                Block::Semidefinite {n, ..} => Block::Semidefinite {
                    n: *n,
                    a: vec![F::zero(); n * n],
                },
            }
        }).collect();

        BlockVec {blocks}
    }

    fn copy(x: &BlockVec<F>, y: &mut BlockVec<F>)
    {
        for (u, v) in x.entries().zip(y.entries_mut()) {
            *v = *u;
        }
    }

    fn scal(alpha: F, x: &mut BlockVec<F>)
    {
        for u in x.entries_mut() {
            *u = alpha * *u;
        }
    }

    fn zero(x: &mut BlockVec<F>)
    {
        for u in x.entries_mut() {
            *u = F::zero();
        }
    }

    fn axpy(alpha: F, x: &BlockVec<F>, y: &mut BlockVec<F>)
    {
        for (u, v) in x.entries().zip(y.entries_mut()) {
            *v = *v + alpha * *u;
        }
    }

    fn innr(x: &BlockVec<F>, y: &BlockVec<F>) -> F
    {
        let mut sum = F::zero();
        for (u, v) in x.entries().zip(y.entries()) {
            sum = sum + *u * *v;
        }
        sum
    }
}

impl<F: Float> Cone for BlockCone<F>
{
    fn prod(x: &BlockVec<F>, y: &BlockVec<F>, z: &mut BlockVec<F>)
    {
        let f2 = F::one() + F::one();

        for ((bx, by), bz) in x.blocks.iter().zip(y.blocks.iter())
            .zip(z.blocks.iter_mut())
        {
            match (bx, by, bz) {
                (Block::Orthant(vx), Block::Orthant(vy), Block::Orthant(vz)) => {
                    for ((u, v), w) in vx.iter().zip(vy).zip(vz.iter_mut()) {
                        *w = *u * *v;
                    }
                },
                (Block::Quadratic(vx), Block::Quadratic(vy),
                    Block::Quadratic(vz)) =>
                {
                    let mut dot = F::zero();
                    for (u, v) in vx.iter().zip(vy) {
                        dot = dot + *u * *v;
                    }
                    vz[0] = dot;
                    for k in 1..vx.len() {
                        vz[k] = vx[0] * vy[k] + vy[0] * vx[k];
                    }
                },
                (Block::Semidefinite {n, a: ax},
                    Block::Semidefinite {a: ay, ..},
                    Block::Semidefinite {a: az, ..}) =>
                {
                    let n = *n;
                    let mut xy = vec![F::zero(); n * n];
                    let mut yx = vec![F::zero(); n * n];
                    mat_mul(n, ax, ay, &mut xy);
                    mat_mul(n, ay, ax, &mut yx);
                    for (w, (p, q)) in az.iter_mut().zip(xy.iter().zip(yx.iter()))
                    {
                        *w = (*p + *q) / f2;
                    }
                },
                _ => panic!("mismatched block structure"),
            }
        }
    }

    fn id(x: &mut BlockVec<F>)
    {
        let f0 = F::zero();
        let f1 = F::one();

        for b in x.blocks.iter_mut() {
            match b {
                Block::Orthant(v) => {
                    for u in v.iter_mut() {
                        *u = f1;
                    }
                },
                Block::Quadratic(v) => {
                    v[0] = f1;
                    for u in v[1..].iter_mut() {
                        *u = f0;
                    }
                },
                Block::Semidefinite {n, a} => {
                    for u in a.iter_mut() {
                        *u = f0;
                    }
                    for i in 0..*n {
                        a[i + *n * i] = f1;
                    }
                },
            }
        }
    }

    fn linv(x: &BlockVec<F>, y: &BlockVec<F>, z: &mut BlockVec<F>)
    {
        for ((bx, by), bz) in x.blocks.iter().zip(y.blocks.iter())
            .zip(z.blocks.iter_mut())
        {
            match (bx, by, bz) {
                (Block::Orthant(vx), Block::Orthant(vy), Block::Orthant(vz)) => {
                    for ((u, v), w) in vx.iter().zip(vy).zip(vz.iter_mut()) {
                        *w = *v / *u;
                    }
                },
                (Block::Quadratic(vx), Block::Quadratic(vy),
                    Block::Quadratic(vz)) =>
                {
                    // Arrow-matrix inverse in closed form
                    let x0 = vx[0];
                    let mut nrm2 = F::zero();
                    let mut dot = F::zero();
                    for k in 1..vx.len() {
                        nrm2 = nrm2 + vx[k] * vx[k];
                        dot = dot + vx[k] * vy[k];
                    }
                    let al = x0 * x0 - nrm2;

                    vz[0] = (x0 * vy[0] - dot) / al;
                    for k in 1..vx.len() {
                        vz[k] = (-vy[0] * vx[k] + dot * vx[k] / x0) / al
                            + vy[k] / x0;
                    }
                },
                (Block::Semidefinite {n, a: ax},
                    Block::Semidefinite {a: ay, ..},
                    Block::Semidefinite {a: az, ..}) =>
                {
                    // Sylvester solve X Z + Z X = 2 Y through the spectral
                    // decomposition of X.
                    let n = *n;
                    let f2 = F::one() + F::one();
                    let mut w = ax.clone();
                    let mut q = vec![F::zero(); n * n];
                    jacobi_sym(n, &mut w, Some(&mut q));

                    let mut t = vec![F::zero(); n * n];
                    let mut yt = vec![F::zero(); n * n];
                    mat_tmul(n, &q, ay, &mut t);
                    mat_mul(n, &t, &q, &mut yt);

                    for j in 0..n {
                        for i in 0..n {
                            let li = w[i + n * i];
                            let lj = w[j + n * j];
                            yt[i + n * j] = f2 * yt[i + n * j] / (li + lj);
                        }
                    }

                    mat_mul(n, &q, &yt, &mut t);
                    let mut qt = q;
                    transpose(n, &mut qt);
                    mat_mul(n, &t, &qt, az);
                },
                _ => panic!("mismatched block structure"),
            }
        }
    }

    fn barr(x: &BlockVec<F>) -> F
    {
        let f0 = F::zero();
        let f2 = F::one() + F::one();
        let mut sum = f0;

        for b in x.blocks.iter() {
            match b {
                Block::Orthant(v) => {
                    for u in v.iter() {
                        if !(*u > f0) {
                            return F::nan();
                        }
                        sum = sum + u.ln();
                    }
                },
                Block::Quadratic(v) => {
                    let mut nrm2 = f0;
                    for u in v[1..].iter() {
                        nrm2 = nrm2 + *u * *u;
                    }
                    let al = v[0] * v[0] - nrm2;
                    if !(v[0] > f0 && al > f0) {
                        return F::nan();
                    }
                    sum = sum + al.ln();
                },
                Block::Semidefinite {n, a} => {
                    match cholesky(*n, a) {
                        Some(l) => {
                            for i in 0..*n {
                                sum = sum + f2 * l[i + *n * i].ln();
                            }
                        },
                        None => return F::nan(),
                    }
                },
            }
        }

        sum
    }

    fn srch(x: &BlockVec<F>, dx: &BlockVec<F>) -> F
    {
        let f0 = F::zero();
        let f1 = F::one();
        let f2 = f1 + f1;
        let mut best: Option<F> = None;

        let mut consider = |t: F| {
            best = Some(match best {
                Some(b) if b <= t => b,
                _ => t,
            });
        };

        for (bx, bd) in x.blocks.iter().zip(dx.blocks.iter()) {
            match (bx, bd) {
                (Block::Orthant(vx), Block::Orthant(vd)) => {
                    for (u, d) in vx.iter().zip(vd) {
                        if *d < f0 {
                            consider(-*u / *d);
                        }
                    }
                },
                (Block::Quadratic(vx), Block::Quadratic(vd)) => {
                    // Boundary crossing of the quadratic
                    // (x0 + t d0)^2 - ||xb + t db||^2 = 0.
                    let mut a = vd[0] * vd[0];
                    let mut b = f2 * vx[0] * vd[0];
                    let mut c = vx[0] * vx[0];
                    for k in 1..vx.len() {
                        a = a - vd[k] * vd[k];
                        b = b - f2 * vx[k] * vd[k];
                        c = c - vx[k] * vx[k];
                    }
                    if let Some(t) = smallest_positive_root(a, b, c) {
                        consider(t);
                    }
                },
                (Block::Semidefinite {n, a: ax},
                    Block::Semidefinite {a: ad, ..}) =>
                {
                    let n = *n;
                    match cholesky(n, ax) {
                        Some(l) => {
                            // m = inv(L) D inv(L)^T; the exit time is the
                            // reciprocal of its most negative eigenvalue.
                            let mut m = ad.clone();
                            forward_subst(n, &l, &mut m);
                            transpose(n, &mut m);
                            forward_subst(n, &l, &mut m);
                            jacobi_sym(n, &mut m, None);
                            let mut lam_min = F::infinity();
                            for i in 0..n {
                                lam_min = lam_min.min(m[i + n * i]);
                            }
                            if lam_min < f0 {
                                consider(-lam_min.recip());
                            }
                        },
                        None => consider(f0),
                    }
                },
                _ => panic!("mismatched block structure"),
            }
        }

        best.unwrap_or(-f1)
    }
}
