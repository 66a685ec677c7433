//! Quasi-Newton operators
//!
//! All of these act through a bounded history of step differences
//! \\(s_i\\) and gradient differences \\(y_i\\) owned by the optimizer
//! state.  An operator borrows the history for the duration of one apply or
//! one subproblem solve; it never copies it, so the action is always
//! consistent with the history currently in the state.

use std::collections::VecDeque;
use num_traits::{Float, Zero};
use crate::solver::{HilbertSpace, OperatorX, OptError, OperatorKind, ScalarFn};

fn check_pairs<X: HilbertSpace>(
    old_y: &VecDeque<X::Vector>,
    old_s: &VecDeque<X::Vector>,
) -> Result<(), OptError>
{
    if old_y.len() != old_s.len() {
        return Err(OptError::InvalidHistory(
            "the stored gradient and step differences differ in number"));
    }
    for (y, s) in old_y.iter().zip(old_s.iter()) {
        if X::innr(y, s) <= X::F::zero() {
            return Err(OptError::InvalidHistory(
                "detected a stored (s, y) pair with nonpositive inner product"));
        }
    }

    Ok(())
}

//

/// The BFGS Hessian approximation.
///
/// This is the action of the true Hessian approximation
/// \\(B\_{i+1} = B_i - \frac{B_i s_i s_i^T B_i}{\langle s_i, B_i s_i\rangle}
/// + \frac{y_i y_i^T}{\langle y_i, s_i\rangle}\\),
/// not of its inverse.  The apply maintains the vectors \\(B_i s_j\\) in a
/// workspace that is updated in place as \\(i\\) advances.
pub struct Bfgs<'a, X: HilbertSpace>
{
    old_y: &'a VecDeque<X::Vector>,
    old_s: &'a VecDeque<X::Vector>,
}

impl<'a, X: HilbertSpace> Bfgs<'a, X>
{
    /// Creates an instance borrowing the state's history, newest first.
    pub fn new(old_y: &'a VecDeque<X::Vector>, old_s: &'a VecDeque<X::Vector>)
        -> Self
    {
        Bfgs {old_y, old_s}
    }
}

impl<'a, X: HilbertSpace> OperatorX<X, X> for Bfgs<'a, X>
{
    fn apply(&self, p: &X::Vector, result: &mut X::Vector) -> Result<(), OptError>
    {
        check_pairs::<X>(self.old_y, self.old_s)?;

        X::copy(p, result);
        let k = self.old_s.len();
        if k == 0 {
            return Ok(());
        }

        // work[j] holds B_i s_j; starts at B_1 s_j = s_j.
        let mut work: Vec<X::Vector> = Vec::with_capacity(k);
        for s in self.old_s.iter() {
            let mut w = X::create(p);
            X::copy(s, &mut w);
            work.push(w);
        }

        // The history is newest first, so i runs from the back (oldest pair,
        // outer index 1) toward the front.
        let mut i = k - 1;
        loop {
            let si = &self.old_s[i];
            let yi = &self.old_y[i];

            let inner_yi_si = X::innr(yi, si);
            let inner_yi_p = X::innr(yi, p);
            {
                let bisi = &work[i];
                let inner_bisi_si = X::innr(bisi, si);
                let inner_si_bip = X::innr(si, result);
                X::axpy(-inner_si_bip / inner_bisi_si, bisi, result);
            }
            X::axpy(inner_yi_p / inner_yi_si, yi, result);

            if i == 0 {
                break;
            }

            // Advance the workspace: B_i s_j -> B_{i+1} s_j for every j
            // newer than i.
            let (head, tail) = work.split_at_mut(i);
            let bisi = &tail[0];
            let inner_bisi_si = X::innr(bisi, si);
            for (j, bisj) in head.iter_mut().enumerate() {
                let sj = &self.old_s[j];
                let inner_si_bisj = X::innr(si, bisj);
                let inner_yi_sj = X::innr(yi, sj);
                X::axpy(-inner_si_bisj / inner_bisi_si, bisi, bisj);
                X::axpy(inner_yi_sj / inner_yi_si, yi, bisj);
            }

            i -= 1;
        }

        Ok(())
    }
}

//

/// The SR1 Hessian approximation.
///
/// Same workspace structure as [`Bfgs`], but the rank-one update
/// \\(B\_{i+1} = B_i + \frac{(y_i - B_i s_i)(y_i - B_i s_i)^T}
/// {\langle y_i - B_i s_i, s_i\rangle}\\).
/// No positivity requirement on the stored pairs.
pub struct Sr1<'a, X: HilbertSpace>
{
    old_y: &'a VecDeque<X::Vector>,
    old_s: &'a VecDeque<X::Vector>,
}

impl<'a, X: HilbertSpace> Sr1<'a, X>
{
    /// Creates an instance borrowing the state's history, newest first.
    pub fn new(old_y: &'a VecDeque<X::Vector>, old_s: &'a VecDeque<X::Vector>)
        -> Self
    {
        Sr1 {old_y, old_s}
    }
}

impl<'a, X: HilbertSpace> OperatorX<X, X> for Sr1<'a, X>
{
    fn apply(&self, p: &X::Vector, result: &mut X::Vector) -> Result<(), OptError>
    {
        if self.old_y.len() != self.old_s.len() {
            return Err(OptError::InvalidHistory(
                "the stored gradient and step differences differ in number"));
        }

        X::copy(p, result);
        let k = self.old_s.len();
        if k == 0 {
            return Ok(());
        }

        let mut work: Vec<X::Vector> = Vec::with_capacity(k);
        for s in self.old_s.iter() {
            let mut w = X::create(p);
            X::copy(s, &mut w);
            work.push(w);
        }

        let mut i = k - 1;
        loop {
            let si = &self.old_s[i];
            let yi = &self.old_y[i];

            let inner_yi_si = X::innr(yi, si);
            let inner_yi_p = X::innr(yi, p);
            {
                let bisi = &work[i];
                let inner_bisi_si = X::innr(bisi, si);
                let inner_bisi_p = X::innr(bisi, p);
                let alpha = (inner_yi_p - inner_bisi_p)
                    / (inner_yi_si - inner_bisi_si);
                X::axpy(alpha, yi, result);
                X::axpy(-alpha, bisi, result);
            }

            if i == 0 {
                break;
            }

            let (head, tail) = work.split_at_mut(i);
            let bisi = &tail[0];
            let inner_bisi_si = X::innr(bisi, si);
            for (j, bisj) in head.iter_mut().enumerate() {
                let sj = &self.old_s[j];
                let inner_yi_sj = X::innr(yi, sj);
                let inner_bisi_sj = X::innr(bisi, sj);
                let beta = (inner_yi_sj - inner_bisi_sj)
                    / (inner_yi_si - inner_bisi_si);
                X::axpy(beta, yi, bisj);
                X::axpy(-beta, bisi, bisj);
            }

            i -= 1;
        }

        Ok(())
    }
}

//

/// The inverse BFGS operator, by the two-loop recursion with
/// \\(H_0 = I\\).
pub struct InvBfgs<'a, X: HilbertSpace>
{
    old_y: &'a VecDeque<X::Vector>,
    old_s: &'a VecDeque<X::Vector>,
}

impl<'a, X: HilbertSpace> InvBfgs<'a, X>
{
    /// Creates an instance borrowing the state's history, newest first.
    pub fn new(old_y: &'a VecDeque<X::Vector>, old_s: &'a VecDeque<X::Vector>)
        -> Self
    {
        InvBfgs {old_y, old_s}
    }
}

impl<'a, X: HilbertSpace> OperatorX<X, X> for InvBfgs<'a, X>
{
    fn apply(&self, p: &X::Vector, result: &mut X::Vector) -> Result<(), OptError>
    {
        check_pairs::<X>(self.old_y, self.old_s)?;

        X::copy(p, result);
        let k = self.old_y.len();
        let mut alpha = vec![X::F::zero(); k];
        let mut rho = vec![X::F::zero(); k];

        // Forward over the pairs, newest first.
        for i in 0..k {
            let yi = &self.old_y[i];
            let si = &self.old_s[i];
            rho[i] = X::innr(yi, si).recip();
            alpha[i] = rho[i] * X::innr(si, result);
            X::axpy(-alpha[i], yi, result);
        }

        // Backward, oldest first, completes H_k p.
        for i in (0..k).rev() {
            let yi = &self.old_y[i];
            let si = &self.old_s[i];
            let beta = rho[i] * X::innr(yi, result);
            X::axpy(alpha[i] - beta, si, result);
        }

        Ok(())
    }
}

//

/// The inverse SR1 operator.
///
/// Uses the direct SR1 recursion with the roles of the gradient and step
/// differences swapped.
pub struct InvSr1<'a, X: HilbertSpace>
{
    sr1: Sr1<'a, X>,
}

impl<'a, X: HilbertSpace> InvSr1<'a, X>
{
    /// Creates an instance borrowing the state's history, newest first.
    pub fn new(old_y: &'a VecDeque<X::Vector>, old_s: &'a VecDeque<X::Vector>)
        -> Self
    {
        InvSr1 {sr1: Sr1::new(old_s, old_y)}
    }
}

impl<'a, X: HilbertSpace> OperatorX<X, X> for InvSr1<'a, X>
{
    fn apply(&self, p: &X::Vector, result: &mut X::Vector) -> Result<(), OptError>
    {
        self.sr1.apply(p, result)
    }
}

//

/// The scaled identity approximation, \\((\\|g\\| / \delta\_{max})\\,I\\).
pub struct ScaledIdentity<F: Float>
{
    scale: F,
}

impl<F: Float> ScaledIdentity<F>
{
    /// Creates an instance.
    ///
    /// * `norm_g` is the current gradient norm.
    /// * `delta_max` is the maximum trust-region radius.
    pub fn new(norm_g: F, delta_max: F) -> Self
    {
        ScaledIdentity {scale: norm_g / delta_max}
    }
}

impl<X: HilbertSpace> OperatorX<X, X> for ScaledIdentity<X::F>
{
    fn apply(&self, x: &X::Vector, y: &mut X::Vector) -> Result<(), OptError>
    {
        X::copy(x, y);
        X::scal(self.scale, y);
        Ok(())
    }
}

//

/// The Hessian approximation selected by the state, as one operator.
pub enum HessOp<'a, X: HilbertSpace>
{
    Identity,
    ScaledIdentity(ScaledIdentity<X::F>),
    Bfgs(Bfgs<'a, X>),
    Sr1(Sr1<'a, X>),
    /// Dispatches to the `hessvec` oracle of the objective at `x`.
    External
    {
        f: &'a dyn ScalarFn<X>,
        x: &'a X::Vector,
    },
}

impl<'a, X: HilbertSpace> HessOp<'a, X>
{
    /// Builds the Hessian approximation for one subproblem solve.
    ///
    /// Returns the operator, or [`OptError::Config`] when the selected kind
    /// is not usable as a Hessian approximation.
    pub fn build(
        kind: OperatorKind,
        old_y: &'a VecDeque<X::Vector>,
        old_s: &'a VecDeque<X::Vector>,
        norm_g: X::F,
        delta_max: X::F,
        f: &'a dyn ScalarFn<X>,
        x: &'a X::Vector,
    ) -> Result<Self, OptError>
    {
        match kind {
            OperatorKind::Identity => Ok(HessOp::Identity),
            OperatorKind::ScaledIdentity =>
                Ok(HessOp::ScaledIdentity(ScaledIdentity::new(norm_g, delta_max))),
            OperatorKind::BFGS => Ok(HessOp::Bfgs(Bfgs::new(old_y, old_s))),
            OperatorKind::SR1 => Ok(HessOp::Sr1(Sr1::new(old_y, old_s))),
            OperatorKind::External => Ok(HessOp::External {f, x}),
            _ => Err(OptError::Config(format!(
                "not a valid Hessian approximation: {}", kind.as_str()))),
        }
    }
}

impl<'a, X: HilbertSpace> OperatorX<X, X> for HessOp<'a, X>
{
    fn apply(&self, p: &X::Vector, result: &mut X::Vector) -> Result<(), OptError>
    {
        match self {
            HessOp::Identity => {
                X::copy(p, result);
                Ok(())
            },
            HessOp::ScaledIdentity(op) =>
                OperatorX::<X, X>::apply(op, p, result),
            HessOp::Bfgs(op) => op.apply(p, result),
            HessOp::Sr1(op) => op.apply(p, result),
            HessOp::External {f, x} => f.hessvec(x, p, result),
        }
    }
}

//

/// The preconditioner selected by the state, as one operator.
pub enum PrecondOp<'a, X: HilbertSpace>
{
    Identity,
    InvBfgs(InvBfgs<'a, X>),
    InvSr1(InvSr1<'a, X>),
    External(&'a dyn OperatorX<X, X>),
}

impl<'a, X: HilbertSpace> PrecondOp<'a, X>
{
    /// Builds the preconditioner for one subproblem solve.
    ///
    /// Returns the operator; selecting `External` without providing one
    /// fails with [`OptError::UnsupportedOperator`].
    pub fn build(
        kind: OperatorKind,
        old_y: &'a VecDeque<X::Vector>,
        old_s: &'a VecDeque<X::Vector>,
        external: Option<&'a dyn OperatorX<X, X>>,
    ) -> Result<Self, OptError>
    {
        match kind {
            OperatorKind::Identity => Ok(PrecondOp::Identity),
            OperatorKind::InvBFGS =>
                Ok(PrecondOp::InvBfgs(InvBfgs::new(old_y, old_s))),
            OperatorKind::InvSR1 =>
                Ok(PrecondOp::InvSr1(InvSr1::new(old_y, old_s))),
            OperatorKind::External => external.map(PrecondOp::External)
                .ok_or(OptError::UnsupportedOperator(
                    "an external preconditioner must be provided explicitly")),
            _ => Err(OptError::Config(format!(
                "not a valid preconditioner: {}", kind.as_str()))),
        }
    }
}

impl<'a, X: HilbertSpace> OperatorX<X, X> for PrecondOp<'a, X>
{
    fn apply(&self, p: &X::Vector, result: &mut X::Vector) -> Result<(), OptError>
    {
        match self {
            PrecondOp::Identity => {
                X::copy(p, result);
                Ok(())
            },
            PrecondOp::InvBfgs(op) => op.apply(p, result),
            PrecondOp::InvSr1(op) => op.apply(p, result),
            PrecondOp::External(op) => op.apply(p, result),
        }
    }
}

//
