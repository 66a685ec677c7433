//! Function oracles

use crate::solver::{HilbertSpace, OptError};

/// Scalar-valued function oracle, \\(f: X \to \mathbb{R}\\).
///
/// The engine only ever calls these three entry points; errors returned by
/// an implementor propagate out of the engine unchanged.
pub trait ScalarFn<X: HilbertSpace>
{
    /// Evaluate \\(f(x)\\).
    fn eval(&self, x: &X::Vector) -> Result<X::F, OptError>;

    /// Calculate the gradient, \\(g \leftarrow \nabla f(x)\\).
    fn grad(&self, x: &X::Vector, g: &mut X::Vector) -> Result<(), OptError>;

    /// Calculate the Hessian-vector product,
    /// \\(h\\_dx \leftarrow \nabla^2 f(x)\\,dx\\).
    ///
    /// The default is the identity action, which pairs with the internal
    /// Hessian approximations selected through
    /// [`crate::solver::OperatorKind`].
    fn hessvec(
        &self,
        x: &X::Vector,
        dx: &X::Vector,
        h_dx: &mut X::Vector,
    ) -> Result<(), OptError>
    {
        let _ = x;
        X::copy(dx, h_dx);
        Ok(())
    }
}

/// Vector-valued function oracle, \\(h: X \to Y\\).
pub trait VectorFn<X: HilbertSpace, Y: HilbertSpace<F = X::F>>
{
    /// Evaluate \\(y \leftarrow h(x)\\).
    fn eval(&self, x: &X::Vector, y: &mut Y::Vector) -> Result<(), OptError>;

    /// Jacobian action, \\(y \leftarrow h'(x)\\,dx\\).
    fn p(&self, x: &X::Vector, dx: &X::Vector, y: &mut Y::Vector)
        -> Result<(), OptError>;

    /// Jacobian-adjoint action, \\(z \leftarrow h'(x)^* dy\\).
    fn ps(&self, x: &X::Vector, dy: &Y::Vector, z: &mut X::Vector)
        -> Result<(), OptError>;

    /// Second-derivative adjoint, \\(z \leftarrow (h''(x)\\,dx)^* dy\\).
    fn pps(
        &self,
        x: &X::Vector,
        dx: &X::Vector,
        dy: &Y::Vector,
        z: &mut X::Vector,
    ) -> Result<(), OptError>;
}
