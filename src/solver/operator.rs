//! Linear operator

use crate::solver::{HilbertSpace, OptError};

/// Matrix-free linear operator trait.
///
/// Expresses a linear map \\(A: X \to Y\\) applied without ever forming a
/// matrix.  Application is fallible so that operators backed by stored
/// state (for instance the quasi-Newton approximations) can reject an
/// inconsistent history at apply time.
pub trait OperatorX<X: HilbertSpace, Y: HilbertSpace<F = X::F>>
{
    /// Calculate \\(y \leftarrow A x\\).
    ///
    /// Returns `Ok`, or `Err` when the operator cannot be applied.
    /// * `x` is a vector \\(x\\).
    /// * `y` receives \\(A x\\) on exit.
    fn apply(&self, x: &X::Vector, y: &mut Y::Vector) -> Result<(), OptError>;
}

//

/// The identity operator.
pub struct IdentityOp;

impl<X: HilbertSpace> OperatorX<X, X> for IdentityOp
{
    fn apply(&self, x: &X::Vector, y: &mut X::Vector) -> Result<(), OptError>
    {
        X::copy(x, y);
        Ok(())
    }
}
