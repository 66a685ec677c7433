//! Hilbert space

use num_traits::Float;

/// Hilbert space trait.
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// Expresses an abstract inner-product space over which the optimization
/// engine is parametric.  An implementor is a type-level tag (usually a
/// zero-sized struct); all operations are associated functions acting on the
/// associated [`HilbertSpace::Vector`] type.
pub trait HilbertSpace
{
    /// Floating point data type used as scalars.
    type F: Float;

    /// Element of the space.
    type Vector;

    /// Allocate a new vector with the same shape as a prototype.
    ///
    /// Returns the allocated vector.  Its contents are unspecified.
    /// * `proto` is a vector whose shape is copied.
    fn create(proto: &Self::Vector) -> Self::Vector;

    /// Copy from a vector to another vector.
    ///
    /// * `x` is a vector to copy.
    /// * `y` is a vector being copied to.
    ///   `x` and `y` shall have the same shape.
    fn copy(x: &Self::Vector, y: &mut Self::Vector);

    /// Calculate \\(\alpha x\\).
    ///
    /// * `alpha` is a scalar \\(\alpha\\).
    /// * `x` is a vector \\(x\\) before entry, \\(\alpha x\\) on exit.
    fn scal(alpha: Self::F, x: &mut Self::Vector);

    /// Set \\(x \leftarrow 0\\).
    ///
    /// This is a hard set, not a scaling: it stays well-defined when the
    /// entries of `x` are NaN.
    /// * `x` is a vector to clear.
    fn zero(x: &mut Self::Vector);

    /// Calculate \\(\alpha x + y\\).
    ///
    /// * `alpha` is a scalar \\(\alpha\\).
    /// * `x` is a vector \\(x\\).
    /// * `y` is a vector \\(y\\) before entry, \\(\alpha x + y\\) on exit.
    ///   `x` and `y` shall have the same shape.
    fn axpy(alpha: Self::F, x: &Self::Vector, y: &mut Self::Vector);

    /// Calculate the inner product \\(\langle x, y \rangle\\).
    ///
    /// Returns the calculated inner product.
    /// * `x` is a vector \\(x\\).
    /// * `y` is a vector \\(y\\).
    ///   `x` and `y` shall have the same shape.
    fn innr(x: &Self::Vector, y: &Self::Vector) -> Self::F;

    /// Calculate the induced norm \\(\\|x\\|=\sqrt{\langle x, x \rangle}\\).
    ///
    /// Returns the calculated norm.
    /// * `x` is a vector \\(x\\).
    fn norm(x: &Self::Vector) -> Self::F
    {
        Self::innr(x, x).sqrt()
    }
}
