//! Symmetric cone

use crate::solver::HilbertSpace;

/// Symmetric cone trait.
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// Equips a [`HilbertSpace`] with the algebraic structure of a Euclidean
/// Jordan algebra, so that the space carries a symmetric cone
/// \\(\mathcal{K} = \\{x \circ x\\}\\).  Only the inequality-constrained
/// variants of the engine require this trait.
pub trait Cone: HilbertSpace
{
    /// Jordan product \\(z \leftarrow x \circ y\\).
    ///
    /// * `x` is a vector \\(x\\).
    /// * `y` is a vector \\(y\\).
    /// * `z` receives \\(x \circ y\\) on exit.
    fn prod(x: &Self::Vector, y: &Self::Vector, z: &mut Self::Vector);

    /// Identity element \\(x \leftarrow e\\) such that \\(x \circ e = x\\).
    ///
    /// * `x` receives \\(e\\) on exit.
    fn id(x: &mut Self::Vector);

    /// Jordan product inverse \\(z \leftarrow L(x)^{-1} y\\)
    /// where \\(L(x)y = x \circ y\\).
    ///
    /// * `x` is a vector \\(x\\), which shall lie in the interior of the cone.
    /// * `y` is a vector \\(y\\).
    /// * `z` receives \\(L(x)^{-1} y\\) on exit.
    fn linv(x: &Self::Vector, y: &Self::Vector, z: &mut Self::Vector);

    /// Log barrier \\(\log \det x\\) of the cone.
    ///
    /// Returns the barrier value, or NaN when `x` does not lie in the
    /// interior of the cone.
    /// * `x` is a vector \\(x\\).
    fn barr(x: &Self::Vector) -> Self::F;

    /// Maximum feasible step.
    ///
    /// Returns the largest \\(\alpha \ge 0\\) with
    /// \\(x + \alpha\\,dx \in \mathcal{K}\\), or a negative sentinel when
    /// every \\(\alpha\\) is feasible.
    /// * `x` is a vector \\(x\\), which shall lie in the cone.
    /// * `dx` is a direction \\(dx\\).
    fn srch(x: &Self::Vector, dx: &Self::Vector) -> Self::F;
}
