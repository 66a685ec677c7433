use num_traits::Float;
use core::marker::PhantomData;
use crate::solver::HilbertSpace;

/// `num::Float`-generic dense Euclidean space \\(\mathbb{R}^n\\).
///
/// Vectors are plain `Vec`s; all numeric operations are written in pure
/// Rust.
#[derive(Clone)]
pub struct Rn<F>
{
    ph_f: PhantomData<F>,
}

impl<F: Float> HilbertSpace for Rn<F>
{
    type F = F;
    type Vector = Vec<F>;

    fn create(proto: &Vec<F>) -> Vec<F>
    {
        vec![F::zero(); proto.len()]
    }

    fn copy(x: &Vec<F>, y: &mut Vec<F>)
    {
        assert_eq!(x.len(), y.len());

        for (u, v) in x.iter().zip(y) {
            *v = *u;
        }
    }

    fn scal(alpha: F, x: &mut Vec<F>)
    {
        for u in x {
            *u = alpha * *u;
        }
    }

    fn zero(x: &mut Vec<F>)
    {
        for u in x {
            *u = F::zero();
        }
    }

    fn axpy(alpha: F, x: &Vec<F>, y: &mut Vec<F>)
    {
        assert_eq!(x.len(), y.len());

        for (u, v) in x.iter().zip(y) {
            *v = *v + alpha * *u;
        }
    }

    fn innr(x: &Vec<F>, y: &Vec<F>) -> F
    {
        assert_eq!(x.len(), y.len());

        let mut sum = F::zero();
        for (u, v) in x.iter().zip(y) {
            sum = sum + *u * *v;
        }
        sum
    }
}
