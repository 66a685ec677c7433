use float_eq::assert_float_eq;
use saiteki::Rn;
use saiteki::solver::*;

type X = Rn<f64>;

//

// f(x) = (x0 + 1)^2 + 3 (x1 + 1)^2, minimized at (-1, -1).
struct Quad;

impl ScalarFn<X> for Quad
{
    fn eval(&self, x: &Vec<f64>) -> Result<f64, OptError>
    {
        Ok((x[0] + 1.).powi(2) + 3. * (x[1] + 1.).powi(2))
    }

    fn grad(&self, x: &Vec<f64>, g: &mut Vec<f64>) -> Result<(), OptError>
    {
        g[0] = 2. * (x[0] + 1.);
        g[1] = 6. * (x[1] + 1.);
        Ok(())
    }

    fn hessvec(&self, _x: &Vec<f64>, dx: &Vec<f64>, h_dx: &mut Vec<f64>)
        -> Result<(), OptError>
    {
        h_dx[0] = 2. * dx[0];
        h_dx[1] = 6. * dx[1];
        Ok(())
    }
}

// The Rosenbrock function, minimized at (1, 1).
struct Rosenbrock;

impl ScalarFn<X> for Rosenbrock
{
    fn eval(&self, x: &Vec<f64>) -> Result<f64, OptError>
    {
        Ok(100. * (x[1] - x[0] * x[0]).powi(2) + (1. - x[0]).powi(2))
    }

    fn grad(&self, x: &Vec<f64>, g: &mut Vec<f64>) -> Result<(), OptError>
    {
        g[0] = -400. * x[0] * (x[1] - x[0] * x[0]) - 2. * (1. - x[0]);
        g[1] = 200. * (x[1] - x[0] * x[0]);
        Ok(())
    }

    fn hessvec(&self, x: &Vec<f64>, dx: &Vec<f64>, h_dx: &mut Vec<f64>)
        -> Result<(), OptError>
    {
        h_dx[0] = (1200. * x[0] * x[0] - 400. * x[1] + 2.) * dx[0]
            - 400. * x[0] * dx[1];
        h_dx[1] = -400. * x[0] * dx[0] + 200. * dx[1];
        Ok(())
    }
}

fn solve<F: ScalarFn<X>>(f: &F, st: &mut CoreState<X>)
{
    let _ = env_logger::builder().is_test(true).try_init();

    let mut log = String::new();
    get_min(&mut log, &Functions::new(f), &mut NullStateManipulator, st)
        .unwrap();
}

//

#[test]
fn test_tr_newton_quadratic()
{
    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.h_type = OperatorKind::External;
    st.iter_max = 30;
    st.verbose = 0;

    solve(&Quad, &mut st);

    assert_eq!(st.stop, StopCondition::RelativeGradientSmall);
    assert_float_eq!(st.x.as_slice(), [-1., -1.].as_ref(), abs_all <= 1e-6);
}

#[test]
fn test_tr_newton_rosenbrock()
{
    let mut st = CoreState::<X>::new(&vec![-1.2, 1.]);
    st.h_type = OperatorKind::External;
    st.iter_max = 100;
    st.eps_g = 1e-8;
    st.eps_s = 1e-12;
    st.verbose = 0;

    solve(&Rosenbrock, &mut st);

    assert_eq!(st.stop, StopCondition::RelativeGradientSmall);
    assert_float_eq!(st.x.as_slice(), [1., 1.].as_ref(), abs_all <= 1e-3);
}

#[test]
fn test_tr_bfgs_quadratic()
{
    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.h_type = OperatorKind::BFGS;
    st.stored_history = 5;
    st.iter_max = 100;
    st.verbose = 0;

    solve(&Quad, &mut st);

    assert!(st.stop != StopCondition::MaxItersExceeded);
    assert_float_eq!(st.x.as_slice(), [-1., -1.].as_ref(), abs_all <= 1e-3);

    // Every retained pair is curvature-positive under BFGS.
    for (y, s) in st.old_y.iter().zip(st.old_s.iter()) {
        assert!(X::innr(y, s) > 0.);
    }
    assert_eq!(st.old_y.len(), st.old_s.len());
    assert!(st.old_y.len() <= st.stored_history);
}

#[test]
fn test_ls_steepest_descent_golden_section()
{
    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.algorithm_class = AlgorithmClass::LineSearch;
    st.iter_max = 100;
    st.verbose = 0;

    solve(&Quad, &mut st);

    assert_float_eq!(st.x.as_slice(), [-1., -1.].as_ref(), abs_all <= 1e-3);
}

#[test]
fn test_ls_steepest_descent_backtracking()
{
    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.algorithm_class = AlgorithmClass::LineSearch;
    st.kind = StepRule::BackTracking;
    st.iter_max = 100;
    st.verbose = 0;

    solve(&Quad, &mut st);

    assert_float_eq!(st.x.as_slice(), [-1., -1.].as_ref(), abs_all <= 1e-3);
}

#[test]
fn test_ls_two_point_quadratic()
{
    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.algorithm_class = AlgorithmClass::LineSearch;
    st.kind = StepRule::TwoPointA;
    st.iter_max = 100;
    st.verbose = 0;

    solve(&Quad, &mut st);

    assert_float_eq!(st.x.as_slice(), [-1., -1.].as_ref(), abs_all <= 1e-3);

    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.algorithm_class = AlgorithmClass::LineSearch;
    st.kind = StepRule::TwoPointB;
    st.iter_max = 100;
    st.verbose = 0;

    solve(&Quad, &mut st);

    assert_float_eq!(st.x.as_slice(), [-1., -1.].as_ref(), abs_all <= 1e-3);
}

#[test]
fn test_ls_nonlinear_cg_quadratic()
{
    for dir in [
        Direction::FletcherReeves,
        Direction::PolakRibiere,
        Direction::HestenesStiefel,
    ] {
        let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
        st.algorithm_class = AlgorithmClass::LineSearch;
        st.dir = dir;
        st.linesearch_iter_max = 12;
        st.iter_max = 300;
        st.verbose = 0;

        solve(&Quad, &mut st);

        assert_float_eq!(st.x.as_slice(), [-1., -1.].as_ref(), abs_all <= 1e-2);
    }
}

#[test]
fn test_ls_bfgs_quadratic()
{
    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.algorithm_class = AlgorithmClass::LineSearch;
    st.dir = Direction::BFGS;
    st.stored_history = 10;
    st.iter_max = 200;
    st.verbose = 0;

    solve(&Quad, &mut st);

    assert_float_eq!(st.x.as_slice(), [-1., -1.].as_ref(), abs_all <= 1e-3);
}

#[test]
fn test_ls_newton_cg_rosenbrock()
{
    let mut st = CoreState::<X>::new(&vec![-1.2, 1.]);
    st.algorithm_class = AlgorithmClass::LineSearch;
    st.dir = Direction::NewtonCG;
    st.h_type = OperatorKind::External;
    st.eps_krylov = 1e-8;
    st.iter_max = 300;
    st.eps_g = 1e-8;
    st.eps_s = 1e-12;
    st.verbose = 0;

    solve(&Rosenbrock, &mut st);

    assert!(st.stop != StopCondition::MaxItersExceeded);
    assert_float_eq!(st.x.as_slice(), [1., 1.].as_ref(), abs_all <= 1e-3);
}

#[test]
fn test_hessvec_symmetry()
{
    use rand::prelude::*;
    use rand_xoshiro::rand_core::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    let mut rng = Xoshiro256StarStar::seed_from_u64(7);

    // <H(x) dx, dxx> = <dx, H(x) dxx> to roundoff.
    for _ in 0..20 {
        let x = vec![2. * rng.gen::<f64>() - 1., 2. * rng.gen::<f64>() - 1.];
        let dx = vec![rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5];
        let dxx = vec![rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5];

        let mut h_dx = vec![0.; 2];
        let mut h_dxx = vec![0.; 2];
        Rosenbrock.hessvec(&x, &dx, &mut h_dx).unwrap();
        Rosenbrock.hessvec(&x, &dxx, &mut h_dxx).unwrap();

        assert_float_eq!(
            X::innr(&h_dx, &dxx), X::innr(&dx, &h_dxx), abs <= 1e-10);
    }
}

#[test]
fn test_brents_is_reserved()
{
    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.algorithm_class = AlgorithmClass::LineSearch;
    st.kind = StepRule::Brents;
    st.verbose = 0;

    let mut log = String::new();
    let r = get_min(
        &mut log, &Functions::new(&Quad), &mut NullStateManipulator, &mut st);
    assert!(matches!(r, Err(OptError::NotImplemented(_))));
}

#[test]
fn test_external_preconditioner_must_be_provided()
{
    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.minv_type = OperatorKind::External;
    st.verbose = 0;

    let mut log = String::new();
    let r = get_min(
        &mut log, &Functions::new(&Quad), &mut NullStateManipulator, &mut st);
    assert!(matches!(r, Err(OptError::UnsupportedOperator(_))));
}

#[test]
fn test_manipulator_external_stop()
{
    struct StopNow;

    impl StateManipulator<X> for StopNow
    {
        fn manipulate(&mut self, st: &mut CoreState<X>, loc: OptimLocation)
            -> Result<(), OptError>
        {
            if loc == OptimLocation::EndOfOptimizationIteration && st.iter >= 3 {
                st.stop = StopCondition::External;
            }
            Ok(())
        }
    }

    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.algorithm_class = AlgorithmClass::LineSearch;
    st.iter_max = 100;
    st.eps_g = 1e-14;
    st.eps_s = 1e-14;
    st.verbose = 0;

    let mut log = String::new();
    get_min(&mut log, &Functions::new(&Quad), &mut StopNow, &mut st).unwrap();

    assert_eq!(st.stop, StopCondition::External);
    assert_eq!(st.iter, 3);
}

#[test]
fn test_status_table_is_written()
{
    let mut st = CoreState::<X>::new(&vec![2.1, 1.1]);
    st.h_type = OperatorKind::External;
    st.iter_max = 30;

    let mut log = String::new();
    get_min(&mut log, &Functions::new(&Quad), &mut NullStateManipulator,
        &mut st).unwrap();

    assert!(log.contains("Obj Value"));
    assert!(log.lines().count() >= 3);
}
