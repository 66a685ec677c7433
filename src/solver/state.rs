//! Optimizer state
//!
//! The state owns every vector and scalar the engine mutates.  It is layered
//! the way the problem classes are layered: [`CoreState`] carries everything
//! an unconstrained solve needs, and the constrained variants attach an
//! equality extension (the multiplier \\(y\\)) and/or an inequality extension
//! (the multiplier \\(z\\) and the interior-point scalars) around the same
//! core.
//!
//! A state can be released into four flat name-keyed bags (vectors, reals,
//! naturals, parameter strings) and captured back.  Capture validates every
//! label against a closed whitelist and every parameter string against its
//! canonical set before installing anything, and finishes with the same
//! range checks a freshly configured state must pass.

use std::collections::VecDeque;
use num_traits::{Float, Zero, One, NumCast};
use crate::solver::{
    AlgorithmClass, Cone, Direction, HilbertSpace, KrylovStop, OperatorKind,
    OptError, StepRule, StopCondition,
};

/// Name-keyed vector bag.
pub type Vectors<V> = Vec<(String, V)>;
/// Name-keyed real bag.
pub type Reals<F> = Vec<(String, F)>;
/// Name-keyed natural-number bag.
pub type Naturals = Vec<(String, usize)>;
/// Name-keyed parameter-string bag.
pub type Params = Vec<(String, String)>;

fn show<F: Float>(v: F) -> f64
{
    v.to_f64().unwrap_or(f64::NAN)
}

fn missing(name: &str) -> OptError
{
    OptError::Serialization(format!("during capture, missing variable: {}", name))
}

//

/// State shared by every problem class.
pub struct CoreState<X: HilbertSpace>
{
    /// Tolerance for the gradient stopping condition.
    pub eps_g: X::F,
    /// Tolerance for the step-length stopping condition.
    pub eps_s: X::F,
    /// Number of (s, y) pairs stored for quasi-Newton methods.
    pub stored_history: usize,
    /// Number of failed iterations before the stored history is reset.
    pub history_reset: usize,
    /// Current iteration.
    pub iter: usize,
    /// Maximum number of iterations.
    pub iter_max: usize,
    /// Why the optimization stopped.
    pub stop: StopCondition,
    /// Krylov iterations taken by the last inner solve.
    pub krylov_iter: usize,
    /// Maximum number of Krylov iterations per inner solve.
    pub krylov_iter_max: usize,
    /// Total Krylov iterations taken.
    pub krylov_iter_total: usize,
    /// Why the last Krylov solve stopped.
    pub krylov_stop: KrylovStop,
    /// Relative residual of the last Krylov solve.
    pub krylov_rel_err: X::F,
    /// Stopping tolerance for the Krylov solves.
    pub eps_krylov: X::F,
    /// Globalization strategy.
    pub algorithm_class: AlgorithmClass,
    /// Preconditioner choice.
    pub minv_type: OperatorKind,
    /// Hessian approximation choice.
    pub h_type: OperatorKind,
    /// Norm of the gradient.
    pub norm_g: X::F,
    /// Norm of a typical gradient; set from the first one observed.
    pub norm_gtyp: X::F,
    /// Norm of the trial step.
    pub norm_s: X::F,
    /// Norm of a typical trial step; set from the first one observed.
    pub norm_styp: X::F,
    /// Optimization variable.
    pub x: X::Vector,
    /// Gradient of the objective, or of the merit an outer layer installed.
    pub g: X::Vector,
    /// Trial step.
    pub s: X::Vector,
    /// Previous optimization variable.
    pub x_prev: X::Vector,
    /// Previous gradient.
    pub g_prev: X::Vector,
    /// Previous trial step.
    pub s_prev: X::Vector,
    /// Gradient differences for quasi-Newton methods, newest first.
    pub old_y: VecDeque<X::Vector>,
    /// Step differences for quasi-Newton methods, newest first.
    pub old_s: VecDeque<X::Vector>,
    /// Objective value at `x`.
    pub obj_x: X::F,
    /// Objective value at `x + s`.
    pub obj_xps: X::F,
    /// Verbosity of the status table (0 silences it).
    pub verbose: usize,
    /// Trust-region radius.
    pub delta: X::F,
    /// Maximum trust-region radius.
    pub delta_max: X::F,
    /// Acceptance threshold of the reduction ratio.
    pub eta1: X::F,
    /// Expansion threshold of the reduction ratio.
    pub eta2: X::F,
    /// Ratio between actual and predicted reduction.
    pub rho: X::F,
    /// Consecutive rejected trust-region steps.
    pub rejected_trustregion: usize,
    /// Line-search step length.
    pub alpha: X::F,
    /// Iterations used by the last line search.
    pub linesearch_iter: usize,
    /// Maximum number of line-search iterations.
    pub linesearch_iter_max: usize,
    /// Total line-search iterations computed.
    pub linesearch_iter_total: usize,
    /// Stopping tolerance for the line search.
    pub eps_ls: X::F,
    /// Search-direction family for line-search methods.
    pub dir: Direction,
    /// Step rule for line-search methods.
    pub kind: StepRule,
}

impl<X: HilbertSpace> CoreState<X>
{
    /// Creates a state for unconstrained optimization.
    ///
    /// Returns the state with default parameters and every vector shaped
    /// like `x`.
    /// * `x` is the initial iterate.
    pub fn new(x: &X::Vector) -> Self
    {
        let f = |v: f64| NumCast::from(v).unwrap_or_else(X::F::nan);
        let nan = X::F::nan();

        let mut x0 = X::create(x);
        X::copy(x, &mut x0);
        let mut g = X::create(x);
        X::zero(&mut g);
        let mut s = X::create(x);
        X::zero(&mut s);
        let mut x_prev = X::create(x);
        X::zero(&mut x_prev);
        let mut g_prev = X::create(x);
        X::zero(&mut g_prev);
        let mut s_prev = X::create(x);
        X::zero(&mut s_prev);

        CoreState {
            eps_g: f(1e-6),
            eps_s: f(1e-6),
            stored_history: 0,
            history_reset: 5,
            iter: 1,
            iter_max: 10,
            stop: StopCondition::NotConverged,
            krylov_iter: 1,
            krylov_iter_max: 10,
            krylov_iter_total: 0,
            krylov_stop: KrylovStop::RelativeErrorSmall,
            krylov_rel_err: nan,
            eps_krylov: f(1e-2),
            algorithm_class: AlgorithmClass::TrustRegion,
            minv_type: OperatorKind::Identity,
            h_type: OperatorKind::Identity,
            norm_g: nan,
            norm_gtyp: nan,
            norm_s: nan,
            norm_styp: nan,
            x: x0,
            g,
            s,
            x_prev,
            g_prev,
            s_prev,
            old_y: VecDeque::new(),
            old_s: VecDeque::new(),
            obj_x: nan,
            obj_xps: nan,
            verbose: 1,
            delta: f(100.),
            delta_max: f(100.),
            eta1: f(0.1),
            eta2: f(0.9),
            rho: X::F::zero(),
            rejected_trustregion: 0,
            alpha: X::F::one(),
            linesearch_iter: 0,
            linesearch_iter_max: 5,
            linesearch_iter_total: 0,
            eps_ls: f(1e-2),
            dir: Direction::SteepestDescent,
            kind: StepRule::GoldenSection,
        }
    }

    /// Checks that the parameters form a valid state.
    ///
    /// Returns `Ok`, or the first violated constraint as
    /// [`OptError::Config`].  The NaN sentinel is tolerated on the
    /// first-iteration scalars only.
    pub fn check(&self) -> Result<(), OptError>
    {
        let f0 = X::F::zero();
        let f1 = X::F::one();
        let first = self.iter == 1;
        let err = |m: String| Err(OptError::Config(m));

        if !(self.eps_g > f0) {
            return err(format!(
                "the gradient stopping tolerance must be positive: eps_g = {:e}",
                show(self.eps_g)));
        }
        if !(self.eps_s > f0) {
            return err(format!(
                "the step-length stopping tolerance must be positive: eps_s = {:e}",
                show(self.eps_s)));
        }
        if !(self.eps_krylov > f0) {
            return err(format!(
                "the Krylov stopping tolerance must be positive: eps_krylov = {:e}",
                show(self.eps_krylov)));
        }
        if !(self.eps_ls > f0) {
            return err(format!(
                "the line-search stopping tolerance must be positive: eps_ls = {:e}",
                show(self.eps_ls)));
        }
        if self.iter == 0 {
            return err("the current iteration must be positive: iter = 0".into());
        }
        if self.iter_max == 0 {
            return err("the maximum iteration must be positive: iter_max = 0".into());
        }
        if self.krylov_iter == 0 {
            return err("the current Krylov iteration must be positive: \
                        krylov_iter = 0".into());
        }
        if self.krylov_iter_max == 0 {
            return err("the maximum Krylov iteration must be positive: \
                        krylov_iter_max = 0".into());
        }
        if self.krylov_rel_err < f0 {
            return err(format!(
                "the Krylov relative error must be nonnegative: \
                 krylov_rel_err = {:e}",
                show(self.krylov_rel_err)));
        }
        if self.norm_g < f0 || (!first && self.norm_g.is_nan()) {
            return err(format!(
                "the gradient norm must be nonnegative: norm_g = {:e}",
                show(self.norm_g)));
        }
        if self.norm_gtyp < f0 || (!first && self.norm_gtyp.is_nan()) {
            return err(format!(
                "the typical gradient norm must be nonnegative: norm_gtyp = {:e}",
                show(self.norm_gtyp)));
        }
        if self.norm_s < f0 || (!first && self.norm_s.is_nan()) {
            return err(format!(
                "the trial step norm must be nonnegative: norm_s = {:e}",
                show(self.norm_s)));
        }
        if self.norm_styp < f0 || (!first && self.norm_styp.is_nan()) {
            return err(format!(
                "the typical trial step norm must be nonnegative: \
                 norm_styp = {:e}",
                show(self.norm_styp)));
        }
        if !first && self.obj_x.is_nan() {
            return err("the objective value must be a number past the first \
                        iteration: obj_x = NaN".into());
        }
        if !first && self.obj_xps.is_nan() {
            return err("the trial objective value must be a number past the \
                        first iteration: obj_xps = NaN".into());
        }
        if !(self.delta > f0) {
            return err(format!(
                "the trust-region radius must be positive: delta = {:e}",
                show(self.delta)));
        }
        if !(self.delta_max > f0) {
            return err(format!(
                "the maximum trust-region radius must be positive: \
                 delta_max = {:e}",
                show(self.delta_max)));
        }
        if self.delta > self.delta_max {
            return err(format!(
                "the trust-region radius must not exceed its maximum: \
                 delta = {:e}, delta_max = {:e}",
                show(self.delta), show(self.delta_max)));
        }
        if self.eta1 < f0 || self.eta1 > f1 {
            return err(format!(
                "the acceptance threshold must lie in [0, 1]: eta1 = {:e}",
                show(self.eta1)));
        }
        if self.eta2 < f0 || self.eta2 > f1 {
            return err(format!(
                "the expansion threshold must lie in [0, 1]: eta2 = {:e}",
                show(self.eta2)));
        }
        if self.eta1 >= self.eta2 {
            return err(format!(
                "the trust-region thresholds must satisfy eta1 < eta2: \
                 eta1 = {:e}, eta2 = {:e}",
                show(self.eta1), show(self.eta2)));
        }
        if self.rho < f0 {
            return err(format!(
                "the reduction ratio must be nonnegative: rho = {:e}",
                show(self.rho)));
        }
        if !(self.alpha > f0) {
            return err(format!(
                "the line-search step length must be positive: alpha = {:e}",
                show(self.alpha)));
        }
        if self.old_y.len() != self.old_s.len() {
            return err(format!(
                "the stored gradient and step differences must pair up: \
                 {} vs {}",
                self.old_y.len(), self.old_s.len()));
        }

        Ok(())
    }

    fn is_var(name: &str) -> bool
    {
        matches!(name, "x" | "g" | "s" | "x_prev" | "g_prev" | "s_prev")
            || name.starts_with("oldY_")
            || name.starts_with("oldS_")
    }

    fn is_real(name: &str) -> bool
    {
        matches!(name,
            "eps_g" | "eps_s" | "krylov_rel_err" | "eps_krylov" |
            "norm_g" | "norm_gtyp" | "norm_s" | "norm_styp" |
            "obj_x" | "obj_xps" | "delta" | "delta_max" |
            "eta1" | "eta2" | "rho" | "alpha" | "eps_ls")
    }

    fn is_nat(name: &str) -> bool
    {
        matches!(name,
            "stored_history" | "history_reset" | "iter" | "iter_max" |
            "krylov_iter" | "krylov_iter_max" | "krylov_iter_total" |
            "verbose" | "rejected_trustregion" |
            "linesearch_iter" | "linesearch_iter_max" | "linesearch_iter_total")
    }

    fn is_param(name: &str) -> bool
    {
        matches!(name,
            "algorithm_class" | "opt_stop" | "krylov_stop" |
            "H_type" | "Minv_type" | "dir" | "kind")
    }

    fn check_labels(
        xs: &Vectors<X::Vector>,
        reals: &Reals<X::F>,
        nats: &Naturals,
        params: &Params,
    ) -> Result<(), OptError>
    {
        let base = "during capture, found an invalid";

        for (name, _) in xs {
            if !Self::is_var(name) {
                return Err(OptError::Serialization(
                    format!("{} variable name: {}", base, name)));
            }
        }
        for (name, _) in reals {
            if !Self::is_real(name) {
                return Err(OptError::Serialization(
                    format!("{} real name: {}", base, name)));
            }
        }
        for (name, _) in nats {
            if !Self::is_nat(name) {
                return Err(OptError::Serialization(
                    format!("{} natural name: {}", base, name)));
            }
        }
        for (name, _) in params {
            if !Self::is_param(name) {
                return Err(OptError::Serialization(
                    format!("{} parameter name: {}", base, name)));
            }
        }

        Ok(())
    }

    // Every parameter string must parse before anything is installed.
    fn check_params(params: &Params) -> Result<(), OptError>
    {
        for (name, value) in params {
            match name.as_str() {
                "algorithm_class" => {AlgorithmClass::from_str(value)?;},
                "opt_stop" => {StopCondition::from_str(value)?;},
                "krylov_stop" => {KrylovStop::from_str(value)?;},
                "H_type" | "Minv_type" => {OperatorKind::from_str(value)?;},
                "dir" => {Direction::from_str(value)?;},
                "kind" => {StepRule::from_str(value)?;},
                _ => {},
            }
        }

        Ok(())
    }

    /// Releases the state into flat name-keyed bags.
    ///
    /// Returns the vector, real, natural, and parameter bags.  The
    /// quasi-Newton history is written newest first as `oldY_1, oldY_2, ...`
    /// and `oldS_1, oldS_2, ...`.
    pub fn release(self) -> (Vectors<X::Vector>, Reals<X::F>, Naturals, Params)
    {
        let mut xs: Vectors<X::Vector> = Vec::new();
        xs.push(("x".into(), self.x));
        xs.push(("g".into(), self.g));
        xs.push(("s".into(), self.s));
        xs.push(("x_prev".into(), self.x_prev));
        xs.push(("g_prev".into(), self.g_prev));
        xs.push(("s_prev".into(), self.s_prev));
        for (i, v) in self.old_y.into_iter().enumerate() {
            xs.push((format!("oldY_{}", i + 1), v));
        }
        for (i, v) in self.old_s.into_iter().enumerate() {
            xs.push((format!("oldS_{}", i + 1), v));
        }

        let reals: Reals<X::F> = vec![
            ("eps_g".into(), self.eps_g),
            ("eps_s".into(), self.eps_s),
            ("krylov_rel_err".into(), self.krylov_rel_err),
            ("eps_krylov".into(), self.eps_krylov),
            ("norm_g".into(), self.norm_g),
            ("norm_gtyp".into(), self.norm_gtyp),
            ("norm_s".into(), self.norm_s),
            ("norm_styp".into(), self.norm_styp),
            ("obj_x".into(), self.obj_x),
            ("obj_xps".into(), self.obj_xps),
            ("delta".into(), self.delta),
            ("delta_max".into(), self.delta_max),
            ("eta1".into(), self.eta1),
            ("eta2".into(), self.eta2),
            ("rho".into(), self.rho),
            ("alpha".into(), self.alpha),
            ("eps_ls".into(), self.eps_ls),
        ];

        let nats: Naturals = vec![
            ("stored_history".into(), self.stored_history),
            ("history_reset".into(), self.history_reset),
            ("iter".into(), self.iter),
            ("iter_max".into(), self.iter_max),
            ("krylov_iter".into(), self.krylov_iter),
            ("krylov_iter_max".into(), self.krylov_iter_max),
            ("krylov_iter_total".into(), self.krylov_iter_total),
            ("verbose".into(), self.verbose),
            ("rejected_trustregion".into(), self.rejected_trustregion),
            ("linesearch_iter".into(), self.linesearch_iter),
            ("linesearch_iter_max".into(), self.linesearch_iter_max),
            ("linesearch_iter_total".into(), self.linesearch_iter_total),
        ];

        let params: Params = vec![
            ("algorithm_class".into(), self.algorithm_class.as_str().into()),
            ("opt_stop".into(), self.stop.as_str().into()),
            ("krylov_stop".into(), self.krylov_stop.as_str().into()),
            ("H_type".into(), self.h_type.as_str().into()),
            ("Minv_type".into(), self.minv_type.as_str().into()),
            ("dir".into(), self.dir.as_str().into()),
            ("kind".into(), self.kind.as_str().into()),
        ];

        (xs, reals, nats, params)
    }

    /// Captures a state back from released bags.
    ///
    /// Returns the reconstructed state.  Labels are validated against the
    /// closed whitelist and parameter strings against their canonical sets
    /// before anything is installed; the reconstructed state must then pass
    /// [`CoreState::check`].  The quasi-Newton entries are read in the order
    /// they appear, so `oldY_1` must precede `oldY_2` and so on.
    pub fn capture(
        xs: Vectors<X::Vector>,
        reals: Reals<X::F>,
        nats: Naturals,
        params: Params,
    ) -> Result<Self, OptError>
    {
        Self::check_labels(&xs, &reals, &nats, &params)?;
        Self::check_params(&params)?;

        let mut x = None;
        let mut g = None;
        let mut s = None;
        let mut x_prev = None;
        let mut g_prev = None;
        let mut s_prev = None;
        let mut old_y = VecDeque::new();
        let mut old_s = VecDeque::new();
        for (name, v) in xs {
            match name.as_str() {
                "x" => x = Some(v),
                "g" => g = Some(v),
                "s" => s = Some(v),
                "x_prev" => x_prev = Some(v),
                "g_prev" => g_prev = Some(v),
                "s_prev" => s_prev = Some(v),
                _ if name.starts_with("oldY_") => old_y.push_back(v),
                _ => old_s.push_back(v),
            }
        }

        let x = x.ok_or_else(|| missing("x"))?;
        let mut st = CoreState::new(&x);
        st.x = x;
        st.g = g.ok_or_else(|| missing("g"))?;
        st.s = s.ok_or_else(|| missing("s"))?;
        st.x_prev = x_prev.ok_or_else(|| missing("x_prev"))?;
        st.g_prev = g_prev.ok_or_else(|| missing("g_prev"))?;
        st.s_prev = s_prev.ok_or_else(|| missing("s_prev"))?;
        st.old_y = old_y;
        st.old_s = old_s;

        for (name, v) in reals {
            match name.as_str() {
                "eps_g" => st.eps_g = v,
                "eps_s" => st.eps_s = v,
                "krylov_rel_err" => st.krylov_rel_err = v,
                "eps_krylov" => st.eps_krylov = v,
                "norm_g" => st.norm_g = v,
                "norm_gtyp" => st.norm_gtyp = v,
                "norm_s" => st.norm_s = v,
                "norm_styp" => st.norm_styp = v,
                "obj_x" => st.obj_x = v,
                "obj_xps" => st.obj_xps = v,
                "delta" => st.delta = v,
                "delta_max" => st.delta_max = v,
                "eta1" => st.eta1 = v,
                "eta2" => st.eta2 = v,
                "rho" => st.rho = v,
                "alpha" => st.alpha = v,
                "eps_ls" => st.eps_ls = v,
                _ => {},
            }
        }

        for (name, v) in nats {
            match name.as_str() {
                "stored_history" => st.stored_history = v,
                "history_reset" => st.history_reset = v,
                "iter" => st.iter = v,
                "iter_max" => st.iter_max = v,
                "krylov_iter" => st.krylov_iter = v,
                "krylov_iter_max" => st.krylov_iter_max = v,
                "krylov_iter_total" => st.krylov_iter_total = v,
                "verbose" => st.verbose = v,
                "rejected_trustregion" => st.rejected_trustregion = v,
                "linesearch_iter" => st.linesearch_iter = v,
                "linesearch_iter_max" => st.linesearch_iter_max = v,
                "linesearch_iter_total" => st.linesearch_iter_total = v,
                _ => {},
            }
        }

        for (name, v) in params {
            match name.as_str() {
                "algorithm_class" => st.algorithm_class = AlgorithmClass::from_str(&v)?,
                "opt_stop" => st.stop = StopCondition::from_str(&v)?,
                "krylov_stop" => st.krylov_stop = KrylovStop::from_str(&v)?,
                "H_type" => st.h_type = OperatorKind::from_str(&v)?,
                "Minv_type" => st.minv_type = OperatorKind::from_str(&v)?,
                "dir" => st.dir = Direction::from_str(&v)?,
                "kind" => st.kind = StepRule::from_str(&v)?,
                _ => {},
            }
        }

        st.check()?;

        Ok(st)
    }
}

//

/// Equality extension: the multiplier for \\(g(x) = 0\\).
pub struct EqExt<Y: HilbertSpace>
{
    /// Lagrange multiplier of the equality constraints.
    pub y: Y::Vector,
}

impl<Y: HilbertSpace> EqExt<Y>
{
    fn release(self, ys: &mut Vectors<Y::Vector>)
    {
        ys.push(("y".into(), self.y));
    }

    fn capture(ys: Vectors<Y::Vector>) -> Result<Self, OptError>
    {
        let mut y = None;
        for (name, v) in ys {
            if name == "y" {
                y = Some(v);
            }
            else {
                return Err(OptError::Serialization(format!(
                    "during capture, found an invalid equality multiplier \
                     name: {}", name)));
            }
        }

        Ok(EqExt {y: y.ok_or_else(|| missing("y"))?})
    }
}

/// State of an equality-constrained problem,
/// \\(\min f(x)\\) subject to \\(g(x) = 0\\).
pub struct EqualityState<X, Y>
where X: HilbertSpace, Y: HilbertSpace<F = X::F>
{
    /// The shared core.
    pub core: CoreState<X>,
    /// The equality extension.
    pub eq: EqExt<Y>,
}

impl<X, Y> EqualityState<X, Y>
where X: HilbertSpace, Y: HilbertSpace<F = X::F>
{
    /// Creates a state for equality-constrained optimization.
    ///
    /// * `x` is the initial iterate.
    /// * `y` is the initial equality multiplier.
    pub fn new(x: &X::Vector, y: &Y::Vector) -> Self
    {
        let mut y0 = Y::create(y);
        Y::copy(y, &mut y0);

        EqualityState {
            core: CoreState::new(x),
            eq: EqExt {y: y0},
        }
    }

    /// Checks that the parameters form a valid state.
    pub fn check(&self) -> Result<(), OptError>
    {
        self.core.check()
    }

    /// Releases the state into flat name-keyed bags.
    pub fn release(self)
        -> (Vectors<X::Vector>, Vectors<Y::Vector>, Reals<X::F>, Naturals, Params)
    {
        let mut ys = Vec::new();
        self.eq.release(&mut ys);
        let (xs, reals, nats, params) = self.core.release();

        (xs, ys, reals, nats, params)
    }

    /// Captures a state back from released bags.
    pub fn capture(
        xs: Vectors<X::Vector>,
        ys: Vectors<Y::Vector>,
        reals: Reals<X::F>,
        nats: Naturals,
        params: Params,
    ) -> Result<Self, OptError>
    {
        let eq = EqExt::capture(ys)?;
        let core = CoreState::capture(xs, reals, nats, params)?;

        Ok(EqualityState {core, eq})
    }
}

//

/// Inequality extension: the cone multiplier and interior-point scalars.
pub struct IneqExt<Z: Cone>
{
    /// Lagrange multiplier of the cone constraints; strictly interior.
    pub z: Z::Vector,
    /// Cached constraint value \\(h(x)\\) at the current iterate.
    pub h_x: Z::Vector,
    /// Barrier parameter; NaN until the engine seeds it.
    pub mu: Z::F,
    /// Barrier reduction factor.
    pub sigma: Z::F,
    /// Fraction-to-boundary factor.
    pub gamma: Z::F,
}

impl<Z: Cone> IneqExt<Z>
{
    fn new(z: &Z::Vector) -> Self
    {
        let f = |v: f64| NumCast::from(v).unwrap_or_else(Z::F::nan);

        let mut z0 = Z::create(z);
        Z::copy(z, &mut z0);
        let mut h_x = Z::create(z);
        Z::zero(&mut h_x);

        IneqExt {
            z: z0,
            h_x,
            mu: Z::F::nan(),
            sigma: f(0.5),
            gamma: f(0.95),
        }
    }

    fn check(&self) -> Result<(), OptError>
    {
        let f0 = Z::F::zero();
        let f1 = Z::F::one();

        if !self.mu.is_nan() && !(self.mu > f0) {
            return Err(OptError::Config(format!(
                "the barrier parameter must be positive: mu = {:e}",
                show(self.mu))));
        }
        if !(self.sigma > f0 && self.sigma < f1) {
            return Err(OptError::Config(format!(
                "the barrier reduction factor must lie in (0, 1): sigma = {:e}",
                show(self.sigma))));
        }
        if !(self.gamma > f0 && self.gamma < f1) {
            return Err(OptError::Config(format!(
                "the fraction-to-boundary factor must lie in (0, 1): \
                 gamma = {:e}",
                show(self.gamma))));
        }

        Ok(())
    }

    fn release(self, zs: &mut Vectors<Z::Vector>, reals: &mut Reals<Z::F>)
    {
        zs.push(("z".into(), self.z));
        reals.push(("mu".into(), self.mu));
        reals.push(("sigma".into(), self.sigma));
        reals.push(("gamma".into(), self.gamma));
    }

    // Splits the extension reals out of the shared bag; the rest goes on to
    // the core capture.
    fn capture(
        zs: Vectors<Z::Vector>,
        reals: &mut Reals<Z::F>,
    ) -> Result<Self, OptError>
    {
        let mut z = None;
        for (name, v) in zs {
            if name == "z" {
                z = Some(v);
            }
            else {
                return Err(OptError::Serialization(format!(
                    "during capture, found an invalid inequality multiplier \
                     name: {}", name)));
            }
        }
        let z = z.ok_or_else(|| missing("z"))?;

        let mut ext = IneqExt::new(&z);
        ext.z = z;
        reals.retain(|(name, v)| {
            match name.as_str() {
                "mu" => {ext.mu = *v; false},
                "sigma" => {ext.sigma = *v; false},
                "gamma" => {ext.gamma = *v; false},
                _ => true,
            }
        });

        Ok(ext)
    }
}

/// State of an inequality-constrained problem,
/// \\(\min f(x)\\) subject to \\(h(x) \succeq_\mathcal{K} 0\\).
pub struct InequalityState<X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    /// The shared core.
    pub core: CoreState<X>,
    /// The inequality extension.
    pub ineq: IneqExt<Z>,
}

impl<X, Z> InequalityState<X, Z>
where X: HilbertSpace, Z: Cone<F = X::F>
{
    /// Creates a state for inequality-constrained optimization.
    ///
    /// * `x` is the initial iterate; \\(h(x)\\) shall be strictly interior.
    /// * `z` is the initial cone multiplier; strictly interior.
    pub fn new(x: &X::Vector, z: &Z::Vector) -> Self
    {
        InequalityState {
            core: CoreState::new(x),
            ineq: IneqExt::new(z),
        }
    }

    /// Checks that the parameters form a valid state.
    pub fn check(&self) -> Result<(), OptError>
    {
        self.core.check()?;
        self.ineq.check()
    }

    /// Releases the state into flat name-keyed bags.
    pub fn release(self)
        -> (Vectors<X::Vector>, Vectors<Z::Vector>, Reals<X::F>, Naturals, Params)
    {
        let mut zs = Vec::new();
        let (xs, mut reals, nats, params) = self.core.release();
        self.ineq.release(&mut zs, &mut reals);

        (xs, zs, reals, nats, params)
    }

    /// Captures a state back from released bags.
    pub fn capture(
        xs: Vectors<X::Vector>,
        zs: Vectors<Z::Vector>,
        mut reals: Reals<X::F>,
        nats: Naturals,
        params: Params,
    ) -> Result<Self, OptError>
    {
        let ineq = IneqExt::capture(zs, &mut reals)?;
        let core = CoreState::capture(xs, reals, nats, params)?;

        let st = InequalityState {core, ineq};
        st.ineq.check()?;

        Ok(st)
    }
}

//

/// State of a fully constrained problem,
/// \\(\min f(x)\\) subject to \\(g(x) = 0\\) and
/// \\(h(x) \succeq_\mathcal{K} 0\\).
pub struct ConstrainedState<X, Y, Z>
where X: HilbertSpace, Y: HilbertSpace<F = X::F>, Z: Cone<F = X::F>
{
    /// The shared core.
    pub core: CoreState<X>,
    /// The equality extension.
    pub eq: EqExt<Y>,
    /// The inequality extension.
    pub ineq: IneqExt<Z>,
}

impl<X, Y, Z> ConstrainedState<X, Y, Z>
where X: HilbertSpace, Y: HilbertSpace<F = X::F>, Z: Cone<F = X::F>
{
    /// Creates a state for fully constrained optimization.
    pub fn new(x: &X::Vector, y: &Y::Vector, z: &Z::Vector) -> Self
    {
        let mut y0 = Y::create(y);
        Y::copy(y, &mut y0);

        ConstrainedState {
            core: CoreState::new(x),
            eq: EqExt {y: y0},
            ineq: IneqExt::new(z),
        }
    }

    /// Checks that the parameters form a valid state.
    pub fn check(&self) -> Result<(), OptError>
    {
        self.core.check()?;
        self.ineq.check()
    }

    /// Releases the state into flat name-keyed bags.
    #[allow(clippy::type_complexity)]
    pub fn release(self)
        -> (Vectors<X::Vector>, Vectors<Y::Vector>, Vectors<Z::Vector>,
            Reals<X::F>, Naturals, Params)
    {
        let mut ys = Vec::new();
        self.eq.release(&mut ys);
        let mut zs = Vec::new();
        let (xs, mut reals, nats, params) = self.core.release();
        self.ineq.release(&mut zs, &mut reals);

        (xs, ys, zs, reals, nats, params)
    }

    /// Captures a state back from released bags.
    pub fn capture(
        xs: Vectors<X::Vector>,
        ys: Vectors<Y::Vector>,
        zs: Vectors<Z::Vector>,
        mut reals: Reals<X::F>,
        nats: Naturals,
        params: Params,
    ) -> Result<Self, OptError>
    {
        let eq = EqExt::capture(ys)?;
        let ineq = IneqExt::capture(zs, &mut reals)?;
        let core = CoreState::capture(xs, reals, nats, params)?;

        let st = ConstrainedState {core, eq, ineq};
        st.ineq.check()?;

        Ok(st)
    }
}
