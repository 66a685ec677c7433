//! Algorithm selectors and status codes
//!
//! Every enum here has a canonical string form, which is the wire contract
//! of the release/capture surface: capture rejects any string outside the
//! canonical set.

use crate::solver::OptError;

fn bad(kind: &str, s: &str) -> OptError
{
    OptError::Serialization(format!("invalid {}: {}", kind, s))
}

//

/// Globalization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmClass
{
    /// Trust-region methods.
    TrustRegion,
    /// Line-search methods.
    LineSearch,
}

impl AlgorithmClass
{
    pub fn as_str(&self) -> &'static str
    {
        match self {
            AlgorithmClass::TrustRegion => "TrustRegion",
            AlgorithmClass::LineSearch => "LineSearch",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, OptError>
    {
        match s {
            "TrustRegion" => Ok(AlgorithmClass::TrustRegion),
            "LineSearch" => Ok(AlgorithmClass::LineSearch),
            _ => Err(bad("algorithm class", s)),
        }
    }
}

//

/// Why the outer iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition
{
    /// The algorithm has not converged.
    NotConverged,
    /// The relative gradient norm fell below tolerance.
    RelativeGradientSmall,
    /// The relative step length fell below tolerance.
    RelativeStepSmall,
    /// The iteration cap was reached.
    MaxItersExceeded,
    /// A manipulator requested a stop.
    External,
}

impl StopCondition
{
    pub fn as_str(&self) -> &'static str
    {
        match self {
            StopCondition::NotConverged => "NotConverged",
            StopCondition::RelativeGradientSmall => "RelativeGradientSmall",
            StopCondition::RelativeStepSmall => "RelativeStepSmall",
            StopCondition::MaxItersExceeded => "MaxItersExceeded",
            StopCondition::External => "External",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, OptError>
    {
        match s {
            "NotConverged" => Ok(StopCondition::NotConverged),
            "RelativeGradientSmall" => Ok(StopCondition::RelativeGradientSmall),
            "RelativeStepSmall" => Ok(StopCondition::RelativeStepSmall),
            "MaxItersExceeded" => Ok(StopCondition::MaxItersExceeded),
            "External" => Ok(StopCondition::External),
            _ => Err(bad("stopping condition", s)),
        }
    }
}

//

/// Why the inner Krylov solve stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KrylovStop
{
    /// Nonpositive curvature was detected.
    NegativeCurvature,
    /// The relative residual fell below tolerance.
    RelativeErrorSmall,
    /// The iteration cap was reached.
    MaxItersExceeded,
    /// The next iterate left the trust region.
    TrustRegionViolated,
}

impl KrylovStop
{
    pub fn as_str(&self) -> &'static str
    {
        match self {
            KrylovStop::NegativeCurvature => "NegativeCurvature",
            KrylovStop::RelativeErrorSmall => "RelativeErrorSmall",
            KrylovStop::MaxItersExceeded => "MaxItersExceeded",
            KrylovStop::TrustRegionViolated => "TrustRegionViolated",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, OptError>
    {
        match s {
            "NegativeCurvature" => Ok(KrylovStop::NegativeCurvature),
            "RelativeErrorSmall" => Ok(KrylovStop::RelativeErrorSmall),
            "MaxItersExceeded" => Ok(KrylovStop::MaxItersExceeded),
            "TrustRegionViolated" => Ok(KrylovStop::TrustRegionViolated),
            _ => Err(bad("Krylov stopping condition", s)),
        }
    }
}

//

/// Internal operators usable as Hessian approximations and preconditioners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind
{
    Identity,
    ScaledIdentity,
    BFGS,
    InvBFGS,
    SR1,
    InvSR1,
    /// The user's own operator (for the Hessian, the `hessvec` oracle).
    External,
}

impl OperatorKind
{
    pub fn as_str(&self) -> &'static str
    {
        match self {
            OperatorKind::Identity => "Identity",
            OperatorKind::ScaledIdentity => "ScaledIdentity",
            OperatorKind::BFGS => "BFGS",
            OperatorKind::InvBFGS => "InvBFGS",
            OperatorKind::SR1 => "SR1",
            OperatorKind::InvSR1 => "InvSR1",
            OperatorKind::External => "External",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, OptError>
    {
        match s {
            "Identity" => Ok(OperatorKind::Identity),
            "ScaledIdentity" => Ok(OperatorKind::ScaledIdentity),
            "BFGS" => Ok(OperatorKind::BFGS),
            "InvBFGS" => Ok(OperatorKind::InvBFGS),
            "SR1" => Ok(OperatorKind::SR1),
            "InvSR1" => Ok(OperatorKind::InvSR1),
            "External" => Ok(OperatorKind::External),
            _ => Err(bad("operator kind", s)),
        }
    }
}

//

/// Line-search direction family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction
{
    SteepestDescent,
    FletcherReeves,
    PolakRibiere,
    HestenesStiefel,
    /// Limited-memory inverse BFGS direction.
    BFGS,
    /// Truncated-CG Newton direction without a radius.
    NewtonCG,
}

impl Direction
{
    pub fn as_str(&self) -> &'static str
    {
        match self {
            Direction::SteepestDescent => "SteepestDescent",
            Direction::FletcherReeves => "FletcherReeves",
            Direction::PolakRibiere => "PolakRibiere",
            Direction::HestenesStiefel => "HestenesStiefel",
            Direction::BFGS => "BFGS",
            Direction::NewtonCG => "NewtonCG",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, OptError>
    {
        match s {
            "SteepestDescent" => Ok(Direction::SteepestDescent),
            "FletcherReeves" => Ok(Direction::FletcherReeves),
            "PolakRibiere" => Ok(Direction::PolakRibiere),
            "HestenesStiefel" => Ok(Direction::HestenesStiefel),
            "BFGS" => Ok(Direction::BFGS),
            "NewtonCG" => Ok(Direction::NewtonCG),
            _ => Err(bad("line-search direction", s)),
        }
    }
}

//

/// Line-search step rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRule
{
    /// Reserved; fails with NotImplemented.
    Brents,
    GoldenSection,
    BackTracking,
    /// Barzilai-Borwein rule A.
    TwoPointA,
    /// Barzilai-Borwein rule B.
    TwoPointB,
}

impl StepRule
{
    pub fn as_str(&self) -> &'static str
    {
        match self {
            StepRule::Brents => "Brents",
            StepRule::GoldenSection => "GoldenSection",
            StepRule::BackTracking => "BackTracking",
            StepRule::TwoPointA => "TwoPointA",
            StepRule::TwoPointB => "TwoPointB",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, OptError>
    {
        match s {
            "Brents" => Ok(StepRule::Brents),
            "GoldenSection" => Ok(StepRule::GoldenSection),
            "BackTracking" => Ok(StepRule::BackTracking),
            "TwoPointA" => Ok(StepRule::TwoPointA),
            "TwoPointB" => Ok(StepRule::TwoPointB),
            _ => Err(bad("line-search kind", s)),
        }
    }
}

//

/// Where in the outer loop a [`crate::solver::StateManipulator`] is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimLocation
{
    /// The trial step is chosen but the iterate has not moved yet.
    BeforeStep,
    /// The iterate has moved; the gradient there is not yet evaluated.
    AfterStepBeforeGradient,
    /// Last in the loop, after the stopping condition was evaluated.
    EndOfOptimizationIteration,
}

//

#[test]
fn test_kinds_roundtrip()
{
    let dirs = [
        Direction::SteepestDescent,
        Direction::FletcherReeves,
        Direction::PolakRibiere,
        Direction::HestenesStiefel,
        Direction::BFGS,
        Direction::NewtonCG,
    ];
    for d in dirs {
        assert_eq!(Direction::from_str(d.as_str()).unwrap(), d);
    }
    assert!(Direction::from_str("Steepest").is_err());
    assert!(OperatorKind::from_str("BFGS ").is_err());
}
