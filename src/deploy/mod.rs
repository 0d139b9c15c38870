//! Verdict aggregation, mode decision, and apply execution.
//!
//! This module collects per-candidate verdicts into the two final outcome
//! arrays, applies the hotswap-mode table, and drives the concurrent
//! application of accepted changes.

mod executor;
mod summary;

pub use executor::{
    ApplyOutcome, ApplyReport, DeploymentOutcome, FullDeployment, HotswapDeployer, HotswapMode,
    ModePlan,
};
pub use summary::VerdictSummary;
