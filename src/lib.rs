// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Swapstack
//!
//! Hotswap-aware change classification and deployment acceleration for
//! declarative infrastructure stacks.
//!
//! ## Overview
//!
//! Swapstack decides, per resource, whether a pending change can be applied
//! directly against the target platform's control-plane APIs ("hotswapped")
//! instead of going through the full, slower stack-update pipeline:
//!
//! - Partition each resource's property changes into hotswappable and
//!   non-hotswappable subsets, driven by pluggable per-resource-type policy
//! - Produce uniform [`classify::Verdict`]s a deployment driver acts on
//! - Apply accepted changes concurrently, aggregating per-resource failures
//! - Fall back to the full pipeline per the operator-selected mode
//!
//! ## Architecture
//!
//! The engine is a strict pipeline over one diff:
//!
//! 1. **Change Model**: before/after snapshots plus property differences
//! 2. **Classification**: policy allow-lists partition each change
//! 3. **Mode Decision**: fallback / hotswap-only / full-deployment table
//! 4. **Apply**: concurrent, failure-isolated control-plane calls
//!
//! ## Modules
//!
//! - [`model`]: resource snapshots and property-difference value types
//! - [`normalize`]: key-casing normalization for nested property values
//! - [`classify`]: classification engine and verdict types
//! - [`policy`]: resource-type policy provider contract and registry
//! - [`overrides`]: per-deployment configuration overrides
//! - [`deploy`]: verdict aggregation, mode decision, apply execution
//! - [`bundle`]: deterministic, atomically-published asset archives
//!
//! ## Example
//!
//! ```no_run
//! use swapstack::{HotswapDeployer, HotswapMode, HotswapOverrides, PolicyRegistry};
//!
//! # async fn example(pipeline: &dyn swapstack::FullDeployment) -> swapstack::Result<()> {
//! let registry = PolicyRegistry::new();
//! let deployer = HotswapDeployer::new(registry, HotswapOverrides::new());
//! let outcome = deployer.run(HotswapMode::Fallback, &[], pipeline).await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod bundle;
pub mod classify;
pub mod deploy;
pub mod error;
pub mod model;
pub mod normalize;
pub mod overrides;
pub mod policy;

// ============================================================================
// Re-exports
// ============================================================================

pub use bundle::{AssetBundler, NullProgress, ProgressSink};
pub use classify::{
    classify, ClassifiedChanges, HotswappableChange, NonHotswappableChange, Verdict,
};
pub use deploy::{
    ApplyOutcome, ApplyReport, DeploymentOutcome, FullDeployment, HotswapDeployer, HotswapMode,
    ModePlan, VerdictSummary,
};
pub use error::{Result, SwapstackError};
pub use model::{ChangeCandidate, ChangeKind, PropertyDifference, ResourceSnapshot};
pub use normalize::{lower_case_first_character, transform_object_keys, KeyExclusion};
pub use overrides::{HotswapOverrides, RollingUpdateOverride};
pub use policy::{BoundApply, PolicyRegistry, ResourceTypePolicy};
