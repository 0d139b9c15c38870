//! Resource-type policy providers and their registry.
//!
//! A policy provider encodes which property changes of one resource kind are
//! safe to hotswap, and binds the apply action for accepted changes. One
//! implementation exists per supported resource kind, registered in a lookup
//! keyed by resource-type tag. The engine consumes the contract; it never
//! calls the control plane itself.

use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::classify::{
    classify, reject_change, ApplyAction, HotswappableChange, Verdict,
};
use crate::error::Result;
use crate::model::ChangeCandidate;
use crate::overrides::HotswapOverrides;

/// The apply half of an accepted change, bound by a policy provider.
///
/// The action owns the opaque control-plane client it was built with; the
/// client carries an attribution tag naming the issuing subsystem so
/// out-of-band calls are traceable.
pub struct BoundApply {
    /// Concrete sub-resource names the apply affects.
    pub resource_names: Vec<String>,
    /// Zero-argument asynchronous action performing the control-plane calls.
    pub action: ApplyAction,
}

/// Safety policy for one resource kind.
pub trait ResourceTypePolicy: Send + Sync {
    /// Service/category this resource kind belongs to, for attribution.
    fn service(&self) -> &'static str;

    /// Allow-list of hotswappable property names for this resource kind.
    fn allowed_properties(&self) -> BTreeSet<String>;

    /// Categorical rejection check, consulted before classification.
    ///
    /// Returns a reason when the change is non-hotswappable regardless of
    /// which properties changed (e.g. the resource was replaced, not
    /// updated). A categorical rejection short-circuits classification; the
    /// candidate's entire difference set is rejected.
    fn rejects_outright(&self, candidate: &ChangeCandidate) -> Option<String> {
        let _ = candidate;
        None
    }

    /// Binds the apply action for the accepted property subset.
    ///
    /// # Errors
    ///
    /// Returns an error if the action cannot be constructed from the
    /// candidate's new snapshot.
    fn build_apply(
        &self,
        candidate: &ChangeCandidate,
        accepted_properties: &[String],
        overrides: &HotswapOverrides,
    ) -> Result<BoundApply>;
}

/// Lookup of policy providers keyed by resource-type tag.
#[derive(Default)]
pub struct PolicyRegistry {
    /// Registered policies by resource-type tag.
    policies: HashMap<String, Box<dyn ResourceTypePolicy>>,
}

impl PolicyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    /// Registers a policy for a resource-type tag, replacing any previous one.
    pub fn register(
        &mut self,
        resource_type: impl Into<String>,
        policy: Box<dyn ResourceTypePolicy>,
    ) {
        self.policies.insert(resource_type.into(), policy);
    }

    /// Looks up the policy for a resource-type tag.
    #[must_use]
    pub fn get(&self, resource_type: &str) -> Option<&dyn ResourceTypePolicy> {
        self.policies.get(resource_type).map(|policy| policy.as_ref())
    }

    /// Returns true if a policy is registered for the tag.
    #[must_use]
    pub fn supports(&self, resource_type: &str) -> bool {
        self.policies.contains_key(resource_type)
    }

    /// Number of registered resource kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns true if no policies are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Evaluates one change candidate into its verdicts.
    ///
    /// Classification always completes before any apply action is
    /// constructed. A candidate with a mix of accepted and rejected property
    /// changes yields both a hotswappable and a non-hotswappable verdict.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy fails to bind the apply action.
    pub fn evaluate(
        &self,
        candidate: &ChangeCandidate,
        overrides: &HotswapOverrides,
    ) -> Result<Vec<Verdict>> {
        let resource_type = candidate.resource_type();
        let Some(policy) = self.get(resource_type) else {
            debug!(
                logical_id = %candidate.logical_id,
                resource_type,
                "No policy registered, rejecting change"
            );
            return Ok(reject_change(
                candidate,
                Some(format!(
                    "resource type {resource_type} is not supported for hotswap"
                )),
            ));
        };

        if let Some(reason) = policy.rejects_outright(candidate) {
            debug!(
                logical_id = %candidate.logical_id,
                reason,
                "Policy rejected change outright"
            );
            return Ok(reject_change(candidate, Some(reason)));
        }

        let classified = classify(candidate, &policy.allowed_properties());
        let mut verdicts = Vec::with_capacity(2);

        if let Some(rejection) = classified.render_rejection(candidate) {
            verdicts.push(Verdict::NonHotswappable(rejection));
        }

        if !classified.hotswappable.is_empty() {
            let accepted = classified.hotswappable_names();
            let bound = policy.build_apply(candidate, &accepted, overrides)?;
            verdicts.push(Verdict::Hotswappable(HotswappableChange::new(
                resource_type,
                accepted,
                policy.service(),
                bound.resource_names,
                bound.action,
            )));
        }

        Ok(verdicts)
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.policies.keys().collect();
        tags.sort();
        f.debug_struct("PolicyRegistry")
            .field("resource_types", &tags)
            .finish()
    }
}
