//! Classification engine for partitioning property diffs.
//!
//! Given one resource's pending change and the allow-list supplied by its
//! resource-type policy provider, this module splits the change's property
//! differences into hotswappable and non-hotswappable subsets. Partitioning
//! cannot fail; every rejection is represented as data, not an error.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::model::{ChangeCandidate, PropertyDifference};

use super::verdict::NonHotswappableChange;

/// Result of partitioning one candidate's property differences.
///
/// The two sides are disjoint and their union equals the candidate's full
/// property-difference mapping; every property name appears in exactly one
/// side.
#[derive(Debug, Clone)]
pub struct ClassifiedChanges {
    /// Differences whose property names are on the allow-list.
    pub hotswappable: BTreeMap<String, PropertyDifference>,
    /// Differences whose property names are not on the allow-list.
    pub non_hotswappable: BTreeMap<String, PropertyDifference>,
}

/// Partitions a candidate's property diffs against an allow-list.
///
/// A property lands in the hotswappable side exactly when its name is a
/// member of `allowed_properties`. The allow-list is supplied fresh per call
/// by the resource-type policy provider and is not retained.
#[must_use]
pub fn classify(candidate: &ChangeCandidate, allowed_properties: &BTreeSet<String>) -> ClassifiedChanges {
    let mut hotswappable = BTreeMap::new();
    let mut non_hotswappable = BTreeMap::new();

    for (name, diff) in &candidate.property_diffs {
        if allowed_properties.contains(name) {
            hotswappable.insert(name.clone(), diff.clone());
        } else {
            non_hotswappable.insert(name.clone(), diff.clone());
        }
    }

    debug!(
        logical_id = %candidate.logical_id,
        hotswappable = hotswappable.len(),
        non_hotswappable = non_hotswappable.len(),
        "Classified property changes"
    );

    ClassifiedChanges {
        hotswappable,
        non_hotswappable,
    }
}

impl ClassifiedChanges {
    /// Accepted property names, in deterministic order.
    #[must_use]
    pub fn hotswappable_names(&self) -> Vec<String> {
        self.hotswappable.keys().cloned().collect()
    }

    /// Rejected property names, in deterministic order.
    #[must_use]
    pub fn rejected_names(&self) -> Vec<String> {
        self.non_hotswappable.keys().cloned().collect()
    }

    /// Returns true if every changed property was accepted.
    #[must_use]
    pub fn fully_hotswappable(&self) -> bool {
        self.non_hotswappable.is_empty()
    }

    /// Renders the rejection verdict for the non-hotswappable side, if any.
    ///
    /// Invoked once per candidate that has any rejected properties,
    /// regardless of whether it also has accepted ones; a resource with a
    /// mix of accepted and rejected property changes records both outcomes.
    #[must_use]
    pub fn render_rejection(&self, candidate: &ChangeCandidate) -> Option<NonHotswappableChange> {
        if self.non_hotswappable.is_empty() {
            return None;
        }
        Some(NonHotswappableChange::new(
            candidate.resource_type(),
            &candidate.logical_id,
            self.rejected_names(),
            None,
            true,
        ))
    }
}
