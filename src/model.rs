//! Change model for resource-level stack diffs.
//!
//! This module defines the immutable value types describing one resource's
//! before/after state and its property-level differences. Instances are
//! produced by the diff source, consumed within a single deployment attempt,
//! and never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A resource's declared state at one point in time.
///
/// The engine reads snapshots but never mutates them; ownership stays with
/// the diff source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Tag identifying the resource kind (e.g. `"Platform::Container::Service"`).
    pub resource_type: String,
    /// Arbitrary nested property mapping for this resource.
    pub properties: Value,
}

/// Kind of change detected for a single property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Property is present only in the new snapshot.
    Added,
    /// Property is present only in the old snapshot.
    Removed,
    /// Property is present in both snapshots with different values.
    Modified,
}

/// One property's before/after values within a resource change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDifference {
    /// Value before the change, if the property existed.
    pub old_value: Option<Value>,
    /// Value after the change, if the property still exists.
    pub new_value: Option<Value>,
    /// Kind of change.
    pub kind: ChangeKind,
}

/// One resource's pending change within the current diff.
#[derive(Debug, Clone)]
pub struct ChangeCandidate {
    /// Stack-scoped logical identifier, unique within the stack.
    pub logical_id: String,
    /// Snapshot before the change.
    pub old_snapshot: ResourceSnapshot,
    /// Snapshot after the change.
    pub new_snapshot: ResourceSnapshot,
    /// Property-level differences, keyed by property name.
    ///
    /// A `BTreeMap` keeps iteration deterministic, which the classification
    /// engine and reason rendering rely on.
    pub property_diffs: BTreeMap<String, PropertyDifference>,
}

impl ResourceSnapshot {
    /// Creates a snapshot from a type tag and a property mapping.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
        }
    }
}

impl PropertyDifference {
    /// Creates a difference from optional before/after values.
    ///
    /// The change kind is derived from which side is present.
    #[must_use]
    pub fn new(old_value: Option<Value>, new_value: Option<Value>) -> Self {
        let kind = match (&old_value, &new_value) {
            (None, _) => ChangeKind::Added,
            (_, None) => ChangeKind::Removed,
            (Some(_), Some(_)) => ChangeKind::Modified,
        };
        Self {
            old_value,
            new_value,
            kind,
        }
    }
}

impl ChangeCandidate {
    /// Creates a change candidate for one resource.
    #[must_use]
    pub fn new(
        logical_id: impl Into<String>,
        old_snapshot: ResourceSnapshot,
        new_snapshot: ResourceSnapshot,
        property_diffs: BTreeMap<String, PropertyDifference>,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            old_snapshot,
            new_snapshot,
            property_diffs,
        }
    }

    /// The resource-kind tag of the new snapshot.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.new_snapshot.resource_type
    }

    /// All changed property names, in deterministic order.
    #[must_use]
    pub fn property_names(&self) -> Vec<String> {
        self.property_diffs.keys().cloned().collect()
    }

    /// Returns true if any property changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.property_diffs.is_empty()
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ChangeCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.logical_id, self.resource_type())?;
        if !self.property_diffs.is_empty() {
            write!(f, " [")?;
            for (i, name) in self.property_diffs.keys().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{name}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}
