//! Verdict types emitted by the classification engine.
//!
//! A [`Verdict`] is the engine's final, immutable per-resource decision
//! record. Once emitted it is never edited, only appended to the result
//! collection consumed by the deployment driver.

use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::model::ChangeCandidate;

/// Property name carrying the resource tag set.
pub const TAGS_PROPERTY: &str = "Tags";

/// Future returned by a bound apply action.
pub type ApplyFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Zero-argument asynchronous apply action bound by a policy provider.
///
/// The action owns everything it needs (control-plane client handle,
/// normalized property payload) and may fail against the control plane.
pub type ApplyAction = Box<dyn FnOnce() -> ApplyFuture + Send>;

/// The classification engine's per-resource decision.
pub enum Verdict {
    /// The change (or a property subset of it) can be applied out-of-band.
    Hotswappable(HotswappableChange),
    /// The change (or a property subset of it) must go through the full
    /// deployment pipeline.
    NonHotswappable(NonHotswappableChange),
}

/// A change accepted for direct application against the control plane.
pub struct HotswappableChange {
    /// Resource-kind tag of the changed resource.
    pub resource_type: String,
    /// Changed property names accepted for hotswap, in deterministic order.
    pub properties_changed: Vec<String>,
    /// Service/category the change targets, for attribution.
    pub service: String,
    /// Concrete sub-resource names affected by the apply.
    pub resource_names: Vec<String>,
    /// Bound apply action; invoking it performs the control-plane calls.
    pub apply: ApplyAction,
}

/// A change rejected for hotswap, with an operator-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonHotswappableChange {
    /// Resource-kind tag of the changed resource.
    pub resource_type: String,
    /// Stack-scoped logical identifier of the resource.
    pub logical_id: String,
    /// Property names that were rejected.
    pub rejected_properties: Vec<String>,
    /// Human-readable rejection reason.
    pub reason: String,
    /// Whether this rejection is surfaced in hotswap-only summaries.
    pub hotswap_only_visible: bool,
}

impl HotswappableChange {
    /// Creates a hotswappable verdict payload.
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        properties_changed: Vec<String>,
        service: impl Into<String>,
        resource_names: Vec<String>,
        apply: ApplyAction,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties_changed,
            service: service.into(),
            resource_names,
            apply,
        }
    }

    /// Name used to attribute apply outcomes to this change.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.resource_names
            .first()
            .map_or(self.resource_type.as_str(), String::as_str)
    }
}

impl NonHotswappableChange {
    /// Creates a non-hotswappable verdict payload.
    ///
    /// When `reason` is absent a message naming the rejected properties is
    /// generated, with a dedicated message when the only rejected property is
    /// the tag set.
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        logical_id: impl Into<String>,
        rejected_properties: Vec<String>,
        reason: Option<String>,
        hotswap_only_visible: bool,
    ) -> Self {
        let reason = reason.unwrap_or_else(|| default_reason(&rejected_properties));
        Self {
            resource_type: resource_type.into(),
            logical_id: logical_id.into(),
            rejected_properties,
            reason,
            hotswap_only_visible,
        }
    }
}

/// Generates the default rejection reason for a rejected property set.
fn default_reason(rejected: &[String]) -> String {
    if rejected.len() == 1 && rejected[0] == TAGS_PROPERTY {
        return String::from("Tags are not hotswappable");
    }
    format!(
        "Properties {} are not hotswappable on this resource type",
        rejected.join(", ")
    )
}

/// Appends a rejection verdict for a property subset of `candidate`.
///
/// With no explicit `rejected` list, the candidate's full property-difference
/// set is rejected. `hotswap_only_visible: false` hides the verdict from
/// hotswap-only summaries without affecting fallback-mode behavior.
pub fn report_non_hotswappable(
    results: &mut Vec<Verdict>,
    candidate: &ChangeCandidate,
    rejected: Option<Vec<String>>,
    reason: Option<String>,
    hotswap_only_visible: bool,
) {
    let rejected = rejected.unwrap_or_else(|| candidate.property_names());
    results.push(Verdict::NonHotswappable(NonHotswappableChange::new(
        candidate.resource_type(),
        &candidate.logical_id,
        rejected,
        reason,
        hotswap_only_visible,
    )));
}

/// Rejects an entire resource change outright.
///
/// Used when a policy provider determines the change is categorically
/// non-hotswappable regardless of which properties changed (e.g. the
/// resource was replaced, not updated).
#[must_use]
pub fn reject_change(candidate: &ChangeCandidate, reason: Option<String>) -> Vec<Verdict> {
    let mut results = Vec::with_capacity(1);
    report_non_hotswappable(&mut results, candidate, None, reason, true);
    results
}

impl std::fmt::Debug for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hotswappable(change) => f.debug_tuple("Hotswappable").field(change).finish(),
            Self::NonHotswappable(change) => {
                f.debug_tuple("NonHotswappable").field(change).finish()
            }
        }
    }
}

impl std::fmt::Debug for HotswappableChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotswappableChange")
            .field("resource_type", &self.resource_type)
            .field("properties_changed", &self.properties_changed)
            .field("service", &self.service)
            .field("resource_names", &self.resource_names)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for NonHotswappableChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.logical_id, self.resource_type, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyDifference, ResourceSnapshot};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn candidate(props: &[&str]) -> ChangeCandidate {
        let diffs: BTreeMap<_, _> = props
            .iter()
            .map(|name| {
                (
                    (*name).to_string(),
                    PropertyDifference::new(Some(json!(1)), Some(json!(2))),
                )
            })
            .collect();
        ChangeCandidate::new(
            "Api",
            ResourceSnapshot::new("Platform::Api::Route", json!({})),
            ResourceSnapshot::new("Platform::Api::Route", json!({})),
            diffs,
        )
    }

    #[test]
    fn tags_only_rejection_uses_dedicated_reason() {
        let change = NonHotswappableChange::new(
            "Platform::Api::Route",
            "Api",
            vec![String::from("Tags")],
            None,
            true,
        );
        assert_eq!(change.reason, "Tags are not hotswappable");
    }

    #[test]
    fn generated_reason_names_every_rejected_property() {
        let change = NonHotswappableChange::new(
            "Platform::Api::Route",
            "Api",
            vec![String::from("Cpu"), String::from("Memory")],
            None,
            true,
        );
        assert!(change.reason.contains("Cpu"));
        assert!(change.reason.contains("Memory"));
    }

    #[test]
    fn explicit_reason_is_kept_verbatim() {
        let change = NonHotswappableChange::new(
            "Platform::Api::Route",
            "Api",
            vec![String::from("Tags")],
            Some(String::from("replacement requires full deployment")),
            true,
        );
        assert_eq!(change.reason, "replacement requires full deployment");
    }

    #[test]
    fn reject_change_covers_all_properties() {
        let candidate = candidate(&["Image", "Cpu", "Tags"]);
        let verdicts = reject_change(&candidate, None);
        assert_eq!(verdicts.len(), 1);
        match &verdicts[0] {
            Verdict::NonHotswappable(change) => {
                assert_eq!(change.rejected_properties, vec!["Cpu", "Image", "Tags"]);
                assert!(change.hotswap_only_visible);
            }
            Verdict::Hotswappable(_) => panic!("expected a rejection"),
        }
    }

    #[test]
    fn report_defaults_to_visible() {
        let candidate = candidate(&["Image"]);
        let mut results = Vec::new();
        report_non_hotswappable(&mut results, &candidate, None, None, true);
        report_non_hotswappable(
            &mut results,
            &candidate,
            Some(vec![String::from("Image")]),
            None,
            false,
        );
        match (&results[0], &results[1]) {
            (Verdict::NonHotswappable(first), Verdict::NonHotswappable(second)) => {
                assert!(first.hotswap_only_visible);
                assert!(!second.hotswap_only_visible);
            }
            _ => panic!("expected two rejections"),
        }
    }
}
