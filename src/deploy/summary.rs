//! Verdict aggregation across all change candidates in one diff.

use crate::classify::{HotswappableChange, NonHotswappableChange, Verdict};

/// Accumulated verdicts for the current diff.
///
/// Verdicts are appended in candidate-evaluation order and never edited
/// after emission, so iteration over either side is deterministic.
#[derive(Debug, Default)]
pub struct VerdictSummary {
    /// Changes ready to apply out-of-band.
    hotswappable: Vec<HotswappableChange>,
    /// Changes that must go through the full pipeline (or be reported).
    non_hotswappable: Vec<NonHotswappableChange>,
}

impl VerdictSummary {
    /// Creates an empty summary.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hotswappable: Vec::new(),
            non_hotswappable: Vec::new(),
        }
    }

    /// Appends one verdict.
    pub fn push(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Hotswappable(change) => self.hotswappable.push(change),
            Verdict::NonHotswappable(change) => self.non_hotswappable.push(change),
        }
    }

    /// Appends every verdict from one candidate's evaluation.
    pub fn extend(&mut self, verdicts: Vec<Verdict>) {
        for verdict in verdicts {
            self.push(verdict);
        }
    }

    /// Changes accepted for hotswap, in evaluation order.
    #[must_use]
    pub fn hotswappable(&self) -> &[HotswappableChange] {
        &self.hotswappable
    }

    /// Rejected changes, in evaluation order.
    #[must_use]
    pub fn non_hotswappable(&self) -> &[NonHotswappableChange] {
        &self.non_hotswappable
    }

    /// Returns true if any change was rejected.
    #[must_use]
    pub fn has_non_hotswappable(&self) -> bool {
        !self.non_hotswappable.is_empty()
    }

    /// Returns true if no verdicts were recorded at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hotswappable.is_empty() && self.non_hotswappable.is_empty()
    }

    /// Rejections surfaced in hotswap-only summaries.
    #[must_use]
    pub fn visible_rejections(&self) -> Vec<&NonHotswappableChange> {
        self.non_hotswappable
            .iter()
            .filter(|change| change.hotswap_only_visible)
            .collect()
    }

    /// Splits the summary into its two outcome arrays.
    #[must_use]
    pub fn into_parts(self) -> (Vec<HotswappableChange>, Vec<NonHotswappableChange>) {
        (self.hotswappable, self.non_hotswappable)
    }
}

impl std::fmt::Display for VerdictSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} hotswappable, {} non-hotswappable",
            self.hotswappable.len(),
            self.non_hotswappable.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(logical_id: &str, visible: bool) -> Verdict {
        Verdict::NonHotswappable(NonHotswappableChange::new(
            "Platform::Test::Resource",
            logical_id,
            vec![String::from("Cpu")],
            None,
            visible,
        ))
    }

    fn acceptance(name: &str) -> Verdict {
        Verdict::Hotswappable(HotswappableChange::new(
            "Platform::Test::Resource",
            vec![String::from("Image")],
            "test",
            vec![name.to_string()],
            Box::new(|| Box::pin(async { Ok(()) })),
        ))
    }

    #[test]
    fn summary_preserves_evaluation_order() {
        let mut summary = VerdictSummary::new();
        summary.extend(vec![rejection("B", true), acceptance("one")]);
        summary.extend(vec![rejection("A", true)]);
        summary.push(acceptance("two"));

        let ids: Vec<_> = summary
            .non_hotswappable()
            .iter()
            .map(|c| c.logical_id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "A"]);

        let names: Vec<_> = summary
            .hotswappable()
            .iter()
            .map(HotswappableChange::display_name)
            .collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn visible_rejections_honor_the_flag() {
        let mut summary = VerdictSummary::new();
        summary.push(rejection("shown", true));
        summary.push(rejection("hidden", false));

        let visible: Vec<_> = summary
            .visible_rejections()
            .iter()
            .map(|c| c.logical_id.as_str())
            .collect();
        assert_eq!(visible, vec!["shown"]);
        assert!(summary.has_non_hotswappable());
    }

    #[test]
    fn empty_summary_reports_empty() {
        let summary = VerdictSummary::new();
        assert!(summary.is_empty());
        assert!(!summary.has_non_hotswappable());
        assert_eq!(summary.to_string(), "0 hotswappable, 0 non-hotswappable");
    }
}
