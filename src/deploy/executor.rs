//! Mode decision and concurrent application of hotswappable changes.
//!
//! This module turns an aggregated [`VerdictSummary`] into action: it applies
//! the operator-selected [`HotswapMode`] table, launches every accepted apply
//! action concurrently, waits for all of them to settle, and hands off to the
//! full pipeline when the mode calls for it.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::classify::{HotswappableChange, NonHotswappableChange};
use crate::error::{ApplyError, Result};
use crate::model::ChangeCandidate;
use crate::overrides::HotswapOverrides;
use crate::policy::PolicyRegistry;

use super::summary::VerdictSummary;

/// Operator-selected hotswap behavior for one deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HotswapMode {
    /// Apply hotswappable changes; fall back to the full pipeline if any
    /// non-hotswappable change exists.
    Fallback,
    /// Apply hotswappable changes; report rejections but never fall back.
    HotswapOnly,
    /// Skip hotswap entirely and run the full pipeline.
    FullDeployment,
}

/// What the mode table dictates for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePlan {
    /// Whether to invoke the hotswappable changes' apply actions.
    pub apply_hotswappable: bool,
    /// Whether rejections are surfaced to the operator.
    pub report_rejections: bool,
    /// Whether the full pipeline runs for the whole stack.
    pub run_full_pipeline: bool,
}

/// Full-pipeline deployment seam, used on fallback and full-deployment runs.
///
/// The pipeline is authoritative: it re-applies all changes from scratch, so
/// it runs regardless of whether any hotswap applies in the same run failed.
#[async_trait]
pub trait FullDeployment: Send + Sync {
    /// Runs the full stack-update pipeline.
    async fn deploy(&self) -> Result<()>;
}

/// Outcome of one resource's apply action.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    /// Resource name the apply was attributed to.
    pub resource: String,
    /// Service/category of the change.
    pub service: String,
    /// Error message if the apply failed.
    pub error: Option<String>,
}

/// Settled results of applying every hotswappable change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// Per-resource outcomes, in verdict order.
    pub outcomes: Vec<ApplyOutcome>,
}

/// Final record of one deployment run.
#[derive(Debug)]
pub struct DeploymentOutcome {
    /// Mode the run executed under.
    pub mode: HotswapMode,
    /// Settled apply results (empty when the mode skipped hotswap).
    pub apply_report: ApplyReport,
    /// Rejections surfaced to the operator, honoring the mode's reporting
    /// rules and each verdict's visibility flag.
    pub rejections: Vec<NonHotswappableChange>,
    /// Whether the full pipeline ran.
    pub full_pipeline_ran: bool,
}

/// Driver that evaluates candidates and executes the mode table.
pub struct HotswapDeployer {
    /// Policy providers keyed by resource-type tag.
    registry: PolicyRegistry,
    /// Per-deployment configuration overrides, read-only after construction.
    overrides: HotswapOverrides,
}

impl ModePlan {
    /// Applies the mode table to the aggregated verdicts.
    #[must_use]
    pub fn decide(mode: HotswapMode, summary: &VerdictSummary) -> Self {
        match mode {
            HotswapMode::FullDeployment => Self {
                apply_hotswappable: false,
                report_rejections: false,
                run_full_pipeline: true,
            },
            HotswapMode::HotswapOnly => Self {
                apply_hotswappable: true,
                report_rejections: true,
                run_full_pipeline: false,
            },
            HotswapMode::Fallback => Self {
                apply_hotswappable: true,
                report_rejections: true,
                run_full_pipeline: summary.has_non_hotswappable(),
            },
        }
    }
}

impl HotswapDeployer {
    /// Creates a deployer from a policy registry and validated overrides.
    #[must_use]
    pub const fn new(registry: PolicyRegistry, overrides: HotswapOverrides) -> Self {
        Self {
            registry,
            overrides,
        }
    }

    /// Evaluates every candidate into an aggregated verdict summary.
    ///
    /// Verdicts accumulate in candidate order; classification for a resource
    /// always completes here, before any of its apply actions launch.
    ///
    /// # Errors
    ///
    /// Returns an error if a policy fails to bind an apply action.
    pub fn evaluate(&self, candidates: &[ChangeCandidate]) -> Result<VerdictSummary> {
        let mut summary = VerdictSummary::new();
        for candidate in candidates {
            let verdicts = self.registry.evaluate(candidate, &self.overrides)?;
            summary.extend(verdicts);
        }
        debug!(%summary, "Evaluated {} change candidates", candidates.len());
        Ok(summary)
    }

    /// Runs one deployment attempt end to end.
    ///
    /// Classifies all candidates, then executes the mode table: apply
    /// hotswappable changes concurrently, surface rejections, and hand off to
    /// `pipeline` when the mode calls for it. Per-resource apply failures are
    /// recorded in the outcome, never fatal to the run; a failing full
    /// pipeline is.
    ///
    /// # Errors
    ///
    /// Returns an error if verdict evaluation or the full-pipeline run fails.
    pub async fn run(
        &self,
        mode: HotswapMode,
        candidates: &[ChangeCandidate],
        pipeline: &dyn FullDeployment,
    ) -> Result<DeploymentOutcome> {
        let summary = self.evaluate(candidates)?;
        let plan = ModePlan::decide(mode, &summary);
        info!(?mode, %summary, "Decided hotswap plan");

        let rejections = if plan.report_rejections {
            match mode {
                HotswapMode::HotswapOnly => summary
                    .visible_rejections()
                    .into_iter()
                    .cloned()
                    .collect(),
                _ => summary.non_hotswappable().to_vec(),
            }
        } else {
            Vec::new()
        };

        let (hotswappable, _) = summary.into_parts();
        let apply_report = if plan.apply_hotswappable {
            apply_all(hotswappable).await
        } else {
            debug!("Skipping hotswap applies in {mode} mode");
            ApplyReport::default()
        };

        if let Some(partial) = apply_report.partial_failure() {
            error!("{partial}");
        }

        let full_pipeline_ran = plan.run_full_pipeline;
        if full_pipeline_ran {
            info!("Handing off to full deployment pipeline");
            pipeline.deploy().await?;
        }

        Ok(DeploymentOutcome {
            mode,
            apply_report,
            rejections,
            full_pipeline_ran,
        })
    }
}

/// Applies every hotswappable change concurrently and waits for all of them
/// to settle.
///
/// Resources are independent at this level, so no cross-resource ordering is
/// imposed. One resource's failure never prevents the others from
/// completing; each outcome is recorded per resource.
async fn apply_all(changes: Vec<HotswappableChange>) -> ApplyReport {
    if changes.is_empty() {
        return ApplyReport::default();
    }

    let total = changes.len();
    info!("Applying {total} hotswappable changes");

    let mut tasks = JoinSet::new();
    let mut attribution: HashMap<tokio::task::Id, (usize, String, String)> = HashMap::new();

    for (index, change) in changes.into_iter().enumerate() {
        let resource = change.display_name().to_string();
        let service = change.service.clone();
        debug!(resource, service, "Launching apply action");

        let handle = tasks.spawn(async move { (index, (change.apply)().await) });
        attribution.insert(handle.id(), (index, resource, service));
    }

    let mut settled: Vec<Option<ApplyOutcome>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, (index, result))) => {
                let (_, resource, service) = attribution
                    .remove(&id)
                    .unwrap_or((index, String::from("unknown"), String::new()));
                let outcome = match result {
                    Ok(()) => {
                        info!(resource, "Hotswap apply succeeded");
                        ApplyOutcome {
                            resource,
                            service,
                            error: None,
                        }
                    }
                    Err(e) => {
                        error!(resource, "Hotswap apply failed: {e}");
                        ApplyOutcome {
                            resource,
                            service,
                            error: Some(e.to_string()),
                        }
                    }
                };
                settled[index] = Some(outcome);
            }
            Err(join_error) => {
                // Apply task panicked or was cancelled before settling.
                let (index, resource, service) = attribution
                    .remove(&join_error.id())
                    .unwrap_or((0, String::from("unknown"), String::new()));
                let failure = ApplyError::TaskFailed {
                    resource: resource.clone(),
                    cause: join_error.to_string(),
                };
                error!("{failure}");
                settled[index] = Some(ApplyOutcome {
                    resource,
                    service,
                    error: Some(failure.to_string()),
                });
            }
        }
    }

    let outcomes = settled.into_iter().flatten().collect();
    ApplyReport { outcomes }
}

impl ApplyOutcome {
    /// Returns true if the apply succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.error.is_none()
    }
}

impl ApplyReport {
    /// Number of successful applies.
    #[must_use]
    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }

    /// Number of failed applies.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success()).count()
    }

    /// Returns true if every apply succeeded.
    #[must_use]
    pub fn all_successful(&self) -> bool {
        self.failed() == 0
    }

    /// Builds the deployment-level partial-failure summary, if any apply
    /// failed.
    #[must_use]
    pub fn partial_failure(&self) -> Option<ApplyError> {
        let failed: Vec<_> = self
            .outcomes
            .iter()
            .filter(|o| !o.success())
            .map(|o| o.resource.as_str())
            .collect();
        if failed.is_empty() {
            return None;
        }
        Some(ApplyError::PartialFailure {
            failed: failed.len(),
            total: self.outcomes.len(),
            resources: failed.join(", "),
        })
    }
}

impl std::fmt::Display for HotswapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fallback => "fallback",
            Self::HotswapOnly => "hotswap-only",
            Self::FullDeployment => "full-deployment",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for HotswapMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fallback" => Ok(Self::Fallback),
            "hotswap-only" => Ok(Self::HotswapOnly),
            "full-deployment" => Ok(Self::FullDeployment),
            other => Err(format!("unknown hotswap mode: {other}")),
        }
    }
}

impl std::fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Applied {} changes: {} successful, {} failed",
            self.outcomes.len(),
            self.successful(),
            self.failed()
        )
    }
}

impl std::fmt::Display for DeploymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Deployment run ({} mode)", self.mode)?;
        for outcome in &self.apply_report.outcomes {
            match &outcome.error {
                None => writeln!(f, "  hotswapped: {} [{}]", outcome.resource, outcome.service)?,
                Some(e) => writeln!(f, "  failed: {} [{}]: {e}", outcome.resource, outcome.service)?,
            }
        }
        for rejection in &self.rejections {
            writeln!(f, "  rejected: {rejection}")?;
        }
        if self.full_pipeline_ran {
            writeln!(f, "  full pipeline: ran")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyDifference, ResourceSnapshot};
    use crate::policy::{BoundApply, ResourceTypePolicy};
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const RESOURCE_TYPE: &str = "Platform::Container::Service";

    /// Policy accepting `Image`, counting every apply invocation; applies for
    /// resources whose logical id starts with `fail-` fail.
    struct CountingPolicy {
        applies: Arc<AtomicUsize>,
    }

    impl ResourceTypePolicy for CountingPolicy {
        fn service(&self) -> &'static str {
            "container-service"
        }

        fn allowed_properties(&self) -> BTreeSet<String> {
            [String::from("Image")].into_iter().collect()
        }

        fn build_apply(
            &self,
            candidate: &ChangeCandidate,
            _accepted_properties: &[String],
            _overrides: &HotswapOverrides,
        ) -> Result<BoundApply> {
            let applies = Arc::clone(&self.applies);
            let name = candidate.logical_id.clone();
            let should_fail = name.starts_with("fail-");
            Ok(BoundApply {
                resource_names: vec![name.clone()],
                action: Box::new(move || {
                    Box::pin(async move {
                        applies.fetch_add(1, Ordering::SeqCst);
                        if should_fail {
                            return Err(ApplyError::resource_failed(name, "control plane said no")
                                .into());
                        }
                        Ok(())
                    })
                }),
            })
        }
    }

    struct CountingPipeline {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FullDeployment for CountingPipeline {
        async fn deploy(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn candidate(logical_id: &str, props: &[&str]) -> ChangeCandidate {
        let diffs: BTreeMap<_, _> = props
            .iter()
            .map(|name| {
                (
                    (*name).to_string(),
                    PropertyDifference::new(Some(json!("a")), Some(json!("b"))),
                )
            })
            .collect();
        ChangeCandidate::new(
            logical_id,
            ResourceSnapshot::new(RESOURCE_TYPE, json!({})),
            ResourceSnapshot::new(RESOURCE_TYPE, json!({})),
            diffs,
        )
    }

    fn harness() -> (HotswapDeployer, Arc<AtomicUsize>, CountingPipeline, Arc<AtomicUsize>) {
        let applies = Arc::new(AtomicUsize::new(0));
        let mut registry = PolicyRegistry::new();
        registry.register(
            RESOURCE_TYPE,
            Box::new(CountingPolicy {
                applies: Arc::clone(&applies),
            }),
        );
        let deployer = HotswapDeployer::new(registry, HotswapOverrides::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let pipeline = CountingPipeline {
            runs: Arc::clone(&runs),
        };
        (deployer, applies, pipeline, runs)
    }

    /// Diff with one hotswappable candidate and one rejected candidate.
    fn mixed_diff() -> Vec<ChangeCandidate> {
        vec![candidate("web", &["Image"]), candidate("db", &["Engine"])]
    }

    #[tokio::test]
    async fn full_deployment_mode_skips_applies_and_runs_pipeline() {
        let (deployer, applies, pipeline, runs) = harness();
        let outcome = deployer
            .run(HotswapMode::FullDeployment, &mixed_diff(), &pipeline)
            .await
            .expect("run succeeds");

        assert_eq!(applies.load(Ordering::SeqCst), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(outcome.full_pipeline_ran);
        assert!(outcome.apply_report.outcomes.is_empty());
        assert!(outcome.rejections.is_empty());
    }

    #[tokio::test]
    async fn hotswap_only_mode_applies_and_never_falls_back() {
        let (deployer, applies, pipeline, runs) = harness();
        let outcome = deployer
            .run(HotswapMode::HotswapOnly, &mixed_diff(), &pipeline)
            .await
            .expect("run succeeds");

        assert_eq!(applies.load(Ordering::SeqCst), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!outcome.full_pipeline_ran);
        assert_eq!(outcome.apply_report.successful(), 1);
        assert_eq!(outcome.rejections.len(), 1);
        assert_eq!(outcome.rejections[0].logical_id, "db");
    }

    #[tokio::test]
    async fn fallback_mode_applies_then_runs_pipeline_once() {
        let (deployer, applies, pipeline, runs) = harness();
        let outcome = deployer
            .run(HotswapMode::Fallback, &mixed_diff(), &pipeline)
            .await
            .expect("run succeeds");

        assert_eq!(applies.load(Ordering::SeqCst), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(outcome.full_pipeline_ran);
        assert_eq!(outcome.rejections.len(), 1);
    }

    #[tokio::test]
    async fn fallback_without_rejections_skips_pipeline() {
        let (deployer, applies, pipeline, runs) = harness();
        let diff = vec![candidate("web", &["Image"])];
        let outcome = deployer
            .run(HotswapMode::Fallback, &diff, &pipeline)
            .await
            .expect("run succeeds");

        assert_eq!(applies.load(Ordering::SeqCst), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!outcome.full_pipeline_ran);
    }

    #[tokio::test]
    async fn failed_apply_does_not_abort_siblings() {
        let (deployer, applies, pipeline, _) = harness();
        let diff = vec![
            candidate("fail-api", &["Image"]),
            candidate("web", &["Image"]),
        ];
        let outcome = deployer
            .run(HotswapMode::HotswapOnly, &diff, &pipeline)
            .await
            .expect("run succeeds");

        assert_eq!(applies.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.apply_report.successful(), 1);
        assert_eq!(outcome.apply_report.failed(), 1);

        // Outcomes stay in verdict order and attribute the failure.
        assert_eq!(outcome.apply_report.outcomes[0].resource, "fail-api");
        assert!(!outcome.apply_report.outcomes[0].success());
        assert!(outcome.apply_report.outcomes[1].success());

        let partial = outcome
            .apply_report
            .partial_failure()
            .expect("partial failure expected");
        assert!(partial.to_string().contains("fail-api"));
    }

    #[tokio::test]
    async fn fallback_pipeline_runs_even_when_applies_fail() {
        let (deployer, _, pipeline, runs) = harness();
        let diff = vec![
            candidate("fail-api", &["Image"]),
            candidate("db", &["Engine"]),
        ];
        let outcome = deployer
            .run(HotswapMode::Fallback, &diff, &pipeline)
            .await
            .expect("run succeeds");

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.apply_report.failed(), 1);
        assert!(outcome.full_pipeline_ran);
    }

    #[tokio::test]
    async fn hotswap_only_hides_invisible_rejections() {
        let (deployer, _, pipeline, _) = harness();
        // No registered policy for this type; rejection is visible by default,
        // so build a hidden one through the summary path instead.
        let mut summary = VerdictSummary::new();
        summary.push(crate::classify::Verdict::NonHotswappable(
            NonHotswappableChange::new(RESOURCE_TYPE, "quiet", vec![String::from("Cpu")], None, false),
        ));
        let plan = ModePlan::decide(HotswapMode::HotswapOnly, &summary);
        assert!(plan.report_rejections);
        assert!(summary.visible_rejections().is_empty());

        // End-to-end, a visible rejection still surfaces.
        let outcome = deployer
            .run(HotswapMode::HotswapOnly, &[candidate("db", &["Engine"])], &pipeline)
            .await
            .expect("run succeeds");
        assert_eq!(outcome.rejections.len(), 1);
    }

    #[test]
    fn mode_round_trips_through_strings() {
        for mode in [
            HotswapMode::Fallback,
            HotswapMode::HotswapOnly,
            HotswapMode::FullDeployment,
        ] {
            let parsed: HotswapMode = mode.to_string().parse().expect("parse succeeds");
            assert_eq!(parsed, mode);
        }
        assert!("classic".parse::<HotswapMode>().is_err());
    }
}
