//! Tier classification: catalog, defensive normalization, and per-criterion scoring.

pub mod catalog;
pub mod metrics;
pub mod normalize;
pub mod rules;

pub use catalog::{TierCatalog, TierDefinition, TierKey};
pub use metrics::{LooseValue, NormalizedMetrics, RawMetricsRow};
pub use normalize::normalize;
pub use rules::{score_against, Criterion, CriterionOutcome, CriterionScores};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stateless classifier applying the tier catalog to raw feed rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationEngine {
    catalog: TierCatalog,
}

impl ClassificationEngine {
    pub fn new(catalog: TierCatalog) -> Self {
        Self { catalog }
    }

    pub fn normalize(&self, row: &RawMetricsRow) -> NormalizedMetrics {
        normalize(row)
    }

    /// The row's self-reported tier, taken as given rather than derived from metrics.
    pub fn resolve_achieved_tier(&self, row: &RawMetricsRow) -> TierKey {
        self.catalog.by_label(&row.projected_tier.text()).key
    }

    pub fn score_against(
        &self,
        metrics: &NormalizedMetrics,
        achieved: TierKey,
        definition: &TierDefinition,
    ) -> CriterionScores {
        score_against(metrics, achieved, definition)
    }

    pub fn build_comparison_board(&self, row: &RawMetricsRow) -> ComparisonBoard {
        let metrics = self.normalize(row);
        self.compare(&metrics, self.resolve_achieved_tier(row))
    }

    fn compare(&self, metrics: &NormalizedMetrics, achieved_tier: TierKey) -> ComparisonBoard {
        let per_tier_breakdown = self
            .catalog
            .tiers_ordered_by_rank()
            .iter()
            .map(|definition| {
                (
                    definition.key,
                    self.score_against(metrics, achieved_tier, definition),
                )
            })
            .collect();

        ComparisonBoard {
            achieved_tier,
            per_tier_breakdown,
        }
    }

    pub fn classify(&self, row: &RawMetricsRow) -> ClassificationResult {
        let metrics = self.normalize(row);
        let ComparisonBoard {
            achieved_tier,
            per_tier_breakdown,
        } = self.compare(&metrics, self.resolve_achieved_tier(row));

        let next_tier = achieved_tier.next().map(|tier| {
            let unmet = per_tier_breakdown
                .get(&tier)
                .map(CriterionScores::unmet_point_criteria)
                .unwrap_or_default();
            NextTierGap {
                tier,
                missing_criteria: unmet,
            }
        });

        ClassificationResult {
            representative: row.representative_name(),
            supervisor: row.supervisor_name(),
            achieved_tier,
            metrics,
            comparisons: per_tier_breakdown,
            next_tier,
        }
    }

    /// Classify every row and order them for a ranking grid.
    pub fn classify_all(&self, rows: &[RawMetricsRow]) -> TierBoard {
        let mut representatives: Vec<ClassificationResult> =
            rows.iter().map(|row| self.classify(row)).collect();

        representatives.sort_by(|a, b| {
            b.achieved_tier
                .cmp(&a.achieved_tier)
                .then_with(|| b.progress_points().cmp(&a.progress_points()))
                .then_with(|| a.representative.cmp(&b.representative))
        });

        let mut distribution: BTreeMap<TierKey, usize> =
            TierKey::ordered().into_iter().map(|tier| (tier, 0)).collect();
        for result in &representatives {
            *distribution.entry(result.achieved_tier).or_default() += 1;
        }

        TierBoard {
            representatives,
            distribution,
        }
    }
}

/// Breakdown of one representative against every achievement tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonBoard {
    pub achieved_tier: TierKey,
    pub per_tier_breakdown: BTreeMap<TierKey, CriterionScores>,
}

/// Point-bearing criteria still missing for the tier above the achieved one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextTierGap {
    pub tier: TierKey,
    pub missing_criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub representative: String,
    pub supervisor: String,
    pub achieved_tier: TierKey,
    pub metrics: NormalizedMetrics,
    pub comparisons: BTreeMap<TierKey, CriterionScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier: Option<NextTierGap>,
}

impl ClassificationResult {
    /// Points against the next tier up, or against the achieved tier for Senior.
    pub fn progress_points(&self) -> u32 {
        let target = self
            .achieved_tier
            .next()
            .unwrap_or(self.achieved_tier);
        self.comparisons
            .get(&target)
            .map(|scores| scores.total_points)
            .unwrap_or(0)
    }
}

/// Classified representatives for one branch, ranked high tier first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBoard {
    pub representatives: Vec<ClassificationResult>,
    pub distribution: BTreeMap<TierKey, usize>,
}

impl TierBoard {
    pub fn find(&self, representative: &str) -> Option<&ClassificationResult> {
        self.representatives
            .iter()
            .find(|result| result.representative.eq_ignore_ascii_case(representative.trim()))
    }
}
