use super::catalog::{TierDefinition, TierKey};
use super::metrics::NormalizedMetrics;
use serde::{Deserialize, Serialize};

/// Measurable dimensions checked against a tier definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Billing,
    Efficiency,
    Coverage,
    Volume,
    PosPresence,
    Display,
    RouteSchedule,
    Effectiveness,
}

impl Criterion {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Billing,
            Self::Efficiency,
            Self::Coverage,
            Self::Volume,
            Self::PosPresence,
            Self::Display,
            Self::RouteSchedule,
            Self::Effectiveness,
        ]
    }

    /// Fixed point schedule. Route schedule and effectiveness are informational and
    /// never add to the total.
    pub const fn points(self) -> u32 {
        match self {
            Self::Billing => 30,
            Self::Efficiency => 15,
            Self::Coverage => 15,
            Self::Volume => 15,
            Self::PosPresence => 15,
            Self::Display => 10,
            Self::RouteSchedule | Self::Effectiveness => 0,
        }
    }

    pub const fn is_point_bearing(self) -> bool {
        self.points() > 0
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Billing => "Billing",
            Self::Efficiency => "Efficiency",
            Self::Coverage => "Coverage",
            Self::Volume => "Volume",
            Self::PosPresence => "Point-of-sale presence",
            Self::Display => "Display compliance",
            Self::RouteSchedule => "Route schedule",
            Self::Effectiveness => "Effectiveness",
        }
    }
}

/// Outcome of one criterion against one tier definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionOutcome {
    pub criterion: Criterion,
    pub met: bool,
    pub points: u32,
    pub required: String,
    pub actual: String,
}

/// Per-criterion breakdown for one comparison tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub tier: TierKey,
    pub criteria: Vec<CriterionOutcome>,
    pub total_points: u32,
    pub achievable_points: u32,
}

impl CriterionScores {
    pub fn outcome(&self, criterion: Criterion) -> Option<&CriterionOutcome> {
        self.criteria.iter().find(|outcome| outcome.criterion == criterion)
    }

    pub fn met(&self, criterion: Criterion) -> bool {
        self.outcome(criterion).map(|outcome| outcome.met).unwrap_or(false)
    }

    /// Point-bearing criteria that did not pass.
    pub fn unmet_point_criteria(&self) -> Vec<Criterion> {
        self.criteria
            .iter()
            .filter(|outcome| outcome.criterion.is_point_bearing() && !outcome.met)
            .map(|outcome| outcome.criterion)
            .collect()
    }
}

pub fn score_against(
    metrics: &NormalizedMetrics,
    achieved: TierKey,
    definition: &TierDefinition,
) -> CriterionScores {
    let criteria: Vec<CriterionOutcome> = Criterion::ordered()
        .into_iter()
        .map(|criterion| evaluate(criterion, metrics, achieved, definition))
        .collect();

    let total_points = criteria.iter().map(|outcome| outcome.points).sum();

    CriterionScores {
        tier: definition.key,
        criteria,
        total_points,
        achievable_points: definition.total_points,
    }
}

fn evaluate(
    criterion: Criterion,
    metrics: &NormalizedMetrics,
    achieved: TierKey,
    definition: &TierDefinition,
) -> CriterionOutcome {
    let (met, required, actual) = match criterion {
        Criterion::Billing => (
            achieved.rank() >= definition.required_billing_tier.rank(),
            definition.required_billing_tier.label().to_string(),
            achieved.label().to_string(),
        ),
        Criterion::Efficiency => percent(metrics.efficiency, definition.efficiency_threshold),
        Criterion::Coverage => units(metrics.coverage, definition.coverage_threshold),
        Criterion::Volume => units(metrics.volume, definition.volume_threshold),
        Criterion::PosPresence => {
            percent(metrics.pos_presence, definition.pos_presence_threshold)
        }
        Criterion::Display => percent(metrics.display_compliance, definition.display_threshold),
        Criterion::RouteSchedule => requirement(
            metrics.route_compliance,
            definition.route_schedule_required,
        ),
        Criterion::Effectiveness => requirement(
            metrics.effectiveness_compliance,
            definition.effectiveness_required,
        ),
    };

    CriterionOutcome {
        criterion,
        met,
        points: if met { criterion.points() } else { 0 },
        required,
        actual,
    }
}

fn percent(actual: f64, threshold: f64) -> (bool, String, String) {
    (
        actual >= threshold,
        format!("{threshold:.1}%"),
        format!("{actual:.1}%"),
    )
}

fn units(actual: u32, threshold: u32) -> (bool, String, String) {
    (actual >= threshold, threshold.to_string(), actual.to_string())
}

fn requirement(actual: bool, required: bool) -> (bool, String, String) {
    let describe = |flag: bool| if flag { "yes" } else { "no" }.to_string();
    (actual || !required, describe(required), describe(actual))
}
