use serde::{Deserialize, Serialize};

/// Closed set of performance tiers, declared from lowest to highest rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierKey {
    ImprovementPlan,
    Junior,
    SemiSenior,
    Senior,
}

impl TierKey {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::ImprovementPlan,
            Self::Junior,
            Self::SemiSenior,
            Self::Senior,
        ]
    }

    pub const fn rank(self) -> u8 {
        match self {
            Self::ImprovementPlan => 0,
            Self::Junior => 1,
            Self::SemiSenior => 2,
            Self::Senior => 3,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::ImprovementPlan => "IMPROVEMENT_PLAN",
            Self::Junior => "JUNIOR",
            Self::SemiSenior => "SEMI_SENIOR",
            Self::Senior => "SENIOR",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ImprovementPlan => "Improvement Plan",
            Self::Junior => "Junior",
            Self::SemiSenior => "Semi-Senior",
            Self::Senior => "Senior",
        }
    }

    /// The tier one rank above, if any.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::ImprovementPlan => Some(Self::Junior),
            Self::Junior => Some(Self::SemiSenior),
            Self::SemiSenior => Some(Self::Senior),
            Self::Senior => None,
        }
    }

    /// Total mapping from a free-form label to a tier key.
    ///
    /// Labels are uppercased and spaces/hyphens collapse to underscores before matching.
    /// Anything unrecognized, including an empty label, lands on [`TierKey::ImprovementPlan`].
    pub fn from_label(raw: &str) -> Self {
        let token = raw
            .trim()
            .to_uppercase()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        match token.as_str() {
            "JUNIOR" => Self::Junior,
            "SEMI_SENIOR" | "SEMISENIOR" => Self::SemiSenior,
            "SENIOR" => Self::Senior,
            "IMPROVEMENT_PLAN" | "PLAN_DE_MEJORA" | "PLAN_MEJORA" => Self::ImprovementPlan,
            _ => Self::ImprovementPlan,
        }
    }
}

/// Requirements a representative must meet to be credited at one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierDefinition {
    pub rank: u8,
    pub key: TierKey,
    pub required_billing_tier: TierKey,
    pub route_schedule_required: bool,
    pub effectiveness_required: bool,
    pub efficiency_threshold: f64,
    pub coverage_threshold: u32,
    pub volume_threshold: u32,
    pub pos_presence_threshold: f64,
    pub display_threshold: f64,
    /// Presentation denominator; not used by the pass/fail rules.
    pub total_points: u32,
}

const JUNIOR: TierDefinition = TierDefinition {
    rank: TierKey::Junior.rank(),
    key: TierKey::Junior,
    required_billing_tier: TierKey::Junior,
    route_schedule_required: false,
    effectiveness_required: false,
    efficiency_threshold: 70.0,
    coverage_threshold: 60,
    volume_threshold: 40,
    pos_presence_threshold: 60.0,
    display_threshold: 60.0,
    total_points: 100,
};

const SEMI_SENIOR: TierDefinition = TierDefinition {
    rank: TierKey::SemiSenior.rank(),
    key: TierKey::SemiSenior,
    required_billing_tier: TierKey::SemiSenior,
    route_schedule_required: true,
    effectiveness_required: false,
    efficiency_threshold: 80.0,
    coverage_threshold: 80,
    volume_threshold: 60,
    pos_presence_threshold: 70.0,
    display_threshold: 70.0,
    total_points: 100,
};

const SENIOR: TierDefinition = TierDefinition {
    rank: TierKey::Senior.rank(),
    key: TierKey::Senior,
    required_billing_tier: TierKey::Senior,
    route_schedule_required: true,
    effectiveness_required: true,
    efficiency_threshold: 90.0,
    coverage_threshold: 100,
    volume_threshold: 80,
    pos_presence_threshold: 80.0,
    display_threshold: 80.0,
    total_points: 100,
};

const IMPROVEMENT_PLAN: TierDefinition = TierDefinition {
    rank: TierKey::ImprovementPlan.rank(),
    key: TierKey::ImprovementPlan,
    required_billing_tier: TierKey::ImprovementPlan,
    route_schedule_required: false,
    effectiveness_required: false,
    efficiency_threshold: 0.0,
    coverage_threshold: 0,
    volume_threshold: 0,
    pos_presence_threshold: 0.0,
    display_threshold: 0.0,
    total_points: 0,
};

static ACHIEVEMENT_TIERS: [TierDefinition; 3] = [JUNIOR, SEMI_SENIOR, SENIOR];

/// Immutable tier catalog shared by every classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct TierCatalog;

impl TierCatalog {
    pub fn standard() -> Self {
        Self
    }

    /// Achievement tiers from lowest to highest rank.
    pub fn tiers_ordered_by_rank(&self) -> &'static [TierDefinition] {
        &ACHIEVEMENT_TIERS
    }

    pub fn fallback_tier(&self) -> &'static TierDefinition {
        &IMPROVEMENT_PLAN
    }

    pub fn by_key(&self, key: TierKey) -> &'static TierDefinition {
        ACHIEVEMENT_TIERS
            .iter()
            .find(|definition| definition.key == key)
            .unwrap_or(&IMPROVEMENT_PLAN)
    }

    /// Lookup by free-form label, falling back to the Improvement Plan tier.
    pub fn by_label(&self, label: &str) -> &'static TierDefinition {
        self.by_key(TierKey::from_label(label))
    }
}
