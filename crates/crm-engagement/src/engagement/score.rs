use super::domain::{ActivityRollup, RollupField};
use super::status::elapsed_days;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ceiling every component saturates at before weighting.
const COMPONENT_CAP: i64 = 100;

const INTERACTION_POINTS: i64 = 2;
const OPPORTUNITY_POINTS: i64 = 10;
const PRODUCT_POINTS: i64 = 20;

// Weights in tenths so the weighted sum stays exact: 0.3 / 0.4 / 0.2 / 0.1.
const INTERACTION_WEIGHT: i64 = 3;
const OPPORTUNITY_WEIGHT: i64 = 4;
const PRODUCT_WEIGHT: i64 = 2;
const RECENCY_WEIGHT: i64 = 1;
const WEIGHT_SCALE: i64 = 10;

/// Composite 0-100 engagement score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngagementScore(u8);

impl EngagementScore {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(100);

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for EngagementScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
    Interactions,
    Opportunities,
    Products,
    Recency,
}

impl ScoreComponent {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Interactions,
            Self::Opportunities,
            Self::Products,
            Self::Recency,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Interactions => "Interactions",
            Self::Opportunities => "Opportunities",
            Self::Products => "Products",
            Self::Recency => "Recency",
        }
    }

    /// Weight in tenths of the final score.
    pub const fn weight_tenths(self) -> i64 {
        match self {
            Self::Interactions => INTERACTION_WEIGHT,
            Self::Opportunities => OPPORTUNITY_WEIGHT,
            Self::Products => PRODUCT_WEIGHT,
            Self::Recency => RECENCY_WEIGHT,
        }
    }

    pub fn weight(self) -> f32 {
        self.weight_tenths() as f32 / WEIGHT_SCALE as f32
    }
}

/// One component of a score with its weight and weighted contribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedComponent {
    pub component: ScoreComponent,
    pub score: u8,
    pub weight: f32,
    pub contribution: f32,
}

impl WeightedComponent {
    fn new(component: ScoreComponent, score: u8) -> Self {
        Self {
            component,
            score,
            weight: component.weight(),
            contribution: (i64::from(score) * component.weight_tenths()) as f32
                / WEIGHT_SCALE as f32,
        }
    }
}

/// Capped component scores behind a composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub interaction_score: u8,
    pub opportunity_score: u8,
    pub product_score: u8,
    pub recency_score: u8,
    /// Every component in `ScoreComponent::ordered()` order.
    pub components: Vec<WeightedComponent>,
    pub total: EngagementScore,
}

fn capped(count: i64, points: i64) -> i64 {
    count.max(0).saturating_mul(points).min(COMPONENT_CAP)
}

fn recency(last_activity_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match last_activity_at {
        None => 0,
        Some(at) => COMPONENT_CAP
            .saturating_sub(elapsed_days(at, now))
            .clamp(0, COMPONENT_CAP),
    }
}

/// Computes every component and the rounded weighted total.
pub fn breakdown(rollup: &ActivityRollup, now: DateTime<Utc>) -> ScoreBreakdown {
    let interaction = capped(
        rollup.count(RollupField::TotalInteractions),
        INTERACTION_POINTS,
    );
    let opportunity = capped(
        rollup.count(RollupField::TotalOpportunities),
        OPPORTUNITY_POINTS,
    );
    let product = capped(rollup.count(RollupField::ProductCount), PRODUCT_POINTS);
    let recency = recency(rollup.last_activity_at, now);

    let tenths = interaction * INTERACTION_WEIGHT
        + opportunity * OPPORTUNITY_WEIGHT
        + product * PRODUCT_WEIGHT
        + recency * RECENCY_WEIGHT;
    // round half up
    let total = (tenths + WEIGHT_SCALE / 2) / WEIGHT_SCALE;

    let scores = [interaction, opportunity, product, recency].map(to_points);
    let components = ScoreComponent::ordered()
        .into_iter()
        .zip(scores)
        .map(|(component, score)| WeightedComponent::new(component, score))
        .collect();

    ScoreBreakdown {
        interaction_score: scores[0],
        opportunity_score: scores[1],
        product_score: scores[2],
        recency_score: scores[3],
        components,
        total: EngagementScore(to_points(total)),
    }
}

/// Scores a rollup on the 0-100 engagement scale.
pub fn score(rollup: &ActivityRollup, now: DateTime<Utc>) -> EngagementScore {
    breakdown(rollup, now).total
}

fn to_points(value: i64) -> u8 {
    value.clamp(0, COMPONENT_CAP) as u8
}
