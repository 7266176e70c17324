use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the aggregate store keys a principal organization by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregated activity for one principal as produced by the rollup store.
///
/// Counts are signed so that upstream integrity violations can be observed
/// and clamped instead of silently wrapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRollup {
    #[serde(default)]
    pub total_interactions: i64,
    #[serde(default)]
    pub total_opportunities: i64,
    #[serde(default)]
    pub product_count: i64,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl ActivityRollup {
    pub fn new(
        total_interactions: i64,
        total_opportunities: i64,
        product_count: i64,
        last_activity_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            total_interactions,
            total_opportunities,
            product_count,
            last_activity_at,
        }
    }

    pub fn count(&self, field: RollupField) -> i64 {
        match field {
            RollupField::TotalInteractions => self.total_interactions,
            RollupField::TotalOpportunities => self.total_opportunities,
            RollupField::ProductCount => self.product_count,
        }
    }

    /// Lists every data-integrity violation in the rollup relative to `now`.
    pub fn audit(&self, now: DateTime<Utc>) -> Vec<IntegrityFault> {
        let mut faults: Vec<IntegrityFault> = RollupField::ordered()
            .into_iter()
            .filter_map(|field| {
                let value = self.count(field);
                (value < 0).then_some(IntegrityFault::NegativeCount { field, value })
            })
            .collect();

        if let Some(last_activity_at) = self.last_activity_at {
            if last_activity_at > now {
                faults.push(IntegrityFault::FutureActivity {
                    last_activity_at,
                    now,
                });
            }
        }

        faults
    }
}

/// Rollup row together with the identity of the principal it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRollup {
    pub principal_id: PrincipalId,
    pub principal_name: String,
    #[serde(flatten)]
    pub rollup: ActivityRollup,
}

impl PrincipalRollup {
    pub fn new(
        principal_id: impl Into<String>,
        principal_name: impl Into<String>,
        rollup: ActivityRollup,
    ) -> Self {
        Self {
            principal_id: PrincipalId::new(principal_id),
            principal_name: principal_name.into(),
            rollup,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupField {
    TotalInteractions,
    TotalOpportunities,
    ProductCount,
}

impl RollupField {
    pub const fn ordered() -> [Self; 3] {
        [
            Self::TotalInteractions,
            Self::TotalOpportunities,
            Self::ProductCount,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::TotalInteractions => "total interactions",
            Self::TotalOpportunities => "total opportunities",
            Self::ProductCount => "product count",
        }
    }
}

/// Data-integrity observation about a rollup. Never fails a computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityFault {
    NegativeCount {
        field: RollupField,
        value: i64,
    },
    FutureActivity {
        last_activity_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

impl IntegrityFault {
    pub fn summary(&self) -> String {
        match self {
            IntegrityFault::NegativeCount { field, value } => {
                format!("{} is negative ({value}); treated as 0", field.label())
            }
            IntegrityFault::FutureActivity {
                last_activity_at,
                now,
            } => format!(
                "last activity {} is after evaluation time {}",
                last_activity_at.to_rfc3339(),
                now.to_rfc3339()
            ),
        }
    }
}
