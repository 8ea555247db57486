//! Error types for the planning engine

use thiserror::Error;

use crate::models::{RegionId, SystemId, TypeId};

/// What is wrong with a dependency graph that cannot be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFault {
    /// The item appears among its own ancestors
    Cycle,
    DepthLimit(usize),
    /// Blueprint claims to produce nothing per run
    ZeroOutput,
}

impl std::fmt::Display for GraphFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphFault::Cycle => write!(f, "cycle detected"),
            GraphFault::DepthLimit(limit) => {
                write!(f, "chain deeper than {limit} levels, possible cycle")
            }
            GraphFault::ZeroOutput => write!(f, "blueprint outputs zero units per run"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("item {0} not found")]
    NotFound(TypeId),

    #[error("item {0} has no blueprint")]
    NoBlueprint(TypeId),

    #[error("malformed dependency graph at item {item}: {fault}")]
    MalformedGraph { item: TypeId, fault: GraphFault },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("runs must be at least 1")]
    InvalidRuns,

    #[error("quantity overflow while computing {context}")]
    Overflow { context: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl PlanError {
    pub fn overflow(context: impl Into<String>) -> Self {
        PlanError::Overflow {
            context: context.into(),
        }
    }

    /// True for cycle and depth-limit failures.
    pub fn is_structural(&self) -> bool {
        matches!(self, PlanError::MalformedGraph { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;

/// Non-fatal conditions attached to an otherwise successful plan.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// No quote for the item in the region
    NoQuote { item_id: TypeId, region_id: RegionId },
    /// Required quantity exceeds stock across every known region
    Unfulfillable {
        item_id: TypeId,
        required: u64,
        available: u64,
    },
    /// The chosen region alone cannot clear the quantity
    ThinStock {
        item_id: TypeId,
        region_id: RegionId,
        required: u64,
        available: u64,
    },
    /// Home cannot supply the full quantity, so the baseline uses the route price
    NotStockedAtHome { item_id: TypeId, region_id: RegionId },
    /// Material missing from the item table; its volume counts as zero
    UnknownItem { item_id: TypeId },
    /// No danger rating for a travel leg
    UnknownLeg { from: SystemId, to: SystemId },
}

impl std::fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanWarning::NoQuote { item_id, region_id } => {
                write!(f, "no quote for item {item_id} in region {region_id}")
            }
            PlanWarning::Unfulfillable {
                item_id,
                required,
                available,
            } => write!(
                f,
                "item {item_id} needs {required} but only {available} are on sale"
            ),
            PlanWarning::ThinStock {
                item_id,
                region_id,
                required,
                available,
            } => write!(
                f,
                "region {region_id} lists {available} of item {item_id}, {required} required"
            ),
            PlanWarning::NotStockedAtHome { item_id, region_id } => {
                write!(f, "home region {region_id} cannot supply item {item_id} in full")
            }
            PlanWarning::UnknownItem { item_id } => {
                write!(f, "item {item_id} missing from the item table, volume counted as zero")
            }
            PlanWarning::UnknownLeg { from, to } => {
                write!(f, "no danger rating for {from} -> {to}")
            }
        }
    }
}
