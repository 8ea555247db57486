//! Data models for items, blueprints, market quotes and plan output

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// EVE type identifier (items, materials and blueprint products).
pub type TypeId = i64;

/// Market region identifier (e.g. 10000002 for The Forge).
pub type RegionId = i64;

/// Solar system identifier used for travel legs.
pub type SystemId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: TypeId,
    pub name: String,
    pub volume_m3: f64,
    pub base_price: Option<f64>,
}

/// Industry activity that turns materials into a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Manufacturing,
    Reaction,
}

impl Activity {
    /// Activity id as used by the static data export.
    pub fn code(self) -> i64 {
        match self {
            Activity::Manufacturing => 1,
            Activity::Reaction => 11,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Activity::Manufacturing),
            11 => Some(Activity::Reaction),
            _ => None,
        }
    }
}

/// One direct material requirement of a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub product_id: TypeId,
    pub material_id: TypeId,
    /// Quantity per run at ME 0
    pub base_quantity: u64,
    pub activity: Activity,
    pub is_raw: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Item produced by this blueprint; blueprints are keyed by it.
    pub product_id: TypeId,
    pub blueprint_type_id: TypeId,
    pub base_time_s: u64,
    pub output_per_run: u64,
    pub activity: Activity,
    pub materials: Vec<DependencyEdge>,
}

/// Build-or-buy choice for a producible component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Build,
    #[default]
    Buy,
}

pub type DecisionMap = HashMap<TypeId, Decision>;

/// Precomputed path summary from an item down to one raw material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub item_id: TypeId,
    pub material_id: TypeId,
    pub total_quantity: u64,
    pub max_depth: usize,
    pub path: String,
}

/// Snapshot of the order book for one item in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub item_id: TypeId,
    pub region_id: RegionId,
    pub lowest_sell: Option<f64>,
    pub highest_buy: Option<f64>,
    pub sell_volume: u64,
    pub buy_volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLine {
    pub item_id: TypeId,
    pub quantity: u64,
}

/// Aggregated requirement for one material across the whole tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub item_id: TypeId,
    pub name: String,
    pub quantity: u64,
    pub volume_m3: f64,
}

/// First-level producible dependency the caller may toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubComponent {
    pub item_id: TypeId,
    pub name: String,
    pub quantity: u64,
    pub default_decision: Decision,
}
