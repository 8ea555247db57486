//! Industry planner
//!
//! Resolves EVE Online production chains into aggregated material lists
//! and plans where to buy them across regional markets.

pub mod assets;
pub mod calculator;
pub mod cargo;
pub mod catalog;
pub mod chains;
pub mod config;
pub mod db;
pub mod efficiency;
pub mod error;
pub mod extract;
pub mod market;
pub mod models;
pub mod planner;
pub mod route;

pub use calculator::{Resolution, ResolveRequest, resolve_materials};
pub use cargo::{CargoReport, RouteDanger, TransportOption, evaluate_cargo};
pub use catalog::{Catalog, MemoryCatalog};
pub use config::PlannerConfig;
pub use error::{PlanError, PlanWarning};
pub use market::{PriceSide, PriceSnapshot, PriceSource, RegionComparison, compare_regions};
pub use models::{Decision, DecisionMap, MaterialLine, RegionId, TypeId};
pub use planner::{PlanRequest, ShoppingPlan, plan_shopping};
pub use route::{ShoppingRoute, optimize_route};
