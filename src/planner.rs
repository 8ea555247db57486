//! End-to-end shopping plan
//!
//! Runs resolver, region comparison, route optimization and cargo
//! evaluation in order. Each stage only sees the previous stage's output.

use serde::Serialize;
use tracing::{info, warn};

use crate::assets::{AssetShortfall, compare_assets, remaining_materials};
use crate::calculator::{Resolution, ResolveRequest, resolve_with_depth_limit};
use crate::cargo::{CargoReport, RouteDanger, evaluate_cargo};
use crate::catalog::Catalog;
use crate::config::PlannerConfig;
use crate::error::{PlanWarning, Result};
use crate::market::{PriceSource, RegionComparison, compare_regions};
use crate::models::{AssetLine, RegionId};
use crate::route::{ShoppingRoute, optimize_route};

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub resolve: ResolveRequest,
    /// Overrides the configured home region
    pub home_region: Option<RegionId>,
    /// Owned stock subtracted before shopping
    pub owned: Vec<AssetLine>,
}

impl PlanRequest {
    pub fn new(resolve: ResolveRequest) -> Self {
        Self {
            resolve,
            home_region: None,
            owned: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingPlan {
    pub resolution: Resolution,
    pub shortfalls: Vec<AssetShortfall>,
    pub comparison: RegionComparison,
    pub route: ShoppingRoute,
    pub cargo: CargoReport,
    pub warnings: Vec<PlanWarning>,
}

pub fn plan_shopping(
    catalog: &dyn Catalog,
    prices: &dyn PriceSource,
    danger: &dyn RouteDanger,
    config: &PlannerConfig,
    request: &PlanRequest,
) -> Result<ShoppingPlan> {
    let resolution = resolve_with_depth_limit(catalog, &request.resolve, config.max_depth)?;
    info!(
        item = resolution.product.item_id,
        materials = resolution.materials.len(),
        "resolved materials"
    );

    let (shortfalls, to_buy) = if request.owned.is_empty() {
        (Vec::new(), resolution.materials.clone())
    } else {
        let shortfalls = compare_assets(&resolution.materials, &request.owned);
        let to_buy = remaining_materials(&resolution.materials, &shortfalls);
        (shortfalls, to_buy)
    };

    let comparison = compare_regions(&to_buy, &config.region_ids(), prices, config.price_side)?;
    let home_region = request.home_region.unwrap_or(config.home_region);
    let route = optimize_route(&comparison, home_region);
    let cargo = evaluate_cargo(
        &route,
        &config.transport,
        &config.regions,
        &config.risk,
        danger,
    )?;

    let warnings: Vec<PlanWarning> = resolution
        .warnings
        .iter()
        .chain(&comparison.warnings)
        .chain(&route.warnings)
        .chain(&cargo.warnings)
        .cloned()
        .collect();
    for warning in &warnings {
        warn!("{warning}");
    }

    Ok(ShoppingPlan {
        resolution,
        shortfalls,
        comparison,
        route,
        cargo,
        warnings,
    })
}

impl std::fmt::Display for ShoppingPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resolution)?;
        writeln!(f)?;

        writeln!(f, "=== Shopping Route ===")?;
        for stop in &self.route.stops {
            writeln!(f, "Region {}: {:.2} ISK", stop.region_id, stop.subtotal)?;
            for line in &stop.lines {
                writeln!(
                    f,
                    "  {:>16} x {:<32} @ {:>12.2} = {:>16.2}",
                    line.quantity, line.name, line.unit_price, line.line_total
                )?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Total:    {:.2} ISK", self.route.total_cost)?;
        writeln!(
            f,
            "Baseline: {:.2} ISK (all in region {})",
            self.route.baseline_cost, self.route.home_region
        )?;
        writeln!(
            f,
            "Savings:  {:.2} ISK ({:.1}%)",
            self.route.savings, self.route.savings_percent
        )?;

        if !self.route.unfulfillable.is_empty() {
            writeln!(f)?;
            writeln!(f, "Unfulfillable:")?;
            for line in &self.route.unfulfillable {
                writeln!(
                    f,
                    "  {} needs {}, {} on sale",
                    line.name, line.required, line.available
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "=== Cargo ({:.1} m3) ===", self.cargo.total_volume_m3)?;
        for option in &self.cargo.options {
            writeln!(
                f,
                "  {:<24} {:>4} trips {:>6.1}% full  risk {:.1} ({:?})",
                option.name,
                option.trips,
                option.utilization_percent,
                option.risk_score,
                option.risk_level
            )?;
        }

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "  {warning}")?;
            }
        }
        Ok(())
    }
}
