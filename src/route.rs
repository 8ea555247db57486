//! Multi-region shopping route
//!
//! Assigns every priced material to the cheapest region that can supply the
//! full quantity, splitting it across regions only when none can. Purchases
//! are grouped into stops and compared against buying everything in the
//! home region.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::PlanWarning;
use crate::market::{ItemPrices, RegionComparison};
use crate::models::{RegionId, TypeId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopLine {
    pub item_id: TypeId,
    pub name: String,
    pub quantity: u64,
    pub unit_price: f64,
    pub line_total: f64,
    pub volume_m3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingStop {
    pub region_id: RegionId,
    pub lines: Vec<StopLine>,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnfulfillableLine {
    pub item_id: TypeId,
    pub name: String,
    pub required: u64,
    pub available: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingRoute {
    pub home_region: RegionId,
    pub stops: Vec<ShoppingStop>,
    pub total_cost: f64,
    pub baseline_cost: f64,
    pub savings: f64,
    pub savings_percent: f64,
    pub unfulfillable: Vec<UnfulfillableLine>,
    pub warnings: Vec<PlanWarning>,
}

impl ShoppingRoute {
    pub fn stop(&self, region_id: RegionId) -> Option<&ShoppingStop> {
        self.stops.iter().find(|s| s.region_id == region_id)
    }

    /// First stop holding the item. A split item appears in several stops.
    pub fn region_for(&self, item_id: TypeId) -> Option<RegionId> {
        self.stops
            .iter()
            .find(|s| s.lines.iter().any(|l| l.item_id == item_id))
            .map(|s| s.region_id)
    }
}

/// One purchase of part or all of an item's quantity in a single region.
#[derive(Debug, Clone, Copy)]
struct Purchase {
    region_id: RegionId,
    quantity: u64,
    unit_price: f64,
    line_total: f64,
    region_volume: u64,
}

pub fn optimize_route(comparison: &RegionComparison, home_region: RegionId) -> ShoppingRoute {
    let mut by_region: BTreeMap<RegionId, Vec<StopLine>> = BTreeMap::new();
    let mut unfulfillable = Vec::new();
    let mut warnings = Vec::new();
    let mut total_cost = 0.0;
    let mut baseline_cost = 0.0;

    for item in &comparison.items {
        let available = item.total_volume();
        if item.quantity > available {
            warn!(item = item.item_id, required = item.quantity, available, "unfulfillable");
            warnings.push(PlanWarning::Unfulfillable {
                item_id: item.item_id,
                required: item.quantity,
                available,
            });
            unfulfillable.push(UnfulfillableLine {
                item_id: item.item_id,
                name: item.name.clone(),
                required: item.quantity,
                available,
            });
            continue;
        }
        if item.quantity == 0 {
            continue;
        }

        let purchases = match assign(item, home_region) {
            Some(single) => vec![single],
            None => {
                let purchases = fill_from_cheapest(item, home_region);
                if let Some(first) = purchases.first() {
                    warnings.push(PlanWarning::ThinStock {
                        item_id: item.item_id,
                        region_id: first.region_id,
                        required: item.quantity,
                        available: first.region_volume,
                    });
                }
                purchases
            }
        };
        let item_cost: f64 = purchases.iter().map(|p| p.line_total).sum();

        // Home only sets the baseline when it can supply the whole quantity.
        let home_cost = item
            .offer_in(home_region)
            .filter(|offer| offer.volume >= item.quantity)
            .map(|offer| offer.line_cost);
        baseline_cost += match home_cost {
            Some(cost) => cost,
            None => {
                warnings.push(PlanWarning::NotStockedAtHome {
                    item_id: item.item_id,
                    region_id: home_region,
                });
                item_cost
            }
        };
        total_cost += item_cost;

        for purchase in purchases {
            by_region.entry(purchase.region_id).or_default().push(StopLine {
                item_id: item.item_id,
                name: item.name.clone(),
                quantity: purchase.quantity,
                unit_price: purchase.unit_price,
                line_total: purchase.line_total,
                volume_m3: item.volume_m3,
            });
        }
    }

    let mut stops: Vec<ShoppingStop> = by_region
        .into_iter()
        .map(|(region_id, mut lines)| {
            lines.sort_by(|a, b| b.line_total.total_cmp(&a.line_total));
            let subtotal = lines.iter().map(|l| l.line_total).sum();
            ShoppingStop {
                region_id,
                lines,
                subtotal,
            }
        })
        .collect();
    stops.sort_by(|a, b| {
        (b.region_id == home_region)
            .cmp(&(a.region_id == home_region))
            .then(b.subtotal.total_cmp(&a.subtotal))
    });

    let savings = (baseline_cost - total_cost).max(0.0);
    let savings_percent = if baseline_cost > 0.0 {
        savings / baseline_cost * 100.0
    } else {
        0.0
    };

    info!(
        stops = stops.len(),
        total_cost, baseline_cost, savings_percent, "optimized shopping route"
    );

    ShoppingRoute {
        home_region,
        stops,
        total_cost,
        baseline_cost,
        savings,
        savings_percent,
        unfulfillable,
        warnings,
    }
}

/// Cheapest region able to supply the full quantity on its own, preferring
/// home and then the lower region id on a tie.
fn assign(item: &ItemPrices, home_region: RegionId) -> Option<Purchase> {
    let mut best: Option<Purchase> = None;
    for region in &item.regions {
        let Some(offer) = region.offer.as_ref().filter(|o| o.volume >= item.quantity) else {
            continue;
        };
        let candidate = Purchase {
            region_id: region.region_id,
            quantity: item.quantity,
            unit_price: offer.unit_price,
            line_total: offer.line_cost,
            region_volume: offer.volume,
        };
        best = match best {
            Some(current) if !prefer(&candidate, &current, home_region) => Some(current),
            _ => Some(candidate),
        };
    }
    best
}

fn prefer(candidate: &Purchase, current: &Purchase, home_region: RegionId) -> bool {
    if candidate.line_total != current.line_total {
        return candidate.line_total < current.line_total;
    }
    candidate.region_id == home_region
        || (current.region_id != home_region && candidate.region_id < current.region_id)
}

/// Split the quantity across regions, cheapest unit price first. The caller
/// guarantees the summed volume covers the quantity.
fn fill_from_cheapest(item: &ItemPrices, home_region: RegionId) -> Vec<Purchase> {
    let mut offers: Vec<_> = item
        .regions
        .iter()
        .filter_map(|r| r.offer.as_ref().map(|o| (r.region_id, o)))
        .collect();
    offers.sort_by(|(a_region, a), (b_region, b)| {
        a.unit_price
            .total_cmp(&b.unit_price)
            .then((*b_region == home_region).cmp(&(*a_region == home_region)))
            .then(a_region.cmp(b_region))
    });

    let mut remaining = item.quantity;
    let mut purchases = Vec::new();
    for (region_id, offer) in offers {
        if remaining == 0 {
            break;
        }
        let quantity = remaining.min(offer.volume);
        remaining -= quantity;
        purchases.push(Purchase {
            region_id,
            quantity,
            unit_price: offer.unit_price,
            line_total: quantity as f64 * offer.unit_price,
            region_volume: offer.volume,
        });
    }
    purchases
}
