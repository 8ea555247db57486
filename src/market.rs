//! Regional price lookup and cheapest-region selection

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanWarning, Result};
use crate::models::{MaterialLine, PriceQuote, RegionId, TypeId};

/// Market snapshot lookups. Missing quotes are `Ok(None)`, not errors.
pub trait PriceSource {
    fn regional_price(&self, item_id: TypeId, region_id: RegionId) -> Result<Option<PriceQuote>>;
}

/// Which side of the order book purchases are priced against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSide {
    /// Buy from the lowest sell order
    #[default]
    Sell,
    /// Outbid the highest buy order
    Buy,
}

/// In-memory quote snapshot keyed by item and region.
#[derive(Debug, Default, Clone)]
pub struct PriceSnapshot {
    quotes: HashMap<(TypeId, RegionId), PriceQuote>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, quote: PriceQuote) -> &mut Self {
        self.quotes.insert((quote.item_id, quote.region_id), quote);
        self
    }

    /// Shorthand for a sell-side quote.
    pub fn sell(&mut self, item_id: TypeId, region_id: RegionId, price: f64, volume: u64) -> &mut Self {
        self.insert(PriceQuote {
            item_id,
            region_id,
            lowest_sell: Some(price),
            highest_buy: None,
            sell_volume: volume,
            buy_volume: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl PriceSource for PriceSnapshot {
    fn regional_price(&self, item_id: TypeId, region_id: RegionId) -> Result<Option<PriceQuote>> {
        Ok(self.quotes.get(&(item_id, region_id)).cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offer {
    pub unit_price: f64,
    pub volume: u64,
    /// quantity x unit price
    pub line_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionPrice {
    pub region_id: RegionId,
    /// `None` means no stock on the chosen side
    pub offer: Option<Offer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemPrices {
    pub item_id: TypeId,
    pub name: String,
    pub quantity: u64,
    pub volume_m3: f64,
    pub regions: Vec<RegionPrice>,
    pub best_region: Option<RegionId>,
}

impl ItemPrices {
    pub fn offer_in(&self, region_id: RegionId) -> Option<&Offer> {
        self.regions
            .iter()
            .find(|r| r.region_id == region_id)
            .and_then(|r| r.offer.as_ref())
    }

    /// Stock on sale across every region.
    pub fn total_volume(&self) -> u64 {
        self.regions
            .iter()
            .filter_map(|r| r.offer.as_ref())
            .fold(0u64, |acc, offer| acc.saturating_add(offer.volume))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionComparison {
    pub items: Vec<ItemPrices>,
    pub warnings: Vec<PlanWarning>,
}

impl RegionComparison {
    pub fn item(&self, item_id: TypeId) -> Option<&ItemPrices> {
        self.items.iter().find(|i| i.item_id == item_id)
    }
}

/// Look up every material in every region and pick the cheapest one.
pub fn compare_regions(
    materials: &[MaterialLine],
    regions: &[RegionId],
    source: &dyn PriceSource,
    side: PriceSide,
) -> Result<RegionComparison> {
    let mut items = Vec::with_capacity(materials.len());
    let mut warnings = Vec::new();

    for material in materials {
        let mut prices = Vec::with_capacity(regions.len());
        for &region_id in regions {
            let quote = source.regional_price(material.item_id, region_id)?;
            if quote.is_none() {
                warnings.push(PlanWarning::NoQuote {
                    item_id: material.item_id,
                    region_id,
                });
            }
            prices.push(RegionPrice {
                region_id,
                offer: quote.and_then(|q| offer_for(&q, side, material.quantity)),
            });
        }

        let best_region = cheapest(&prices, material.quantity);
        debug!(item = material.item_id, ?best_region, "compared regions");
        items.push(ItemPrices {
            item_id: material.item_id,
            name: material.name.clone(),
            quantity: material.quantity,
            volume_m3: material.volume_m3,
            regions: prices,
            best_region,
        });
    }

    Ok(RegionComparison { items, warnings })
}

fn offer_for(quote: &PriceQuote, side: PriceSide, quantity: u64) -> Option<Offer> {
    let (price, volume) = match side {
        PriceSide::Sell => (quote.lowest_sell, quote.sell_volume),
        PriceSide::Buy => (quote.highest_buy, quote.buy_volume),
    };
    let unit_price = price.filter(|p| p.is_finite() && *p > 0.0)?;
    if volume == 0 {
        return None;
    }
    Some(Offer {
        unit_price,
        volume,
        line_cost: quantity as f64 * unit_price,
    })
}

/// Lowest line cost among regions stocking the full quantity, falling back
/// to every stocked region when none does. The earlier region wins a tie.
fn cheapest(prices: &[RegionPrice], quantity: u64) -> Option<RegionId> {
    let covers = prices
        .iter()
        .any(|r| r.offer.as_ref().is_some_and(|o| o.volume >= quantity));
    prices
        .iter()
        .filter_map(|r| r.offer.as_ref().map(|o| (r.region_id, o)))
        .filter(|(_, o)| !covers || o.volume >= quantity)
        .map(|(region, o)| (region, o.line_cost))
        .fold(None, |best: Option<(RegionId, f64)>, (region, cost)| match best {
            Some((_, best_cost)) if best_cost <= cost => best,
            _ => Some((region, cost)),
        })
        .map(|(region, _)| region)
}
