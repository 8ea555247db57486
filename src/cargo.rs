//! Cargo volume, trip counts and route risk for a shopping route

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{Region, RiskThresholds};
use crate::error::{PlanWarning, Result};
use crate::models::{RegionId, SystemId};
use crate::route::ShoppingRoute;

/// Danger points for travelling between two systems.
pub type RiskScore = f64;

/// External routing collaborator rating a travel leg.
pub trait RouteDanger {
    fn route_danger(&self, from: SystemId, to: SystemId) -> Result<Option<RiskScore>>;
}

/// Fixed leg ratings, looked up in either direction.
#[derive(Debug, Default, Clone)]
pub struct StaticDanger {
    legs: HashMap<(SystemId, SystemId), RiskScore>,
}

impl StaticDanger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(&mut self, from: SystemId, to: SystemId, risk: RiskScore) -> &mut Self {
        self.legs.insert((from, to), risk);
        self
    }
}

impl RouteDanger for StaticDanger {
    fn route_danger(&self, from: SystemId, to: SystemId) -> Result<Option<RiskScore>> {
        Ok(self
            .legs
            .get(&(from, to))
            .or_else(|| self.legs.get(&(to, from)))
            .copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOption {
    pub name: String,
    pub capacity_m3: f64,
    /// Multiplier on leg danger; below 1.0 for hulls that are hard to catch
    #[serde(default = "default_exposure")]
    pub exposure: f64,
}

fn default_exposure() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransportAssessment {
    pub name: String,
    pub capacity_m3: f64,
    pub trips: u64,
    pub utilization_percent: f64,
    pub risk_score: RiskScore,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Leg {
    pub from: SystemId,
    pub to: SystemId,
    pub risk: Option<RiskScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CargoReport {
    pub total_volume_m3: f64,
    pub legs: Vec<Leg>,
    pub options: Vec<TransportAssessment>,
    pub warnings: Vec<PlanWarning>,
}

pub fn evaluate_cargo(
    route: &ShoppingRoute,
    options: &[TransportOption],
    regions: &[Region],
    thresholds: &RiskThresholds,
    danger: &dyn RouteDanger,
) -> Result<CargoReport> {
    let total_volume_m3: f64 = route
        .stops
        .iter()
        .flat_map(|stop| &stop.lines)
        .map(|line| line.quantity as f64 * line.volume_m3)
        .sum();

    let mut warnings = Vec::new();
    let legs = itinerary(route, regions)
        .into_iter()
        .map(|(from, to)| {
            let risk = danger.route_danger(from, to)?;
            if risk.is_none() {
                warnings.push(PlanWarning::UnknownLeg { from, to });
            }
            Ok(Leg { from, to, risk })
        })
        .collect::<Result<Vec<_>>>()?;
    let route_risk: RiskScore = legs.iter().filter_map(|leg| leg.risk).sum();

    let mut assessments = Vec::with_capacity(options.len());
    for option in options {
        if option.capacity_m3 <= 0.0 || !option.capacity_m3.is_finite() {
            warn!(ship = %option.name, "skipping transport option without capacity");
            continue;
        }
        let trips = trips_needed(total_volume_m3, option.capacity_m3);
        let utilization_percent = if trips == 0 {
            0.0
        } else {
            total_volume_m3 / (trips as f64 * option.capacity_m3) * 100.0
        };
        let risk_score = route_risk * trips as f64 * option.exposure;
        assessments.push(TransportAssessment {
            name: option.name.clone(),
            capacity_m3: option.capacity_m3,
            trips,
            utilization_percent,
            risk_score,
            risk_level: thresholds.classify(risk_score),
        });
    }

    Ok(CargoReport {
        total_volume_m3,
        legs,
        options: assessments,
        warnings,
    })
}

/// `ceil(volume / capacity)`, zero when nothing has to be moved.
pub fn trips_needed(volume_m3: f64, capacity_m3: f64) -> u64 {
    if volume_m3 <= 0.0 {
        return 0;
    }
    (volume_m3 / capacity_m3).ceil() as u64
}

/// Home hub, every other stop's hub in route order, then home again.
fn itinerary(route: &ShoppingRoute, regions: &[Region]) -> Vec<(SystemId, SystemId)> {
    let hub = |region_id: RegionId| {
        let hub = regions
            .iter()
            .find(|r| r.id == region_id)
            .map(|r| r.hub_system);
        if hub.is_none() {
            warn!(region = region_id, "region has no configured trade hub");
        }
        hub
    };

    let Some(home) = hub(route.home_region) else {
        return Vec::new();
    };
    let mut systems = vec![home];
    systems.extend(
        route
            .stops
            .iter()
            .filter(|stop| stop.region_id != route.home_region)
            .filter_map(|stop| hub(stop.region_id)),
    );
    systems.push(home);

    systems
        .windows(2)
        .filter(|pair| pair[0] != pair[1])
        .map(|pair| (pair[0], pair[1]))
        .collect()
}
