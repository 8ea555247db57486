//! Planner configuration loaded from TOML

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculator::DEFAULT_MAX_DEPTH;
use crate::cargo::{RiskLevel, RiskScore, TransportOption};
use crate::market::PriceSide;
use crate::models::{RegionId, SystemId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Market region with the solar system its trade hub sits in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub hub_system: SystemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub medium: RiskScore,
    pub high: RiskScore,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 1.0,
            high: 5.0,
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, score: RiskScore) -> RiskLevel {
        if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub home_region: RegionId,
    pub regions: Vec<Region>,
    pub price_side: PriceSide,
    pub max_depth: usize,
    pub transport: Vec<TransportOption>,
    pub risk: RiskThresholds,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            home_region: 10000002,
            regions: vec![
                region(10000002, "The Forge", 30000142),
                region(10000043, "Domain", 30002187),
                region(10000032, "Sinq Laison", 30002659),
                region(10000042, "Metropolis", 30002053),
                region(10000030, "Heimatar", 30002510),
            ],
            price_side: PriceSide::Sell,
            max_depth: DEFAULT_MAX_DEPTH,
            transport: vec![
                ship("Industrial", 38_000.0, 1.0),
                ship("Blockade Runner", 10_000.0, 0.3),
                ship("Deep Space Transport", 62_500.0, 0.6),
                ship("Freighter", 1_000_000.0, 1.5),
            ],
            risk: RiskThresholds::default(),
        }
    }
}

fn region(id: RegionId, name: &str, hub_system: SystemId) -> Region {
    Region {
        id,
        name: name.to_string(),
        hub_system,
    }
}

fn ship(name: &str, capacity_m3: f64, exposure: f64) -> TransportOption {
    TransportOption {
        name: name.to_string(),
        capacity_m3,
        exposure,
    }
}

impl PlannerConfig {
    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regions.is_empty() {
            return Err(ConfigError::Invalid("at least one region is required".into()));
        }
        if !self.regions.iter().any(|r| r.id == self.home_region) {
            return Err(ConfigError::Invalid(format!(
                "home region {} is not in the region list",
                self.home_region
            )));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be positive".into()));
        }
        if let Some(ship) = self
            .transport
            .iter()
            .find(|t| !(t.capacity_m3.is_finite() && t.capacity_m3 > 0.0))
        {
            return Err(ConfigError::Invalid(format!(
                "transport {} needs a positive capacity",
                ship.name
            )));
        }
        if self.risk.medium > self.risk.high {
            return Err(ConfigError::Invalid(
                "risk.medium must not exceed risk.high".into(),
            ));
        }
        Ok(())
    }

    pub fn region_ids(&self) -> Vec<RegionId> {
        self.regions.iter().map(|r| r.id).collect()
    }

    pub fn region_name(&self, id: RegionId) -> String {
        self.regions
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| format!("Region {id}"))
    }

    /// Resolve a region given by id or (case-insensitive) name.
    pub fn find_region(&self, key: &str) -> Option<&Region> {
        match key.parse::<RegionId>() {
            Ok(id) => self.regions.iter().find(|r| r.id == id),
            Err(_) => self
                .regions
                .iter()
                .find(|r| r.name.eq_ignore_ascii_case(key)),
        }
    }
}
