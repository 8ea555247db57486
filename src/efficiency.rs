//! Material and time efficiency arithmetic
//!
//! Quantities are `u64` and every multiplication is checked. ME rounding
//! happens once per run: `ceil(base * (100 - ME) / 100)`, then times runs.

use crate::error::{PlanError, Result};

pub const MAX_MATERIAL_EFFICIENCY: u8 = 10;
pub const MAX_TIME_EFFICIENCY: u8 = 20;

pub fn validate_material_efficiency(me: u8) -> Result<()> {
    if me > MAX_MATERIAL_EFFICIENCY {
        return Err(PlanError::OutOfRange {
            field: "material efficiency",
            value: i64::from(me),
            min: 0,
            max: i64::from(MAX_MATERIAL_EFFICIENCY),
        });
    }
    Ok(())
}

pub fn validate_time_efficiency(te: u8) -> Result<()> {
    if te > MAX_TIME_EFFICIENCY {
        return Err(PlanError::OutOfRange {
            field: "time efficiency",
            value: i64::from(te),
            min: 0,
            max: i64::from(MAX_TIME_EFFICIENCY),
        });
    }
    Ok(())
}

pub fn validate_runs(runs: u64) -> Result<()> {
    if runs == 0 {
        return Err(PlanError::InvalidRuns);
    }
    Ok(())
}

/// Per-run quantity after ME reduction, rounded up.
pub fn adjusted_quantity(base_quantity: u64, me: u8) -> Result<u64> {
    validate_material_efficiency(me)?;
    let scaled = u128::from(base_quantity) * u128::from(100 - u64::from(me));
    let per_run = scaled.div_ceil(100);
    u64::try_from(per_run).map_err(|_| PlanError::overflow("ME adjusted quantity"))
}

/// Quantity needed for `runs` runs: per-run adjusted quantity times runs.
pub fn batch_quantity(base_quantity: u64, me: u8, runs: u64) -> Result<u64> {
    let per_run = adjusted_quantity(base_quantity, me)?;
    per_run
        .checked_mul(runs)
        .ok_or_else(|| PlanError::overflow(format!("{per_run} x {runs} runs")))
}

/// Runs of a sub-blueprint needed to cover `quantity` units.
///
/// Returns `None` when the blueprint produces nothing per run.
pub fn runs_needed(quantity: u64, output_per_run: u64) -> Option<u64> {
    if output_per_run == 0 {
        return None;
    }
    Some(quantity.div_ceil(output_per_run))
}

/// Production time in seconds for `runs` runs after TE reduction.
pub fn adjusted_time(base_time_s: u64, te: u8, runs: u64) -> Result<f64> {
    validate_time_efficiency(te)?;
    let total = base_time_s
        .checked_mul(runs)
        .ok_or_else(|| PlanError::overflow("production time"))?;
    Ok(total as f64 * (1.0 - f64::from(te) / 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tritanium_example_reduces_by_ten_percent() {
        assert_eq!(adjusted_quantity(5_600_000, 0).unwrap(), 5_600_000);
        assert_eq!(adjusted_quantity(5_600_000, 10).unwrap(), 5_040_000);
    }

    #[test]
    fn fractional_results_round_up_per_run() {
        // 1 * 0.9 = 0.9 -> 1, so ME never drops a material entirely
        assert_eq!(adjusted_quantity(1, 10).unwrap(), 1);
        // 15 * 0.9 = 13.5 -> 14 per run, 140 for ten runs
        assert_eq!(batch_quantity(15, 10, 10).unwrap(), 140);
    }

    #[test]
    fn rejects_out_of_range_levels() {
        assert!(matches!(
            adjusted_quantity(100, 11),
            Err(PlanError::OutOfRange { .. })
        ));
        assert!(validate_time_efficiency(21).is_err());
        assert!(validate_time_efficiency(20).is_ok());
        assert!(matches!(validate_runs(0), Err(PlanError::InvalidRuns)));
    }

    #[test]
    fn overflow_is_reported() {
        let err = batch_quantity(u64::MAX / 2, 0, 3).unwrap_err();
        assert!(matches!(err, PlanError::Overflow { .. }));
    }

    #[test]
    fn runs_needed_rounds_up() {
        assert_eq!(runs_needed(250, 100), Some(3));
        assert_eq!(runs_needed(300, 100), Some(3));
        assert_eq!(runs_needed(1, 1), Some(1));
        assert_eq!(runs_needed(10, 0), None);
    }

    #[test]
    fn time_efficiency_scales_duration() {
        let t = adjusted_time(1000, 20, 2).unwrap();
        assert!((t - 1600.0).abs() < 1e-9);
    }
}
