//! Fuel efficiency figures
//!
//! A refuel counts toward efficiency only when the odometer did not go
//! backwards and a positive volume was dispensed; everything else yields
//! `None`.

use crate::units::centi_to_decimal;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Kilometres per liter of one refuel, rounded to two decimals
pub fn km_per_liter(km_start: i64, km_end: i64, liters: f64) -> Option<f64> {
    if km_end < km_start || !liters.is_finite() || liters <= 0.0 {
        return None;
    }
    Some(round2((km_end - km_start) as f64 / liters))
}

pub fn km_per_liter_centi(km_start: i64, km_end: i64, liters_centi: i64) -> Option<f64> {
    km_per_liter(km_start, km_end, centi_to_decimal(liters_centi))
}

/// Average over a history: total distance divided by total liters
pub fn average_km_per_liter(sum_distance_km: i64, sum_liters: f64) -> Option<f64> {
    if sum_distance_km < 0 || !sum_liters.is_finite() || sum_liters <= 0.0 {
        return None;
    }
    Some(round2(sum_distance_km as f64 / sum_liters))
}

/// Running totals of the refuels that qualify for an average
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EfficiencyAccumulator {
    pub distance_km: i64,
    pub liters_centi: i64,
}

impl EfficiencyAccumulator {
    /// Add one refuel; returns whether it qualified
    pub fn add(&mut self, km_start: i64, km_end: i64, liters_centi: i64) -> bool {
        if km_end < km_start || liters_centi <= 0 {
            return false;
        }
        self.distance_km = self.distance_km.saturating_add(km_end - km_start);
        self.liters_centi = self.liters_centi.saturating_add(liters_centi);
        true
    }

    pub fn average(&self) -> Option<f64> {
        average_km_per_liter(self.distance_km, centi_to_decimal(self.liters_centi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_km_per_liter() {
        assert_eq!(km_per_liter(100, 150, 10.0), Some(5.0));
        assert_eq!(km_per_liter(150, 100, 10.0), None);
        assert_eq!(km_per_liter(100, 150, 0.0), None);
        assert_eq!(km_per_liter(100, 100, 10.0), Some(0.0));
        assert_eq!(km_per_liter(0, 100, 3.0), Some(33.33));
    }

    #[test]
    fn test_km_per_liter_centi() {
        assert_eq!(km_per_liter_centi(1000, 1500, 4000), Some(12.5));
        assert_eq!(km_per_liter_centi(1000, 1500, 0), None);
    }

    #[test]
    fn test_average_km_per_liter() {
        assert_eq!(average_km_per_liter(1000, 80.0), Some(12.5));
        assert_eq!(average_km_per_liter(1000, 0.0), None);
    }

    #[test]
    fn test_accumulator_skips_invalid_refuels() {
        let mut acc = EfficiencyAccumulator::default();
        assert!(acc.add(0, 500, 4000));
        assert!(!acc.add(900, 800, 3000));
        assert!(!acc.add(500, 900, 0));
        assert!(acc.add(500, 1000, 4000));

        assert_eq!(acc.distance_km, 1000);
        assert_eq!(acc.liters_centi, 8000);
        assert_eq!(acc.average(), Some(12.5));
    }

    #[test]
    fn test_empty_accumulator_has_no_average() {
        assert_eq!(EfficiencyAccumulator::default().average(), None);
    }
}
