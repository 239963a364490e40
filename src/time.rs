//! Conversions between wall-clock durations and ticks.
//!
//! One tick is one sample frame, so every conversion is a multiply by the
//! sample rate, rounded to the nearest tick and saturating at `Tick::MAX`.

use crate::Tick;

fn to_ticks(sample_rate: u32, seconds: f64) -> Tick {
    if seconds.is_nan() || seconds <= 0.0 {
        return 0;
    }
    let ticks = (seconds * f64::from(sample_rate)).round();
    if ticks >= Tick::MAX as f64 {
        Tick::MAX
    } else {
        ticks as Tick
    }
}

pub fn ms(sample_rate: u32, ms: f64) -> Tick {
    to_ticks(sample_rate, ms / 1_000.0)
}

pub fn seconds(sample_rate: u32, seconds: f64) -> Tick {
    to_ticks(sample_rate, seconds)
}

pub fn minutes(sample_rate: u32, minutes: f64) -> Tick {
    to_ticks(sample_rate, minutes * 60.0)
}

pub fn hours(sample_rate: u32, hours: f64) -> Tick {
    to_ticks(sample_rate, hours * 3_600.0)
}

/// Ticks back to seconds.
pub fn to_seconds(sample_rate: u32, ticks: Tick) -> f64 {
    ticks as f64 / f64::from(sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_scale_by_sample_rate() {
        assert_eq!(ms(44_100, 1.0), 44);
        assert_eq!(ms(48_000, 250.0), 12_000);
        assert_eq!(seconds(44_100, 2.0), 88_200);
        assert_eq!(minutes(1_000, 1.5), 90_000);
        assert_eq!(hours(1, 1.0), 3_600);
    }

    #[test]
    fn negative_and_nan_are_zero() {
        assert_eq!(seconds(44_100, -1.0), 0);
        assert_eq!(seconds(44_100, f64::NAN), 0);
    }

    #[test]
    fn huge_durations_saturate() {
        assert_eq!(hours(192_000, 1e30), Tick::MAX);
        assert_eq!(to_seconds(48_000, 24_000), 0.5);
    }
}
