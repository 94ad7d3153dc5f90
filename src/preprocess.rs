//! Session log preprocessing
//!
//! Converts a raw device log into the cleaned, enriched form the feature
//! extractor consumes. Stages, in order: timestamp parsing and elapsed-time
//! derivation, per-axis deadzone filtering, trailing moving-average
//! smoothing, and derived magnitude columns.
//!
//! This is the single shared implementation for every caller; there is no
//! second copy to keep in sync.

use chrono::NaiveDateTime;

use crate::error::PipelineError;
use crate::types::{CleanRecord, RawRecord};

/// Joystick readings at or below this absolute value are noise
pub const JOYSTICK_DEADZONE: f64 = 3.0;

/// Wheel velocity readings at or below this absolute value are noise
pub const WHEEL_VELOCITY_DEADZONE: f64 = 0.02;

/// Trailing moving-average window, in samples
pub const SMOOTHING_WINDOW: usize = 5;

/// Timestamp format of the raw device log: `YYYY-MM-DD_HH:MM:SS.ffffff`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S%.f";

/// Preprocessor for raw session logs
pub struct Preprocessor;

impl Preprocessor {
    /// Clean a parsed raw log. Output has the same row count and order as
    /// the input; the original timestamp strings are carried through
    /// unchanged.
    pub fn clean(rows: &[RawRecord]) -> Result<Vec<CleanRecord>, PipelineError> {
        if rows.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let timestamps = rows
            .iter()
            .map(|row| parse_timestamp(&row.timestamp))
            .collect::<Result<Vec<_>, _>>()?;
        let first = timestamps[0];

        // Deadzone each axis/wheel independently, before smoothing
        let joy_x: Vec<f64> = rows
            .iter()
            .map(|r| deadzone(r.joy_x, JOYSTICK_DEADZONE))
            .collect();
        let joy_y: Vec<f64> = rows
            .iter()
            .map(|r| deadzone(r.joy_y, JOYSTICK_DEADZONE))
            .collect();
        let vel_r: Vec<f64> = rows
            .iter()
            .map(|r| deadzone(r.wheel_vel_r, WHEEL_VELOCITY_DEADZONE))
            .collect();
        let vel_l: Vec<f64> = rows
            .iter()
            .map(|r| deadzone(r.wheel_vel_l, WHEEL_VELOCITY_DEADZONE))
            .collect();

        let joy_x = rolling_mean(&joy_x, SMOOTHING_WINDOW);
        let joy_y = rolling_mean(&joy_y, SMOOTHING_WINDOW);
        let vel_r = rolling_mean(&vel_r, SMOOTHING_WINDOW);
        let vel_l = rolling_mean(&vel_l, SMOOTHING_WINDOW);

        let cleaned = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let elapsed_s = elapsed_seconds(timestamps[i], first);
                CleanRecord {
                    timestamp: row.timestamp.clone(),
                    elapsed_s,
                    elapsed_min: elapsed_s / 60.0,
                    wheel_disp_r: row.wheel_disp_r,
                    wheel_disp_l: row.wheel_disp_l,
                    joy_x: joy_x[i],
                    joy_y: joy_y[i],
                    wheel_vel_r: vel_r[i],
                    wheel_vel_l: vel_l[i],
                    joy_mag: joy_x[i].hypot(joy_y[i]),
                    vel_mag: vel_l[i].hypot(vel_r[i]),
                    disp_mag: row.wheel_disp_l.hypot(row.wheel_disp_r),
                    avg_vel: (vel_l[i] + vel_r[i]) / 2.0,
                }
            })
            .collect();

        Ok(cleaned)
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, PipelineError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| PipelineError::Parse(format!("invalid timestamp {:?}: {}", raw, e)))
}

fn elapsed_seconds(timestamp: NaiveDateTime, first: NaiveDateTime) -> f64 {
    let delta = timestamp - first;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

fn deadzone(value: f64, threshold: f64) -> f64 {
    if value.abs() <= threshold {
        0.0
    } else {
        value
    }
}

/// Trailing moving average with partial windows at the start: position `i`
/// averages the last `window` samples available, minimum one.
fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let lo = (i + 1).saturating_sub(window);
            let slice = &values[lo..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_raw(timestamp: &str, joy_x: f64, joy_y: f64, vel_l: f64, vel_r: f64) -> RawRecord {
        RawRecord {
            timestamp: timestamp.to_string(),
            wheel_disp_r: 0.0,
            wheel_disp_l: 0.0,
            joy_x,
            joy_y,
            wheel_vel_r: vel_r,
            wheel_vel_l: vel_l,
        }
    }

    fn tick_timestamp(tick: usize) -> String {
        // 120 Hz nominal rate, microsecond timestamps
        let micros = (tick as f64 * 1_000_000.0 / 120.0).round() as u64;
        format!(
            "2024-03-01_10:00:{:02}.{:06}",
            micros / 1_000_000,
            micros % 1_000_000
        )
    }

    #[test]
    fn test_rolling_mean_constant_series() {
        let values = vec![42.0; 10];
        let smoothed = rolling_mean(&values, 5);
        // A constant column must equal that constant everywhere, including
        // the partial windows at the start
        assert_eq!(smoothed, values);
    }

    #[test]
    fn test_rolling_mean_partial_windows() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let smoothed = rolling_mean(&values, 5);
        assert_eq!(smoothed[0], 1.0);
        assert_eq!(smoothed[1], 1.5);
        assert_eq!(smoothed[4], 3.0);
        assert_eq!(smoothed[5], 4.0);
    }

    #[test]
    fn test_deadzone_thresholds() {
        assert_eq!(deadzone(3.0, JOYSTICK_DEADZONE), 0.0);
        assert_eq!(deadzone(-3.0, JOYSTICK_DEADZONE), 0.0);
        assert_eq!(deadzone(3.1, JOYSTICK_DEADZONE), 3.1);
        assert_eq!(deadzone(0.02, WHEEL_VELOCITY_DEADZONE), 0.0);
        assert_eq!(deadzone(-0.021, WHEEL_VELOCITY_DEADZONE), -0.021);
    }

    #[test]
    fn test_clean_preserves_row_count_and_elapsed_time() {
        let rows: Vec<RawRecord> = (0..240)
            .map(|i| make_raw(&tick_timestamp(i), 0.0, 0.0, 0.0, 0.0))
            .collect();
        let cleaned = Preprocessor::clean(&rows).unwrap();

        assert_eq!(cleaned.len(), rows.len());
        assert_eq!(cleaned[0].elapsed_s, 0.0);
        // 239 ticks at 120 Hz is just under 2 seconds
        assert!((cleaned[239].elapsed_s - 239.0 / 120.0).abs() < 1e-3);
        assert!((cleaned[239].elapsed_min - cleaned[239].elapsed_s / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_deflection_magnitude() {
        // 1 second of constant joystick deflection X=50, Y=0, no wheel motion
        let rows: Vec<RawRecord> = (0..120)
            .map(|i| make_raw(&tick_timestamp(i), 50.0, 0.0, 0.0, 0.0))
            .collect();
        let cleaned = Preprocessor::clean(&rows).unwrap();

        for record in &cleaned {
            // Constant input means smoothing is exact at every position
            assert!((record.joy_mag - 50.0).abs() < 1e-9);
            assert_eq!(record.vel_mag, 0.0);
            assert_eq!(record.avg_vel, 0.0);
        }
    }

    #[test]
    fn test_deadzone_applies_before_smoothing() {
        // Sub-threshold joystick noise must not leak into the smoothed
        // columns
        let rows: Vec<RawRecord> = (0..20)
            .map(|i| make_raw(&tick_timestamp(i), 2.5, -1.0, 0.015, -0.02))
            .collect();
        let cleaned = Preprocessor::clean(&rows).unwrap();

        for record in &cleaned {
            assert_eq!(record.joy_x, 0.0);
            assert_eq!(record.joy_y, 0.0);
            assert_eq!(record.wheel_vel_l, 0.0);
            assert_eq!(record.wheel_vel_r, 0.0);
            assert_eq!(record.joy_mag, 0.0);
        }
    }

    #[test]
    fn test_smoothing_ramp_after_deadzone() {
        // Step from rest to 50: the trailing window averages in the zeros
        let mut rows: Vec<RawRecord> = (0..5)
            .map(|i| make_raw(&tick_timestamp(i), 0.0, 0.0, 0.0, 0.0))
            .collect();
        rows.extend((5..15).map(|i| make_raw(&tick_timestamp(i), 50.0, 0.0, 0.0, 0.0)));
        let cleaned = Preprocessor::clean(&rows).unwrap();

        assert!((cleaned[5].joy_x - 10.0).abs() < 1e-9);
        assert!((cleaned[6].joy_x - 20.0).abs() < 1e-9);
        // Steady state after the window fills with the step value
        assert!((cleaned[9].joy_x - 50.0).abs() < 1e-9);
        assert!((cleaned[14].joy_x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_displacement_copied_verbatim() {
        let mut row = make_raw(&tick_timestamp(0), 10.0, 10.0, 0.5, 0.5);
        row.wheel_disp_l = 1.25;
        row.wheel_disp_r = -0.75;
        let cleaned = Preprocessor::clean(&[row]).unwrap();

        assert_eq!(cleaned[0].wheel_disp_l, 1.25);
        assert_eq!(cleaned[0].wheel_disp_r, -0.75);
        assert!((cleaned[0].disp_mag - 1.25f64.hypot(0.75)).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_timestamp_is_parse_error() {
        let rows = vec![make_raw("2024-03-01 10:00:00", 0.0, 0.0, 0.0, 0.0)];
        let err = Preprocessor::clean(&rows).unwrap_err();
        match err {
            PipelineError::Parse(msg) => assert!(msg.contains("invalid timestamp")),
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        let err = Preprocessor::clean(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }
}
