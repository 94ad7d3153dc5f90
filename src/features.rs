//! Session feature extraction
//!
//! Aggregates a cleaned session series into the fixed feature vector the
//! classifier consumes: timing, path length, the six-sector directional
//! histogram, bout statistics, and path efficiency. Every computation is a
//! pure aggregate over the full series or a bout span.
//!
//! Degenerate sessions (zero session time, zero bouts, no joystick
//! engagement) produce NaN in the affected fields rather than failing; the
//! classifier stage decides what to do with undefined values.

use crate::bouts::BoutDetector;
use crate::error::PipelineError;
use crate::types::{Bout, SessionFeatures, SessionSample, TICK_SECONDS};

/// Per-tick displacement deltas at or below this are drivetrain noise
pub const PATH_NOISE_FLOOR: f64 = 0.01;

/// Joystick magnitude at or above this counts as a near-limit sample
pub const EDGE_JOY_MAG: f64 = 98.5;

/// Movement bouts shorter than this are "short", in seconds
pub const SHORT_BOUT_S: f64 = 2.0;

/// Meters to feet
const FT_PER_M: f64 = 3.28084;

/// Directional histogram shares, ordered FR, F, FL, BL, B, BR
/// (six 60-degree sectors starting at 0)
#[derive(Debug, Clone, Copy, PartialEq)]
struct DirectionHistogram {
    shares: [f64; 6],
}

/// Feature extractor for cleaned session series
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Extract the session feature vector.
    pub fn extract(samples: &[SessionSample]) -> Result<SessionFeatures, PipelineError> {
        if samples.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let session_time_min =
            (samples[samples.len() - 1].elapsed_s - samples[0].elapsed_s) / 60.0;

        let active_ticks = samples
            .iter()
            .filter(|s| s.joy_x != 0.0 || s.joy_y != 0.0)
            .count();
        let moving_ticks = samples
            .iter()
            .filter(|s| s.wheel_vel_l != 0.0 || s.wheel_vel_r != 0.0)
            .count();
        let active_time_min = active_ticks as f64 * TICK_SECONDS / 60.0;
        let moving_time_min = moving_ticks as f64 * TICK_SECONDS / 60.0;

        let path_length = session_path_length(samples);
        let histogram = direction_histogram(samples);

        let bouts = BoutDetector::segment(samples);
        let per_bout = PerBoutStats::collect(samples, &bouts);

        let num_bouts = bouts.len() as u32;
        let durations: Vec<f64> = bouts.iter().map(|b| b.duration_s).collect();
        let move_durations: Vec<f64> = bouts
            .iter()
            .filter(|b| b.is_movement())
            .map(|b| b.duration_s)
            .collect();
        let joy_activations = move_durations.len() as u32;
        let joy_attempts = num_bouts - joy_activations;

        let total = joy_activations + joy_attempts;
        let activation_ratio = if total > 0 {
            joy_activations as f64 / total as f64
        } else {
            0.0
        };

        let per_move_2s = if move_durations.is_empty() {
            f64::NAN
        } else {
            let short = move_durations.iter().filter(|d| **d < SHORT_BOUT_S).count();
            short as f64 / move_durations.len() as f64
        };

        let per_session = |count: f64| {
            if session_time_min > 0.0 {
                count / session_time_min
            } else {
                f64::NAN
            }
        };

        let joy_path_mean = mean(&per_bout.joy_paths);

        Ok(SessionFeatures {
            session_time_min,
            active_time_min,
            moving_time_min,
            avg_path_length: path_length,
            hist_fr: histogram.shares[0] * 100.0,
            hist_f: histogram.shares[1] * 100.0,
            hist_fl: histogram.shares[2] * 100.0,
            hist_bl: histogram.shares[3] * 100.0,
            hist_b: histogram.shares[4] * 100.0,
            hist_br: histogram.shares[5] * 100.0,
            path_ft: path_length * FT_PER_M,
            hist_joy_per6_fr: histogram.shares[0],
            hist_joy_per6_f: histogram.shares[1],
            hist_joy_per6_fl: histogram.shares[2],
            hist_joy_per6_bl: histogram.shares[3],
            hist_joy_per6_b: histogram.shares[4],
            hist_joy_per6_br: histogram.shares[5],
            num_bouts,
            mean_bout_duration_s: mean(&durations),
            max_bout_duration_s: max(&durations),
            joy_activations,
            joy_attempts,
            activation_ratio,
            per_max_mean: mean(&per_bout.per_max),
            per_max_std: population_std(&per_bout.per_max),
            per_move_2s,
            angle_range_mean: mean(&per_bout.angle_ranges),
            move_mean_dur: mean(&move_durations),
            joy_count_norm: per_session(num_bouts as f64),
            move_count_norm: per_session(joy_activations as f64),
            path_length_avg_norm: per_session(path_length),
            path_efficiency: path_length / joy_path_mean,
        })
    }
}

/// Overall wheel path length: per-wheel sum of absolute per-tick
/// displacement changes above the noise floor, averaged across the two
/// wheels.
fn session_path_length(samples: &[SessionSample]) -> f64 {
    let mut left = 0.0;
    let mut right = 0.0;
    for pair in samples.windows(2) {
        let dl = (pair[1].wheel_disp_l - pair[0].wheel_disp_l).abs();
        if dl > PATH_NOISE_FLOOR {
            left += dl;
        }
        let dr = (pair[1].wheel_disp_r - pair[0].wheel_disp_r).abs();
        if dr > PATH_NOISE_FLOOR {
            right += dr;
        }
    }
    (left + right) / 2.0
}

/// Joystick heading in degrees, normalized to [0, 360)
fn joystick_angle_deg(joy_x: f64, joy_y: f64) -> f64 {
    joy_y.atan2(joy_x).to_degrees().rem_euclid(360.0)
}

/// Six-sector directional histogram over every tick after the first with a
/// nonzero joystick vector. All bins are NaN when no such tick exists.
fn direction_histogram(samples: &[SessionSample]) -> DirectionHistogram {
    let mut counts = [0usize; 6];
    let mut total = 0usize;

    for sample in samples.iter().skip(1) {
        if sample.joy_x == 0.0 && sample.joy_y == 0.0 {
            continue;
        }
        let angle = joystick_angle_deg(sample.joy_x, sample.joy_y);
        let bin = ((angle / 60.0) as usize).min(5);
        counts[bin] += 1;
        total += 1;
    }

    if total == 0 {
        return DirectionHistogram {
            shares: [f64::NAN; 6],
        };
    }

    let mut shares = [0.0; 6];
    for (share, count) in shares.iter_mut().zip(counts) {
        *share = count as f64 / total as f64;
    }
    DirectionHistogram { shares }
}

/// Per-bout aggregates gathered in one pass over the bout spans.
struct PerBoutStats {
    /// Percent of span ticks at or above the near-limit magnitude
    per_max: Vec<f64>,
    /// Angular range over the span's nonzero ticks, folded to the minor arc
    angle_ranges: Vec<f64>,
    /// Euclidean joystick travel over the span
    joy_paths: Vec<f64>,
}

impl PerBoutStats {
    fn collect(samples: &[SessionSample], bouts: &[Bout]) -> Self {
        let mut per_max = Vec::with_capacity(bouts.len());
        let mut angle_ranges = Vec::with_capacity(bouts.len());
        let mut joy_paths = Vec::with_capacity(bouts.len());

        for bout in bouts {
            let span = &samples[bout.start..bout.end];

            let at_edge = span.iter().filter(|s| s.joy_mag >= EDGE_JOY_MAG).count();
            per_max.push(at_edge as f64 / span.len() as f64 * 100.0);

            let angles: Vec<f64> = span
                .iter()
                .filter(|s| s.joy_mag > 0.0)
                .map(|s| joystick_angle_deg(s.joy_x, s.joy_y))
                .collect();
            if !angles.is_empty() {
                let max_angle = angles.iter().copied().fold(f64::MIN, f64::max);
                let min_angle = angles.iter().copied().fold(f64::MAX, f64::min);
                let raw = max_angle - min_angle;
                angle_ranges.push(if raw > 180.0 { 360.0 - raw } else { raw });
            }

            let joy_path: f64 = span
                .windows(2)
                .map(|pair| (pair[1].joy_x - pair[0].joy_x).hypot(pair[1].joy_y - pair[0].joy_y))
                .sum();
            joy_paths.push(joy_path);
        }

        Self {
            per_max,
            angle_ranges,
            joy_paths,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().copied().fold(f64::MIN, f64::max)
    }
}

/// Population standard deviation (NaN for an empty slice)
fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
