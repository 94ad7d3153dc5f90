//! Bout segmentation
//!
//! A bout is a contiguous interval of nonzero joystick engagement. It opens
//! at the first nonzero-magnitude tick after the previous bout closed, and
//! closes once a run of zero-magnitude ticks reaches the inactivity gap
//! (0.1 s at the nominal rate). Closed bouts are retained only if their
//! peak joystick magnitude reached the validation threshold, and are
//! classified as movement or attempt by the mean wheel-velocity rule.
//!
//! A bout still open when the series ends never saw its bounding gap and is
//! discarded.

use crate::types::{Bout, BoutKind, SessionSample, TICK_SECONDS};

/// Consecutive zero-magnitude ticks that close a bout (0.1 s at 120 Hz)
pub const PAUSE_TICKS: usize = 12;

/// Minimum peak joystick magnitude for a bout to be retained
pub const MIN_PEAK_JOY_MAG: f64 = 7.0;

/// Mean wheel-velocity magnitude separating movement bouts from attempts
pub const MOVEMENT_MEAN_VEL: f64 = 0.01;

/// Bout detector over a cleaned session series
pub struct BoutDetector;

impl BoutDetector {
    /// Segment the series into retained bouts, in order of occurrence.
    pub fn segment(samples: &[SessionSample]) -> Vec<Bout> {
        let mut bouts = Vec::new();
        let mut start: Option<usize> = None;
        let mut last_active = 0usize;
        let mut zero_run = 0usize;

        for (i, sample) in samples.iter().enumerate() {
            if sample.joy_mag > 0.0 {
                if start.is_none() {
                    start = Some(i);
                }
                last_active = i;
                zero_run = 0;
            } else if let Some(open) = start {
                zero_run += 1;
                if zero_run >= PAUSE_TICKS {
                    if let Some(bout) = close_bout(samples, open, last_active + 1) {
                        bouts.push(bout);
                    }
                    start = None;
                    zero_run = 0;
                }
            }
        }

        bouts
    }
}

/// Validate and classify a closed bout. The span runs from the opening
/// tick to one past the last nonzero tick; the closing gap is excluded.
fn close_bout(samples: &[SessionSample], start: usize, end: usize) -> Option<Bout> {
    let span = &samples[start..end];

    let peak_joy_mag = span.iter().map(|s| s.joy_mag).fold(f64::MIN, f64::max);
    if peak_joy_mag < MIN_PEAK_JOY_MAG {
        return None;
    }

    let active: Vec<f64> = span
        .iter()
        .filter(|s| s.joy_mag > 0.0)
        .map(|s| s.vel_mag)
        .collect();
    let mean_vel_mag = if active.is_empty() {
        0.0
    } else {
        active.iter().sum::<f64>() / active.len() as f64
    };

    let kind = if mean_vel_mag >= MOVEMENT_MEAN_VEL {
        BoutKind::Movement
    } else {
        BoutKind::Attempt
    };

    Some(Bout {
        start,
        end,
        duration_s: (end - start) as f64 * TICK_SECONDS,
        peak_joy_mag,
        mean_vel_mag,
        kind,
    })
}
