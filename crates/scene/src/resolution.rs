use foundation::time::Time;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::knot_manager::KnotManager;

/// Camera-altitude interval in which a knot may be shown.
///
/// Either bound may be absent, meaning unbounded on that side. Both bounds
/// are inclusive.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRange {
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

impl ResolutionRange {
    pub const UNBOUNDED: Self = Self {
        start: None,
        end: None,
    };

    pub fn new(start: Option<f64>, end: Option<f64>) -> Self {
        Self { start, end }
    }

    pub fn between(start: f64, end: f64) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, altitude: f64) -> bool {
        self.start.is_none_or(|s| s <= altitude) && self.end.is_none_or(|e| altitude <= e)
    }
}

/// Periodic resolution guard, ticked from the frame loop.
///
/// Staleness is bounded by `interval_s`: a camera move is reflected in
/// knot visibility on the first tick at least `interval_s` after the
/// previous check.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionMonitor {
    interval_s: f64,
    last_check: Option<Time>,
}

/// Guard re-evaluations shorter than this are treated as on time.
const INTERVAL_EPS_S: f64 = 1e-9;

impl ResolutionMonitor {
    pub fn new(interval_s: f64) -> Self {
        Self {
            interval_s: interval_s.max(0.0),
            last_check: None,
        }
    }

    pub fn interval_s(&self) -> f64 {
        self.interval_s
    }

    pub fn is_due(&self, now: Time) -> bool {
        match self.last_check {
            None => true,
            Some(last) => now.seconds_since(last) + INTERVAL_EPS_S >= self.interval_s,
        }
    }

    /// Re-evaluate every knot against `camera` if a check is due.
    ///
    /// Returns whether the guard ran.
    pub fn tick(&mut self, now: Time, camera: &Camera, knots: &mut KnotManager) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.last_check = Some(now);
        knots.apply_resolution(camera.altitude());
        true
    }
}

impl Default for ResolutionMonitor {
    fn default() -> Self {
        Self::new(0.1)
    }
}
