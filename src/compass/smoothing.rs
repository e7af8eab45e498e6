use crate::geodesy::normalize_degrees;

/// Signed shortest rotation from `from` to `to`, degrees in [-180, 180)
pub fn shortest_delta(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

/// One exponential smoothing step that respects the 0/360 wrap
pub fn smooth_heading(current: f64, target: f64, alpha: f64) -> f64 {
    normalize_degrees(current + shortest_delta(current, target) * alpha)
}

/// Exponential heading smoother
///
/// Each update moves the output a fraction `alpha` of the way towards the
/// new heading along the short arc, so the output never jumps by more than
/// `|delta| * alpha` even when the input crosses north.
#[derive(Clone, Debug)]
pub struct HeadingSmoother {
    alpha: f64,
    current: f64,
}

impl HeadingSmoother {
    pub fn new(alpha: f64) -> Self {
        HeadingSmoother {
            alpha: alpha.clamp(0.0, 1.0),
            current: 0.0,
        }
    }

    pub fn with_initial(mut self, heading: f64) -> Self {
        self.current = normalize_degrees(heading);
        self
    }

    /// Feed a heading and return the smoothed value
    pub fn apply(&mut self, heading: f64) -> f64 {
        self.current = smooth_heading(self.current, heading, self.alpha);
        self.current
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}
