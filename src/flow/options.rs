//! Tunable parameters of the flow.

use crate::error::{MeshError, Result};

/// Options for the curvature flow driver.
///
/// Builder methods never fail; out-of-range values are clamped. Call
/// [`FlowOptions::validate`] to reject them instead.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOptions {
    /// Multiplier from elapsed seconds to step scale: `step_scale = dt * flow_speed`.
    pub flow_speed: f64,

    /// Gain applied to the curvature vector for colour mapping.
    ///
    /// Cosmetic only; the physical curvature is never scaled.
    pub visualization_gain: f64,

    /// Upper bound on the time delta of a single tick, in seconds.
    ///
    /// `None` (the default) applies whatever time has elapsed, which after a
    /// long pause can fold the mesh.
    pub max_time_step: Option<f64>,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            flow_speed: 0.05,
            visualization_gain: 0.25,
            max_time_step: None,
            parallel: true,
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

impl FlowOptions {
    /// Set the flow speed.
    pub fn with_flow_speed(mut self, flow_speed: f64) -> Self {
        self.flow_speed = non_negative(flow_speed);
        self
    }

    /// Set the visualization gain.
    pub fn with_visualization_gain(mut self, gain: f64) -> Self {
        self.visualization_gain = non_negative(gain);
        self
    }

    /// Cap the time delta applied by one tick.
    pub fn with_max_time_step(mut self, max_time_step: f64) -> Self {
        self.max_time_step = Some(non_negative(max_time_step));
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Check every parameter, returning the first bad one.
    pub fn validate(&self) -> Result<()> {
        if !self.flow_speed.is_finite() || self.flow_speed < 0.0 {
            return Err(MeshError::invalid_param(
                "flow_speed",
                self.flow_speed,
                "must be finite and non-negative",
            ));
        }
        if !self.visualization_gain.is_finite() || self.visualization_gain < 0.0 {
            return Err(MeshError::invalid_param(
                "visualization_gain",
                self.visualization_gain,
                "must be finite and non-negative",
            ));
        }
        if let Some(max) = self.max_time_step {
            if !max.is_finite() || max < 0.0 {
                return Err(MeshError::invalid_param(
                    "max_time_step",
                    max,
                    "must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Apply the optional cap to a raw time delta.
    ///
    /// Negative or non-finite deltas become zero.
    #[inline]
    pub fn clamp_time_step(&self, dt: f64) -> f64 {
        let dt = non_negative(dt);
        match self.max_time_step {
            Some(max) => dt.min(max),
            None => dt,
        }
    }

    /// Step scale for a time delta, after clamping.
    #[inline]
    pub fn step_scale(&self, dt: f64) -> f64 {
        self.clamp_time_step(dt) * self.flow_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = FlowOptions::default();
        assert_eq!(options.flow_speed, 0.05);
        assert_eq!(options.visualization_gain, 0.25);
        assert_eq!(options.max_time_step, None);
        assert!(options.parallel);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_clamps() {
        let options = FlowOptions::default()
            .with_flow_speed(-3.0)
            .with_visualization_gain(f64::NAN)
            .with_max_time_step(-1.0)
            .sequential();
        assert_eq!(options.flow_speed, 0.0);
        assert_eq!(options.visualization_gain, 0.0);
        assert_eq!(options.max_time_step, Some(0.0));
        assert!(!options.parallel);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_direct_assignment() {
        let options = FlowOptions {
            flow_speed: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(MeshError::InvalidParameter { name: "flow_speed", .. })
        ));

        let options = FlowOptions {
            max_time_step: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(MeshError::InvalidParameter { name: "max_time_step", .. })
        ));
    }

    #[test]
    fn test_step_scale() {
        let options = FlowOptions::default().with_flow_speed(2.0);
        assert_eq!(options.step_scale(0.5), 1.0);
        assert_eq!(options.step_scale(-0.5), 0.0);

        let capped = options.with_max_time_step(0.1);
        assert!((capped.step_scale(10.0) - 0.2).abs() < 1e-15);
    }
}
