use crate::axis::Axis;
use crate::error::GimbalError;

/// Gains and limits for one axis. Fixed once the controller is built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PidGains {
    // Gains
    pub p: f64,
    pub i: f64,
    pub d: f64,

    // Anti-windup
    pub i_min: f64,
    pub i_max: f64,

    // Command clamp
    pub cmd_min: f64,
    pub cmd_max: f64,
}

impl PidGains {
    pub const PITCH: PidGains = PidGains {
        p: 5.0,
        i: 0.0,
        d: 0.0,
        i_min: 0.0,
        i_max: 0.0,
        cmd_min: -0.3,
        cmd_max: 0.3,
    };

    pub const ROLL: PidGains = PidGains {
        p: 5.0,
        i: 0.0,
        d: 0.0,
        i_min: 0.0,
        i_max: 0.0,
        cmd_min: -0.3,
        cmd_max: 0.3,
    };

    pub const YAW: PidGains = PidGains {
        p: 1.0,
        i: 0.0,
        d: 0.0,
        i_min: 0.0,
        i_max: 0.0,
        cmd_min: -1.0,
        cmd_max: 1.0,
    };

    pub fn default_for(axis: Axis) -> Self {
        match axis {
            Axis::Pitch => Self::PITCH,
            Axis::Roll => Self::ROLL,
            Axis::Yaw => Self::YAW,
        }
    }

    pub fn validate(&self, axis: Axis) -> Result<(), GimbalError> {
        let values = [self.p, self.i, self.d, self.i_min, self.i_max, self.cmd_min, self.cmd_max];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GimbalError::InvalidGains { axis, reason: "non-finite value".to_string() });
        }
        if self.i_min > self.i_max {
            return Err(GimbalError::InvalidGains {
                axis,
                reason: format!("i_min {} > i_max {}", self.i_min, self.i_max),
            });
        }
        if self.cmd_min > self.cmd_max {
            return Err(GimbalError::InvalidGains {
                axis,
                reason: format!("cmd_min {} > cmd_max {}", self.cmd_min, self.cmd_max),
            });
        }
        Ok(())
    }
}

/// Single-axis PID with integral and output clamping.
#[derive(Clone, Debug)]
pub struct PidAxis {
    gains: PidGains,

    // State
    integral: f64,
    last_error: f64,
    last_output: f64,
}

impl PidAxis {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            last_error: 0.0,
            last_output: 0.0,
        }
    }

    /// Advances the controller by `dt` seconds with the current `error` and
    /// returns the clamped command.
    ///
    /// A non-positive or non-finite `dt` or a non-finite `error` leaves the
    /// state untouched and returns the neutral command.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        if dt <= 0.0 || !dt.is_finite() || !error.is_finite() {
            return bound(0.0, self.gains.cmd_min, self.gains.cmd_max);
        }
        let g = &self.gains;

        // Proportional term
        let p = g.p * error;

        // Integral term with anti-windup
        self.integral = bound(self.integral + g.i * error * dt, g.i_min, g.i_max);

        // Derivative term
        let d = g.d * (error - self.last_error) / dt;

        self.last_error = error;
        self.last_output = bound(p + self.integral + d, g.cmd_min, g.cmd_max);
        self.last_output
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_output = 0.0;
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }
}

// Like f64::clamp but never panics on inverted bounds.
fn bound(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}
