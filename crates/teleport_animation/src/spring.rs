//! Damped spring driving transition progress
//!
//! Progress runs on a normalized 0.0..1.0 scale, so rest thresholds are far
//! tighter than the pixel-scale thresholds a layout spring would use.

use serde::{Deserialize, Serialize};

/// Distance from target under which progress counts as logically complete
const LOGICAL_EPSILON: f32 = 0.01;
/// Distance and velocity under which the spring is at rest
const REST_EPSILON: f32 = 0.001;
const REST_VELOCITY_EPSILON: f32 = 0.01;

/// Physical parameters of a damped spring
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringConfig {
    pub const fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        SpringConfig {
            stiffness,
            damping,
            mass,
        }
    }

    /// Build a unit-mass spring from a response time and damping fraction
    ///
    /// `response` is the period of the undamped oscillation in seconds;
    /// `damping_fraction` of 1.0 is critically damped.
    pub fn from_response(response: f32, damping_fraction: f32) -> Self {
        let omega = std::f32::consts::TAU / response.max(0.01);
        SpringConfig::new(omega * omega, 2.0 * damping_fraction * omega, 1.0)
    }

    /// Slow and soft, for large sheet-like moves
    pub const fn gentle() -> Self {
        SpringConfig::new(120.0, 14.0, 1.0)
    }

    /// Visible overshoot before settling
    pub const fn wobbly() -> Self {
        SpringConfig::new(180.0, 12.0, 1.0)
    }

    /// Firm with a small overshoot
    pub const fn stiff() -> Self {
        SpringConfig::new(400.0, 30.0, 1.0)
    }

    /// Near-critical, for short hops
    pub const fn snappy() -> Self {
        SpringConfig::new(600.0, 40.0, 1.0)
    }

    /// Damping at which the spring stops oscillating
    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Ratio of actual to critical damping
    pub fn damping_ratio(&self) -> f32 {
        self.damping / self.critical_damping()
    }

    pub fn is_underdamped(&self) -> bool {
        self.damping_ratio() < 1.0
    }

    pub fn is_valid(&self) -> bool {
        [self.stiffness, self.damping, self.mass]
            .iter()
            .all(|v| v.is_finite())
            && self.stiffness > 0.0
            && self.damping > 0.0
            && self.mass > 0.0
    }

    /// Simulated time for a 0 → 1 run to come to rest, capped at `cap_ms`
    pub fn settling_duration_ms(&self, cap_ms: f32) -> f32 {
        const FRAME_MS: f32 = 1000.0 / 120.0;
        let mut trial = Spring::new(*self, 0.0);
        trial.set_target(1.0);
        let mut elapsed = 0.0;
        while elapsed < cap_ms && !trial.is_settled() {
            trial.step(FRAME_MS / 1000.0);
            elapsed += FRAME_MS;
        }
        elapsed.min(cap_ms)
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        SpringConfig::stiff()
    }
}

/// Position and velocity of the spring at one instant
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct PhaseState {
    x: f32,
    v: f32,
}

impl PhaseState {
    /// `self + rate * h`
    fn advance(self, rate: PhaseState, h: f32) -> PhaseState {
        PhaseState {
            x: self.x + rate.x * h,
            v: self.v + rate.v * h,
        }
    }
}

/// Spring integrator with a movable target
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    state: PhaseState,
    target: f32,
}

impl Spring {
    /// A spring at rest at `initial`
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Spring {
            config,
            state: PhaseState { x: initial, v: 0.0 },
            target: initial,
        }
    }

    pub fn value(&self) -> f32 {
        self.state.x
    }

    pub fn velocity(&self) -> f32 {
        self.state.v
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Retarget without touching velocity, so interrupted motion stays smooth
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to rest on the target
    pub fn snap_to_target(&mut self) {
        self.state = PhaseState {
            x: self.target,
            v: 0.0,
        };
    }

    /// Close enough to the target that the leg can be reported as done
    pub fn is_near_target(&self) -> bool {
        (self.state.x - self.target).abs() < LOGICAL_EPSILON
    }

    /// At rest on the target with negligible velocity
    pub fn is_settled(&self) -> bool {
        (self.state.x - self.target).abs() < REST_EPSILON
            && self.state.v.abs() < REST_VELOCITY_EPSILON
    }

    /// Advance by `dt` seconds with a fourth-order Runge-Kutta step
    pub fn step(&mut self, dt: f32) {
        if self.is_settled() {
            self.snap_to_target();
            return;
        }

        let s = self.state;
        let k1 = self.derivative(s);
        let k2 = self.derivative(s.advance(k1, dt / 2.0));
        let k3 = self.derivative(s.advance(k2, dt / 2.0));
        let k4 = self.derivative(s.advance(k3, dt));

        let blended = PhaseState {
            x: k1.x + 2.0 * (k2.x + k3.x) + k4.x,
            v: k1.v + 2.0 * (k2.v + k3.v) + k4.v,
        };
        self.state = s.advance(blended, dt / 6.0);
    }

    /// Rate of change of (position, velocity) at `s`
    fn derivative(&self, s: PhaseState) -> PhaseState {
        let SpringConfig {
            stiffness,
            damping,
            mass,
        } = self.config;
        let displacement = s.x - self.target;
        PhaseState {
            x: s.v,
            v: -(stiffness * displacement + damping * s.v) / mass,
        }
    }
}
