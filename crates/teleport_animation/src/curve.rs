//! Animation curves and progress animations
//!
//! Every transition leg animates one conceptual progress value: 0 → 1 on the
//! forward leg and back toward 0 on the reverse leg. A [`ProgressAnimation`]
//! produces that value frame by frame from an [`AnimationCurve`], and knows
//! when the leg is logically complete versus fully at rest.

use serde::{Deserialize, Serialize};
use teleport_core::{Result, TeleportError};

use crate::easing::Easing;
use crate::spring::{Spring, SpringConfig};

/// Longest a spring leg may run; it snaps to its target at this point
const SPRING_DURATION_CAP_MS: f32 = 10_000.0;

/// How progress moves over time
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnimationCurve {
    /// Fixed-duration animation shaped by an easing function
    Timed { easing: Easing, duration_ms: u32 },
    /// Physically simulated spring; duration emerges from the parameters
    Spring { config: SpringConfig },
}

impl AnimationCurve {
    pub fn linear(duration_ms: u32) -> Self {
        AnimationCurve::Timed {
            easing: Easing::Linear,
            duration_ms,
        }
    }

    pub fn ease_in_out(duration_ms: u32) -> Self {
        AnimationCurve::Timed {
            easing: Easing::EaseInOut,
            duration_ms,
        }
    }

    pub fn timed(easing: Easing, duration_ms: u32) -> Self {
        AnimationCurve::Timed {
            easing,
            duration_ms,
        }
    }

    pub fn spring(config: SpringConfig) -> Self {
        AnimationCurve::Spring { config }
    }

    /// Expected wall time of one leg
    ///
    /// Exact for timed curves, simulated for springs. Only the fixed-duration
    /// completion fallback relies on this.
    pub fn nominal_duration_ms(&self) -> f32 {
        match self {
            AnimationCurve::Timed { duration_ms, .. } => *duration_ms as f32,
            AnimationCurve::Spring { config } => {
                config.settling_duration_ms(SPRING_DURATION_CAP_MS)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            AnimationCurve::Timed { easing, .. } if !easing.is_valid() => Err(
                TeleportError::InvalidCurve(format!("easing control points out of range: {easing:?}")),
            ),
            AnimationCurve::Spring { config } if !config.is_valid() => Err(
                TeleportError::InvalidCurve(format!("spring parameters must be positive: {config:?}")),
            ),
            _ => Ok(()),
        }
    }
}

impl Default for AnimationCurve {
    fn default() -> Self {
        AnimationCurve::ease_in_out(350)
    }
}

/// When a running animation counts as complete
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionCriteria {
    /// As soon as the value has effectively reached its target
    #[default]
    LogicallyComplete,
    /// Only once the animation has fully come to rest
    Removed,
}

#[derive(Clone, Copy, Debug)]
enum Driver {
    Timed {
        easing: Easing,
        duration_ms: f32,
        elapsed_ms: f32,
        from: f32,
    },
    Spring { spring: Spring, elapsed_ms: f32 },
}

/// A single progress value animating toward a target
#[derive(Clone, Copy, Debug)]
pub struct ProgressAnimation {
    driver: Driver,
    target: f32,
}

impl ProgressAnimation {
    pub fn new(curve: AnimationCurve, from: f32, to: f32) -> Self {
        let driver = match curve {
            AnimationCurve::Timed {
                easing,
                duration_ms,
            } => Driver::Timed {
                easing,
                duration_ms: duration_ms as f32,
                elapsed_ms: 0.0,
                from,
            },
            AnimationCurve::Spring { config } => {
                let mut spring = Spring::new(config, from);
                spring.set_target(to);
                Driver::Spring {
                    spring,
                    elapsed_ms: 0.0,
                }
            }
        };
        Self { driver, target: to }
    }

    /// Forward leg: 0 → 1
    pub fn forward(curve: AnimationCurve) -> Self {
        Self::new(curve, 0.0, 1.0)
    }

    pub fn value(&self) -> f32 {
        match &self.driver {
            Driver::Timed {
                easing,
                duration_ms,
                elapsed_ms,
                from,
            } => {
                let t = if *duration_ms <= 0.0 {
                    1.0
                } else {
                    elapsed_ms / duration_ms
                };
                from + (self.target - from) * easing.apply(t)
            }
            Driver::Spring { spring, .. } => spring.value(),
        }
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Advance by `dt_ms` milliseconds
    pub fn step(&mut self, dt_ms: f32) {
        match &mut self.driver {
            Driver::Timed {
                duration_ms,
                elapsed_ms,
                ..
            } => {
                *elapsed_ms = (*elapsed_ms + dt_ms).min(*duration_ms);
            }
            Driver::Spring { spring, elapsed_ms } => {
                spring.step(dt_ms / 1000.0);
                *elapsed_ms += dt_ms;
                if *elapsed_ms >= SPRING_DURATION_CAP_MS {
                    spring.snap_to_target();
                }
            }
        }
    }

    /// Aim at a new target, continuing from the current value
    ///
    /// Springs keep their velocity; both kinds restart their clock from the
    /// current value.
    pub fn retarget(&mut self, target: f32) {
        let current = self.value();
        match &mut self.driver {
            Driver::Timed {
                elapsed_ms, from, ..
            } => {
                *from = current;
                *elapsed_ms = 0.0;
            }
            Driver::Spring { spring, elapsed_ms } => {
                spring.set_target(target);
                *elapsed_ms = 0.0;
            }
        }
        self.target = target;
    }

    pub fn is_logically_complete(&self) -> bool {
        match &self.driver {
            Driver::Timed {
                duration_ms,
                elapsed_ms,
                ..
            } => elapsed_ms >= duration_ms,
            Driver::Spring { spring, .. } => spring.is_near_target(),
        }
    }

    /// Fully at rest; nothing left to present
    pub fn is_finished(&self) -> bool {
        match &self.driver {
            Driver::Timed {
                duration_ms,
                elapsed_ms,
                ..
            } => elapsed_ms >= duration_ms,
            Driver::Spring { spring, .. } => spring.is_settled(),
        }
    }

    pub fn is_complete(&self, criteria: CompletionCriteria) -> bool {
        match criteria {
            CompletionCriteria::LogicallyComplete => self.is_logically_complete(),
            CompletionCriteria::Removed => self.is_finished(),
        }
    }
}
