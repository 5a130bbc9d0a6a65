//! Teleport Animation System
//!
//! Drives the conceptual 0 → 1 progress of every transition leg.
//!
//! # Features
//!
//! - **Easing**: standard curves plus arbitrary cubic béziers
//! - **Spring Physics**: RK4-integrated springs with stiffness, damping, mass
//! - **Progress Animations**: timed or spring-driven progress with logical
//!   and settled completion detection
//! - **Interpolation**: `Interpolate` for geometry
//! - **Scheduler**: single-threaded frame scheduler with cancellable delayed
//!   tasks and animation completion callbacks

pub mod curve;
pub mod easing;
pub mod scheduler;
pub mod spring;
pub mod values;

pub use curve::{AnimationCurve, CompletionCriteria, ProgressAnimation};
pub use easing::Easing;
pub use scheduler::{AnimationId, AnimationScheduler, SchedulerHandle, TaskId};
pub use spring::{Spring, SpringConfig};
pub use values::Interpolate;
