//! Teleport Transitions
//!
//! Keyed transitions that carry a visual element from a source location to
//! a destination location, even when the two live in unrelated subtrees.
//! During the transition an overlay proxy is drawn above both subtrees while
//! the real views hide, so there is never a double image.
//!
//! # Pieces
//!
//! - [`Registry`]: ordered, observable store of [`TransitionRecord`]s, one
//!   per [`TransitionKey`](teleport_core::TransitionKey)
//! - [`GeometryObserver`] / [`Observed`]: report source and destination
//!   bounds and decide the real content's opacity
//! - [`TransitionController`] / [`IdentityController`]: the phase state
//!   machine, driven by a boolean or by the selected item
//! - [`OverlayRenderer`]: interpolates and draws the proxies
//! - [`TeleportContainer`]: wires all of the above to one scheduler and runs
//!   the frame loop
//!
//! # Phases
//!
//! ```text
//! Idle ──forward──▶ AnimatingForward ──done──▶ ForwardSettled
//!  ▲                      │                          │
//!  │                   reverse                    reverse
//!  │                      ▼                          │
//!  └──────done──── AnimatingReverse ◀────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use teleport_core::{Binding, Color, OverlayContent};
//! use teleport_transition::prelude::*;
//!
//! let container = wrap_as_container(false);
//! let selected: Binding<Option<u32>> = Binding::new(None);
//! let controller = container.drive_identity_transition(
//!     &selected,
//!     container.options().with_corner(container.corner(8.0, 0.0)),
//!     |_id| OverlayContent::new(Color::GREEN),
//! );
//!
//! selected.set(Some(7));
//! container.scheduler().run_until_idle(240);
//! assert_eq!(controller.phase_of(&7), Phase::ForwardSettled);
//! ```

pub mod config;
pub mod container;
pub mod controller;
mod engine;
pub mod observer;
pub mod overlay;
pub mod record;
pub mod registry;

pub use config::{RetentionPolicy, TeleportConfig};
pub use container::{wrap_as_container, FrameStats, ScenePhase, TeleportContainer};
pub use controller::{IdentityController, TransitionController, TransitionOptions};
pub use observer::{GeometryObserver, Observed};
pub use overlay::{CoordinateSpace, OverlayCorner, OverlayFrame, OverlayRenderer, ResolvedOverlay};
pub use record::{
    AnimationSpec, CompletionCallback, CompletionMode, CornerSpec, Phase, TransitionRecord,
};
pub use registry::{Registry, RegistryEvent, SubscriptionId};

/// Everything a host needs to set up transitions
pub mod prelude {
    pub use crate::config::{RetentionPolicy, TeleportConfig};
    pub use crate::container::{wrap_as_container, ScenePhase, TeleportContainer};
    pub use crate::controller::{IdentityController, TransitionController, TransitionOptions};
    pub use crate::record::{AnimationSpec, CompletionMode, CornerSpec, Phase};
    pub use teleport_animation::{AnimationCurve, Easing, SpringConfig};
}
