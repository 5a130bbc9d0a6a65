//! Teleport Core
//!
//! Foundational types shared by the teleport transition crates:
//!
//! - **Geometry**: points, sizes, rectangles and corner styles in a shared
//!   coordinate space
//! - **Draw Abstraction**: a minimal [`Canvas`] trait, a command recorder and
//!   the [`Renderable`] content trait used for overlay proxies
//! - **Keys**: transition identities and role-qualified composite keys
//! - **Bindings**: observable values that drive transition controllers
//! - **Errors**: configuration and validation errors
//!
//! # Example
//!
//! ```rust
//! use teleport_core::{Binding, Rect, TransitionKey};
//!
//! let key = TransitionKey::new("card-42");
//! let bounds = Rect::new(16.0, 120.0, 343.0, 88.0);
//! assert_eq!(bounds.min_y(), 120.0);
//!
//! let presented = Binding::new(false);
//! presented.set(true);
//! assert!(presented.get());
//! assert_eq!(key.as_str(), "card-42");
//! ```

pub mod binding;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod key;

pub use binding::{Binding, BindingSubscription, WeakBinding};
pub use draw::{
    Canvas, ClipShape, Color, DrawCommand, OverlayContent, RecordingCanvas, Renderable,
};
pub use error::{Result, TeleportError};
pub use geometry::{CornerStyle, Point, Rect, Size};
pub use key::{CompositeKey, Identifiable, Role, TransitionKey, DESTINATION_SUFFIX};
