//! Geometry observers
//!
//! A [`GeometryObserver`] stands in for one end of a transition inside the
//! host's view tree. On every layout pass it reports its bounds (once the
//! transition's cycle is open) and it tells the host how opaque the real
//! content should be so that the overlay proxy and the real content never
//! show at the same time.
//!
//! | record state                        | source | destination |
//! |-------------------------------------|--------|-------------|
//! | missing / not initialized           | 1      | 1           |
//! | initialized, proxy visible          | 1 or 0 | 0           |
//! | forward settled (`hide_destination`)| 0      | 1           |
//!
//! The source hides as soon as the destination geometry is known.

use teleport_core::{Canvas, Rect, Renderable, Role, TransitionKey};

use crate::registry::Registry;

/// One end of a keyed transition
#[derive(Clone, Debug)]
pub struct GeometryObserver {
    key: TransitionKey,
    role: Role,
    registry: Registry,
}

impl GeometryObserver {
    /// Create an observer, registering a default record for `key`
    pub fn new(key: impl Into<TransitionKey>, role: Role, registry: &Registry) -> Self {
        let key = key.into();
        registry.upsert(key.clone());
        Self {
            key,
            role,
            registry: registry.clone(),
        }
    }

    pub fn source(key: impl Into<TransitionKey>, registry: &Registry) -> Self {
        Self::new(key, Role::Source, registry)
    }

    pub fn destination(key: impl Into<TransitionKey>, registry: &Registry) -> Self {
        Self::new(key, Role::Destination, registry)
    }

    pub fn key(&self) -> &TransitionKey {
        &self.key
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Report this observer's bounds for the current layout pass
    ///
    /// Returns true when a report was made. Nothing is reported until a
    /// controller has opened a cycle for the key.
    pub fn layout(&self, bounds: Rect) -> bool {
        let initialized = self
            .registry
            .with(self.key.as_str(), |r| r.initialized)
            .unwrap_or(false);
        if !initialized {
            return false;
        }
        self.registry
            .report_anchor(self.key.composite(self.role), bounds);
        true
    }

    /// Opacity the real content should be drawn with
    pub fn opacity(&self) -> f32 {
        self.registry
            .with(self.key.as_str(), |record| match self.role {
                Role::Source => {
                    if record.destination_anchor.is_none() {
                        1.0
                    } else {
                        0.0
                    }
                }
                Role::Destination => {
                    if !record.initialized || record.hide_destination {
                        1.0
                    } else {
                        0.0
                    }
                }
            })
            .unwrap_or(1.0)
    }
}

/// Content wrapped by a geometry observer
///
/// Drawing an `Observed` reports its frame and then draws the content under
/// the observer's opacity.
#[derive(Clone, Debug)]
pub struct Observed<C> {
    observer: GeometryObserver,
    content: C,
}

impl<C: Renderable> Observed<C> {
    pub fn new(observer: GeometryObserver, content: C) -> Self {
        Self { observer, content }
    }

    pub fn observer(&self) -> &GeometryObserver {
        &self.observer
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, frame: Rect) {
        self.observer.layout(frame);
        let opacity = self.observer.opacity();
        if opacity <= 0.0 {
            return;
        }
        canvas.push_opacity(opacity);
        self.content.render(canvas, frame);
        canvas.pop_opacity();
    }
}

impl<C: Renderable> Renderable for Observed<C> {
    fn render(&self, canvas: &mut dyn Canvas, frame: Rect) {
        self.draw(canvas, frame);
    }
}
