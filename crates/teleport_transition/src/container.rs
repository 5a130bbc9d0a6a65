//! Teleport container
//!
//! The container is the root a host wraps its UI in. It owns the registry,
//! the scheduler and the overlay renderer for one window, hands out
//! observers and controllers wired to them, and runs the per-frame loop:
//!
//! 1. advance the scheduler (delayed starts, animation steps, completions)
//! 2. let the host draw its content, during which observers report bounds
//! 3. draw the overlay proxies on top
//! 4. resolve the reported anchors for the next frame
//!
//! Observers pick their opacity and the overlay picks its proxies from the
//! same resolved anchors, so a frame never shows the real source together
//! with its proxy.
//!
//! ```rust
//! use teleport_core::{Binding, Color, OverlayContent, RecordingCanvas, Rect};
//! use teleport_transition::{TeleportConfig, TeleportContainer};
//!
//! let container = TeleportContainer::new(TeleportConfig::testing());
//! let source = container.mark_as_source("photo", Color::RED);
//! let destination = container.mark_as_destination("photo", Color::RED);
//! let presented = Binding::new(false);
//! let _controller = container.drive_transition(
//!     "photo",
//!     &presented,
//!     container.options(),
//!     || OverlayContent::new(Color::RED),
//! );
//!
//! presented.set(true);
//! let mut canvas = RecordingCanvas::new();
//! for _ in 0..20 {
//!     container.frame(16.0, &mut canvas, |canvas| {
//!         source.draw(canvas, Rect::new(20.0, 100.0, 80.0, 80.0));
//!         destination.draw(canvas, Rect::new(0.0, 0.0, 390.0, 390.0));
//!     });
//! }
//! assert_eq!(container.active_overlay_count(), 0);
//! ```

use std::fmt;

use teleport_animation::AnimationScheduler;
use teleport_core::{Binding, Canvas, Identifiable, OverlayContent, Renderable, Result, TransitionKey};

use crate::config::TeleportConfig;
use crate::controller::{IdentityController, TransitionController, TransitionOptions};
use crate::engine;
use crate::observer::{GeometryObserver, Observed};
use crate::overlay::{CoordinateSpace, OverlayRenderer};
use crate::record::CornerSpec;
use crate::registry::Registry;

/// Host scene lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScenePhase {
    /// Foreground and interactive
    #[default]
    Active,
    /// Visible but not receiving input
    Inactive,
    /// Not visible; transition state is torn down
    Background,
}

/// What one call to [`TeleportContainer::frame`] did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Scheduler still has tasks or animations outstanding
    pub animating: bool,
    /// Anchors written while resolving this frame's reports
    pub anchors_written: usize,
    /// Overlay proxies drawn
    pub overlays_drawn: usize,
}

/// Root of a teleport-enabled view hierarchy
pub struct TeleportContainer {
    config: TeleportConfig,
    registry: Registry,
    scheduler: AnimationScheduler,
    renderer: OverlayRenderer,
    scene_phase: ScenePhase,
    mounted: bool,
}

impl TeleportContainer {
    /// Create a container from `config`
    ///
    /// An invalid config is replaced by [`TeleportConfig::standard`] with a
    /// warning; use [`TeleportContainer::try_new`] to reject it instead.
    pub fn new(config: TeleportConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                tracing::warn!("TeleportContainer: {}, using the standard config", err);
                TeleportConfig::standard()
            }
        };
        Self::build(config)
    }

    pub fn try_new(config: TeleportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TeleportConfig) -> Self {
        let scheduler = AnimationScheduler::new();
        scheduler.set_target_fps(config.target_fps);
        tracing::debug!(
            "TeleportContainer: created, hide_status_bar={}, retention={:?}",
            config.hide_status_bar,
            config.retention
        );
        Self {
            config,
            registry: Registry::new(),
            scheduler,
            renderer: OverlayRenderer::default(),
            scene_phase: ScenePhase::Active,
            mounted: true,
        }
    }

    pub fn config(&self) -> &TeleportConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn scene_phase(&self) -> ScenePhase {
        self.scene_phase
    }

    /// Overlay is attached and drawing
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn set_coordinate_space(&mut self, space: CoordinateSpace) {
        self.renderer.set_space(space);
    }

    /// Follow the host scene lifecycle
    ///
    /// Entering the background cancels every pending start and running leg
    /// and clears the registry. Each open cycle still receives the
    /// completion calls it is owed, forward first, then reverse.
    pub fn set_scene_phase(&mut self, phase: ScenePhase) {
        if phase == self.scene_phase {
            return;
        }
        tracing::debug!(
            "TeleportContainer: scene {:?} -> {:?}",
            self.scene_phase,
            phase
        );
        self.scene_phase = phase;
        match phase {
            ScenePhase::Active => self.mounted = true,
            ScenePhase::Inactive => {}
            ScenePhase::Background => {
                self.mounted = false;
                let closed = engine::teardown(&self.registry, &self.scheduler);
                tracing::debug!("TeleportContainer: closed {} open cycles", closed);
            }
        }
    }

    /// Default transition options derived from the config
    pub fn options(&self) -> TransitionOptions {
        TransitionOptions::new()
            .with_animation(self.config.animation)
            .with_retention(self.config.retention)
    }

    /// Corner spec using the configured corner style
    pub fn corner(&self, source_radius: f32, destination_radius: f32) -> CornerSpec {
        CornerSpec::new(source_radius, destination_radius).with_style(self.config.corner_style)
    }

    pub fn mark_as_source<C: Renderable>(
        &self,
        key: impl Into<TransitionKey>,
        content: C,
    ) -> Observed<C> {
        Observed::new(GeometryObserver::source(key, &self.registry), content)
    }

    pub fn mark_as_destination<C: Renderable>(
        &self,
        key: impl Into<TransitionKey>,
        content: C,
    ) -> Observed<C> {
        Observed::new(GeometryObserver::destination(key, &self.registry), content)
    }

    /// Mark `content` as the source for the item's transition
    pub fn mark_as_source_for<I, C>(&self, item: &I, content: C) -> Observed<C>
    where
        I: Identifiable + ?Sized,
        C: Renderable,
    {
        self.mark_as_source(TransitionKey::from_identity(item), content)
    }

    /// Mark `content` as the destination for the item's transition
    pub fn mark_as_destination_for<I, C>(&self, item: &I, content: C) -> Observed<C>
    where
        I: Identifiable + ?Sized,
        C: Renderable,
    {
        self.mark_as_destination(TransitionKey::from_identity(item), content)
    }

    /// Drive the transition for `key` from a presented flag
    pub fn drive_transition<F>(
        &self,
        key: impl Into<TransitionKey>,
        trigger: &Binding<bool>,
        options: TransitionOptions,
        factory: F,
    ) -> TransitionController
    where
        F: Fn() -> OverlayContent + 'static,
    {
        let controller = TransitionController::new(
            key,
            &self.registry,
            self.scheduler.handle(),
            options,
            factory,
        );
        controller.bind(trigger);
        controller
    }

    /// Drive transitions from the selected item
    pub fn drive_identity_transition<T, F>(
        &self,
        selection: &Binding<Option<T>>,
        options: TransitionOptions,
        factory: F,
    ) -> IdentityController<T>
    where
        T: Identifiable + Clone + PartialEq + 'static,
        F: Fn(&T) -> OverlayContent + 'static,
    {
        let controller =
            IdentityController::new(&self.registry, self.scheduler.handle(), options, factory);
        controller.bind(selection);
        controller
    }

    /// Apply the anchors reported since the last pass
    pub fn end_layout_pass(&self) -> usize {
        self.registry.resolve_anchor_reports()
    }

    /// Draw the overlay proxies
    pub fn render(&self, canvas: &mut dyn Canvas) -> usize {
        if !self.mounted {
            return 0;
        }
        self.renderer.render(&self.registry, &self.scheduler, canvas)
    }

    /// Run one frame
    ///
    /// `draw_content` draws the host's views; observed views report their
    /// bounds while it runs.
    pub fn frame<F>(&self, dt_ms: f32, canvas: &mut dyn Canvas, draw_content: F) -> FrameStats
    where
        F: FnOnce(&mut dyn Canvas),
    {
        let animating = self.scheduler.advance(dt_ms);
        draw_content(&mut *canvas);
        let overlays_drawn = self.render(canvas);
        let anchors_written = self.end_layout_pass();
        FrameStats {
            animating,
            anchors_written,
            overlays_drawn,
        }
    }

    /// Number of proxies that would be drawn right now
    pub fn active_overlay_count(&self) -> usize {
        self.registry
            .records()
            .iter()
            .filter(|record| record.overlay_visible())
            .count()
    }

    /// The host should hide its status bar
    pub fn status_bar_hidden(&self) -> bool {
        self.config.hide_status_bar && self.mounted && self.active_overlay_count() > 0
    }
}

impl Default for TeleportContainer {
    fn default() -> Self {
        Self::new(TeleportConfig::default())
    }
}

impl fmt::Debug for TeleportContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeleportContainer")
            .field("scene_phase", &self.scene_phase)
            .field("mounted", &self.mounted)
            .field("registry", &self.registry)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// Wrap a view hierarchy in a container with standard settings
pub fn wrap_as_container(hide_status_bar: bool) -> TeleportContainer {
    TeleportContainer::new(TeleportConfig::standard().with_hide_status_bar(hide_status_bar))
}
