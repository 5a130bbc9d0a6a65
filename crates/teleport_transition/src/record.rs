//! Per-transition state
//!
//! One [`TransitionRecord`] exists per active [`TransitionKey`]. Records are
//! plain data; the registry owns them and the controller is the only
//! component that moves a record between phases.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use teleport_animation::{AnimationCurve, AnimationId, CompletionCriteria, TaskId};
use teleport_core::{CornerStyle, OverlayContent, Rect, Result, TeleportError, TransitionKey};

/// Where a transition is in its forward/reverse cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No leg running. A forward start may be pending behind its delay.
    #[default]
    Idle,
    /// Proxy moving from source geometry to destination geometry
    AnimatingForward,
    /// Forward leg done; the destination's real content is showing
    ForwardSettled,
    /// Proxy moving back from destination geometry to source geometry
    AnimatingReverse,
}

impl Phase {
    /// True once the forward leg has started and until reverse begins
    ///
    /// While this holds, the overlay targets destination geometry.
    pub fn targets_destination(&self) -> bool {
        matches!(self, Phase::AnimatingForward | Phase::ForwardSettled)
    }

    /// True while a leg is actually animating
    pub fn is_animating(&self) -> bool {
        matches!(self, Phase::AnimatingForward | Phase::AnimatingReverse)
    }
}

/// How the end of a leg is detected
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Scheduler callback once progress effectively reaches its target
    #[default]
    LogicallyComplete,
    /// Scheduler callback once the animation has fully come to rest
    Removed,
    /// Fixed timer of the curve's nominal duration
    ///
    /// Fallback for hosts that cannot observe animation completion. It can
    /// fire slightly early or late relative to the visual motion.
    Timer,
}

impl CompletionMode {
    /// Scheduler criteria, or None when completion is timer-driven
    pub fn criteria(&self) -> Option<CompletionCriteria> {
        match self {
            CompletionMode::LogicallyComplete => Some(CompletionCriteria::LogicallyComplete),
            CompletionMode::Removed => Some(CompletionCriteria::Removed),
            CompletionMode::Timer => None,
        }
    }
}

/// Animation configuration for one forward/reverse cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSpec {
    pub curve: AnimationCurve,
    /// Pause before the forward leg starts
    pub delay_ms: u32,
    pub completion: CompletionMode,
}

impl AnimationSpec {
    pub fn new(curve: AnimationCurve) -> Self {
        Self {
            curve,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_completion(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.curve.validate()
    }
}

/// Corner radius interpolation for the overlay clip
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerSpec {
    pub source_radius: f32,
    pub destination_radius: f32,
    #[serde(default)]
    pub style: CornerStyle,
}

impl CornerSpec {
    pub fn new(source_radius: f32, destination_radius: f32) -> Self {
        Self {
            source_radius,
            destination_radius,
            style: CornerStyle::default(),
        }
    }

    pub fn with_style(mut self, style: CornerStyle) -> Self {
        self.style = style;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for radius in [self.source_radius, self.destination_radius] {
            if !radius.is_finite() || radius < 0.0 {
                return Err(TeleportError::InvalidCornerRadius(radius));
            }
        }
        Ok(())
    }
}

/// Callback invoked once per direction: `true` for forward, `false` for reverse
#[derive(Clone)]
pub struct CompletionCallback(Rc<dyn Fn(bool)>);

impl CompletionCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(bool) + 'static,
    {
        Self(Rc::new(callback))
    }

    pub fn call(&self, forward: bool) {
        (self.0)(forward)
    }
}

impl PartialEq for CompletionCallback {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CompletionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompletionCallback")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// State of one transition
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionRecord {
    pub key: TransitionKey,
    /// Set when the controller opens a cycle; gates all anchor writes
    pub initialized: bool,
    pub phase: Phase,
    /// Source bounds in the shared coordinate space, captured once per cycle
    pub source_anchor: Option<Rect>,
    /// Destination bounds in the shared coordinate space, kept current
    pub destination_anchor: Option<Rect>,
    pub overlay_content: Option<OverlayContent>,
    /// True once the proxy has handed off to the destination's real content
    pub hide_destination: bool,
    pub animation_spec: AnimationSpec,
    pub corner_spec: Option<CornerSpec>,
    pub on_complete: Option<CompletionCallback>,
    pub(crate) cycle: u64,
    pub(crate) pending_start: Option<TaskId>,
    pub(crate) animation: Option<AnimationId>,
    pub(crate) forward_started_at: Option<f64>,
}

impl TransitionRecord {
    pub fn new(key: impl Into<TransitionKey>) -> Self {
        Self {
            key: key.into(),
            initialized: false,
            phase: Phase::Idle,
            source_anchor: None,
            destination_anchor: None,
            overlay_content: None,
            hide_destination: false,
            animation_spec: AnimationSpec::default(),
            corner_spec: None,
            on_complete: None,
            cycle: 0,
            pending_start: None,
            animation: None,
            forward_started_at: None,
        }
    }

    /// Generation of the current cycle, 0 when none is open
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// True while a forward start is waiting out its delay
    pub fn is_start_pending(&self) -> bool {
        self.pending_start.is_some()
    }

    pub fn animation(&self) -> Option<AnimationId> {
        self.animation
    }

    /// Scheduler time at which the forward leg started
    pub fn forward_started_at(&self) -> Option<f64> {
        self.forward_started_at
    }

    /// Both anchors known
    pub fn has_anchors(&self) -> bool {
        self.source_anchor.is_some() && self.destination_anchor.is_some()
    }

    /// The overlay proxy should be drawn for this record
    pub fn overlay_visible(&self) -> bool {
        self.has_anchors() && self.overlay_content.is_some() && !self.hide_destination
    }

    /// Reset to the freshly created state, keeping only the key
    pub(crate) fn reset(&mut self) {
        *self = TransitionRecord::new(self.key.clone());
    }
}
