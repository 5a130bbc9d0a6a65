//! Draw abstraction for overlay proxies and observed content
//!
//! The transition engine never talks to a GPU or a compositor directly. It
//! draws through the small [`Canvas`] trait, which a host backend implements
//! on top of its own pipeline. [`RecordingCanvas`] keeps the command stream
//! and is what tests and debugging tools use.

use std::fmt;
use std::rc::Rc;

use crate::geometry::{CornerStyle, Rect};

/// Straight-alpha RGBA color, components in 0.0..=1.0
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Color::rgba(r, g, b, 1.0)
    }

    /// `0xRRGGBB`, fully opaque
    pub fn from_hex(hex: u32) -> Self {
        let [_, r, g, b] = hex.to_be_bytes();
        let channel = |c: u8| f32::from(c) / 255.0;
        Color::rgb(channel(r), channel(g), channel(b))
    }

    /// Same color with alpha multiplied by `opacity`
    pub fn faded(self, opacity: f32) -> Self {
        Color {
            a: self.a * opacity.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Clip region applied to subsequent draw commands
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClipShape {
    Rect(Rect),
    /// Uniform corner radius drawn with `style`
    RoundedRect {
        rect: Rect,
        radius: f32,
        style: CornerStyle,
    },
}

impl ClipShape {
    /// Bounding rect of the clip
    pub fn bounds(&self) -> Rect {
        match *self {
            ClipShape::Rect(rect) | ClipShape::RoundedRect { rect, .. } => rect,
        }
    }

    /// Corner radius, zero for a plain rect
    pub fn radius(&self) -> f32 {
        match *self {
            ClipShape::Rect(_) => 0.0,
            ClipShape::RoundedRect { radius, .. } => radius,
        }
    }
}

/// One entry of a recorded command stream
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    BeginClip(ClipShape),
    EndClip,
    BeginLayer { opacity: f32 },
    EndLayer,
    /// `color` already carries the effective layer opacity
    Fill { rect: Rect, color: Color },
}

/// Drawing surface used by the overlay and by observed content
pub trait Canvas {
    fn push_clip(&mut self, shape: ClipShape);

    fn pop_clip(&mut self);

    /// Multiply the opacity of everything drawn until the matching pop
    fn push_opacity(&mut self, opacity: f32);

    fn pop_opacity(&mut self);

    /// Effective opacity after all pushed layers
    fn current_opacity(&self) -> f32;

    fn fill_rect(&mut self, rect: Rect, color: Color);
}

/// A canvas that keeps every command for later inspection or replay
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
    /// Effective opacity of each open layer, outermost first
    layers: Vec<f32>,
    open_clips: usize,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        RecordingCanvas::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Clips pushed and not yet popped
    pub fn clip_depth(&self) -> usize {
        self.open_clips
    }

    /// Every clip shape pushed so far, in order
    pub fn clips(&self) -> Vec<ClipShape> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::BeginClip(shape) => Some(*shape),
                _ => None,
            })
            .collect()
    }

    /// Every filled rect so far, in order
    pub fn filled_rects(&self) -> Vec<Rect> {
        self.fills().map(|(rect, _)| rect).collect()
    }

    /// Every fill with the color it was drawn at
    pub fn fills(&self) -> impl Iterator<Item = (Rect, Color)> + '_ {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Fill { rect, color } => Some((*rect, *color)),
            _ => None,
        })
    }

    pub fn reset(&mut self) {
        *self = RecordingCanvas::default();
    }
}

impl Canvas for RecordingCanvas {
    fn push_clip(&mut self, shape: ClipShape) {
        self.open_clips += 1;
        self.commands.push(DrawCommand::BeginClip(shape));
    }

    fn pop_clip(&mut self) {
        self.open_clips = self.open_clips.saturating_sub(1);
        self.commands.push(DrawCommand::EndClip);
    }

    fn push_opacity(&mut self, opacity: f32) {
        let effective = self.current_opacity() * opacity;
        self.layers.push(effective);
        self.commands.push(DrawCommand::BeginLayer { opacity });
    }

    fn pop_opacity(&mut self) {
        self.layers.pop();
        self.commands.push(DrawCommand::EndLayer);
    }

    fn current_opacity(&self) -> f32 {
        self.layers.last().copied().unwrap_or(1.0)
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let color = color.faded(self.current_opacity());
        self.commands.push(DrawCommand::Fill { rect, color });
    }
}

/// Content that can draw itself into a frame
///
/// Implemented for closures so hosts can hand over ad-hoc drawing code:
///
/// ```rust
/// use teleport_core::{Canvas, Color, Rect, Renderable};
///
/// let thumbnail = |canvas: &mut dyn Canvas, frame: Rect| {
///     canvas.fill_rect(frame, Color::from_hex(0x3366FF));
/// };
/// let _: &dyn Renderable = &thumbnail;
/// ```
pub trait Renderable {
    fn render(&self, canvas: &mut dyn Canvas, frame: Rect);
}

impl<F> Renderable for F
where
    F: Fn(&mut dyn Canvas, Rect),
{
    fn render(&self, canvas: &mut dyn Canvas, frame: Rect) {
        self(canvas, frame)
    }
}

/// A solid color fills the whole frame
impl Renderable for Color {
    fn render(&self, canvas: &mut dyn Canvas, frame: Rect) {
        canvas.fill_rect(frame, *self);
    }
}

/// Shared proxy content drawn by the overlay
///
/// Equality is pointer identity: two handles are equal only when they refer
/// to the same content instance.
#[derive(Clone)]
pub struct OverlayContent(Rc<dyn Renderable>);

impl OverlayContent {
    pub fn new(content: impl Renderable + 'static) -> Self {
        OverlayContent(Rc::new(content))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn render(&self, canvas: &mut dyn Canvas, frame: Rect) {
        self.0.render(canvas, frame);
    }
}

impl PartialEq for OverlayContent {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for OverlayContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ptr = Rc::as_ptr(&self.0).cast::<()>();
        write!(f, "OverlayContent({ptr:p})")
    }
}
