//! Overlay proxy rendering
//!
//! The overlay is drawn above both subtrees. For every record whose proxy
//! should be visible it interpolates a frame between the source and
//! destination anchors and draws the record's overlay content into it,
//! clipped to a rounded rectangle when the transition has a corner spec.
//!
//! Records are drawn in registry insertion order, so transitions opened
//! later paint on top.

use teleport_animation::{AnimationScheduler, Interpolate};
use teleport_core::{Canvas, ClipShape, CornerStyle, OverlayContent, Point, Rect, TransitionKey};

use crate::record::{Phase, TransitionRecord};
use crate::registry::Registry;

/// Maps anchors from the shared coordinate space into the overlay's space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateSpace {
    /// Overlay origin expressed in shared coordinates
    pub origin: Point,
    pub scale: f32,
}

impl Default for CoordinateSpace {
    fn default() -> Self {
        Self {
            origin: Point::new(0.0, 0.0),
            scale: 1.0,
        }
    }
}

impl CoordinateSpace {
    pub fn new(origin: Point, scale: f32) -> Self {
        Self { origin, scale }
    }

    pub fn resolve(&self, rect: Rect) -> Rect {
        rect.offset(-self.origin.x, -self.origin.y).scale(self.scale)
    }

    fn resolve_radius(&self, radius: f32) -> f32 {
        radius * self.scale
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayCorner {
    pub radius: f32,
    pub style: CornerStyle,
}

/// Geometry of the proxy at one instant
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayFrame {
    pub rect: Rect,
    /// `None` when the transition has no corner spec
    pub corner: Option<OverlayCorner>,
}

impl OverlayFrame {
    /// Clip shape for this frame, if it is clipped at all
    pub fn clip(&self) -> Option<ClipShape> {
        self.corner.map(|corner| ClipShape::RoundedRect {
            rect: self.rect,
            radius: corner.radius,
            style: corner.style,
        })
    }

    pub fn radius(&self) -> Option<f32> {
        self.corner.map(|corner| corner.radius)
    }
}

impl Interpolate for OverlayFrame {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let corner = match (self.corner, other.corner) {
            (Some(from), Some(to)) => Some(OverlayCorner {
                // Overshooting springs must not produce a negative radius
                radius: from.radius.lerp(&to.radius, t).max(0.0),
                style: to.style,
            }),
            (_, to) => to,
        };
        OverlayFrame {
            rect: self.rect.lerp(&other.rect, t),
            corner,
        }
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        let corners = match (self.corner, other.corner) {
            (Some(a), Some(b)) => a.style == b.style && a.radius.approx_eq(&b.radius, epsilon),
            (None, None) => true,
            _ => false,
        };
        corners && self.rect.approx_eq(&other.rect, epsilon)
    }
}

/// One proxy ready to draw
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedOverlay {
    pub key: TransitionKey,
    pub phase: Phase,
    /// Where the proxy is heading
    pub target: OverlayFrame,
    /// Where the proxy is drawn this frame
    pub presented: OverlayFrame,
    /// Progress from source (0) to destination (1)
    pub progress: f32,
    pub content: OverlayContent,
}

/// Resolves and draws overlay proxies
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayRenderer {
    space: CoordinateSpace,
}

impl OverlayRenderer {
    pub fn new(space: CoordinateSpace) -> Self {
        Self { space }
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    pub fn set_space(&mut self, space: CoordinateSpace) {
        self.space = space;
    }

    fn endpoints(&self, record: &TransitionRecord) -> Option<(OverlayFrame, OverlayFrame)> {
        let source = self.space.resolve(record.source_anchor?);
        let destination = self.space.resolve(record.destination_anchor?);
        let corners = record.corner_spec.map(|spec| {
            (
                OverlayCorner {
                    radius: self.space.resolve_radius(spec.source_radius),
                    style: spec.style,
                },
                OverlayCorner {
                    radius: self.space.resolve_radius(spec.destination_radius),
                    style: spec.style,
                },
            )
        });
        Some((
            OverlayFrame {
                rect: source,
                corner: corners.map(|(from, _)| from),
            },
            OverlayFrame {
                rect: destination,
                corner: corners.map(|(_, to)| to),
            },
        ))
    }

    /// Frame the proxy is heading toward, in overlay space
    ///
    /// Destination geometry while the forward leg runs or has settled,
    /// source geometry otherwise. None until both anchors are known.
    pub fn target_frame(&self, record: &TransitionRecord) -> Option<OverlayFrame> {
        let (source, destination) = self.endpoints(record)?;
        Some(if record.phase.targets_destination() {
            destination
        } else {
            source
        })
    }

    /// Resolve every visible proxy in registry order
    pub fn resolve(&self, registry: &Registry, scheduler: &AnimationScheduler) -> Vec<ResolvedOverlay> {
        registry
            .records()
            .into_iter()
            .filter(TransitionRecord::overlay_visible)
            .filter_map(|record| {
                let (source, destination) = self.endpoints(&record)?;
                let content = record.overlay_content.clone()?;
                let target = if record.phase.targets_destination() {
                    destination
                } else {
                    source
                };
                let at_rest = if record.phase.targets_destination() {
                    1.0
                } else {
                    0.0
                };
                let progress = record
                    .animation
                    .and_then(|id| scheduler.progress(id))
                    .unwrap_or(at_rest);
                Some(ResolvedOverlay {
                    key: record.key.clone(),
                    phase: record.phase,
                    target,
                    presented: source.lerp(&destination, progress),
                    progress,
                    content,
                })
            })
            .collect()
    }

    /// Draw every visible proxy, returning how many were drawn
    pub fn render(
        &self,
        registry: &Registry,
        scheduler: &AnimationScheduler,
        canvas: &mut dyn Canvas,
    ) -> usize {
        let overlays = self.resolve(registry, scheduler);
        for overlay in &overlays {
            let clip = overlay.presented.clip();
            if let Some(shape) = clip {
                canvas.push_clip(shape);
            }
            overlay.content.render(canvas, overlay.presented.rect);
            if clip.is_some() {
                canvas.pop_clip();
            }
        }
        if !overlays.is_empty() {
            tracing::trace!("OverlayRenderer: drew {} proxies", overlays.len());
        }
        overlays.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CornerSpec;
    use teleport_core::{Color, RecordingCanvas};

    fn visible_record(registry: &Registry, key: &str, phase: Phase) {
        registry.upsert(key);
        registry.mutate(key, |r| {
            r.initialized = true;
            r.phase = phase;
            r.overlay_content = Some(OverlayContent::new(Color::RED));
            r.source_anchor = Some(Rect::new(0.0, 0.0, 100.0, 100.0));
            r.destination_anchor = Some(Rect::new(0.0, 200.0, 400.0, 300.0));
        });
    }

    #[test]
    fn test_coordinate_space() {
        let space = CoordinateSpace::new(Point::new(10.0, 20.0), 2.0);
        assert_eq!(
            space.resolve(Rect::new(10.0, 20.0, 5.0, 5.0)),
            Rect::new(0.0, 0.0, 10.0, 10.0)
        );
    }

    #[test]
    fn test_target_follows_phase() {
        let renderer = OverlayRenderer::default();
        let mut record = TransitionRecord::new("a");
        record.source_anchor = Some(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(renderer.target_frame(&record).is_none());

        record.destination_anchor = Some(Rect::new(0.0, 200.0, 400.0, 300.0));
        assert_eq!(
            renderer.target_frame(&record).unwrap().rect,
            Rect::new(0.0, 0.0, 100.0, 100.0)
        );
        record.phase = Phase::AnimatingForward;
        assert_eq!(
            renderer.target_frame(&record).unwrap().rect,
            Rect::new(0.0, 200.0, 400.0, 300.0)
        );
        record.phase = Phase::AnimatingReverse;
        assert_eq!(
            renderer.target_frame(&record).unwrap().rect,
            Rect::new(0.0, 0.0, 100.0, 100.0)
        );
    }

    #[test]
    fn test_corner_radius_target() {
        let renderer = OverlayRenderer::default();
        let mut record = TransitionRecord::new("a");
        record.source_anchor = Some(Rect::new(0.0, 0.0, 100.0, 100.0));
        record.destination_anchor = Some(Rect::new(0.0, 200.0, 400.0, 300.0));
        assert_eq!(renderer.target_frame(&record).unwrap().radius(), None);

        record.corner_spec = Some(CornerSpec::new(4.0, 32.0));
        assert_eq!(renderer.target_frame(&record).unwrap().radius(), Some(4.0));
        record.phase = Phase::AnimatingForward;
        assert_eq!(renderer.target_frame(&record).unwrap().radius(), Some(32.0));
    }

    #[test]
    fn test_resolve_without_animation_rests_on_target() {
        let registry = Registry::new();
        let scheduler = AnimationScheduler::new();
        visible_record(&registry, "a", Phase::AnimatingForward);
        visible_record(&registry, "b", Phase::AnimatingReverse);

        let overlays = OverlayRenderer::default().resolve(&registry, &scheduler);
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].key.as_str(), "a");
        assert_eq!(overlays[0].presented.rect, Rect::new(0.0, 200.0, 400.0, 300.0));
        assert_eq!(overlays[1].presented.rect, Rect::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_hidden_records_not_drawn() {
        let registry = Registry::new();
        let scheduler = AnimationScheduler::new();
        visible_record(&registry, "a", Phase::ForwardSettled);
        registry.mutate("a", |r| r.hide_destination = true);
        registry.upsert("b");

        let mut canvas = RecordingCanvas::new();
        assert_eq!(
            OverlayRenderer::default().render(&registry, &scheduler, &mut canvas),
            0
        );
        assert!(canvas.commands().is_empty());
    }

    #[test]
    fn test_render_clips_only_with_corner_spec() {
        let registry = Registry::new();
        let scheduler = AnimationScheduler::new();
        visible_record(&registry, "a", Phase::Idle);
        let renderer = OverlayRenderer::default();

        let mut canvas = RecordingCanvas::new();
        renderer.render(&registry, &scheduler, &mut canvas);
        assert!(canvas.clips().is_empty());
        assert_eq!(canvas.filled_rects(), vec![Rect::new(0.0, 0.0, 100.0, 100.0)]);

        registry.mutate("a", |r| r.corner_spec = Some(CornerSpec::new(4.0, 32.0)));
        let mut canvas = RecordingCanvas::new();
        renderer.render(&registry, &scheduler, &mut canvas);
        assert_eq!(
            canvas.clips(),
            vec![ClipShape::RoundedRect {
                rect: Rect::new(0.0, 0.0, 100.0, 100.0),
                radius: 4.0,
                style: CornerStyle::Circular,
            }]
        );
        assert_eq!(canvas.clip_depth(), 0);
    }

    #[test]
    fn test_frame_lerp_clamps_radius() {
        let from = OverlayFrame {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            corner: Some(OverlayCorner {
                radius: 4.0,
                style: CornerStyle::Continuous,
            }),
        };
        let to = OverlayFrame {
            rect: Rect::new(0.0, 0.0, 20.0, 20.0),
            corner: Some(OverlayCorner {
                radius: 32.0,
                style: CornerStyle::Continuous,
            }),
        };
        assert_eq!(to.lerp(&from, 1.5).radius(), Some(0.0));
        assert!(from.lerp(&to, 0.5).approx_eq(
            &OverlayFrame {
                rect: Rect::new(0.0, 0.0, 15.0, 15.0),
                corner: Some(OverlayCorner {
                    radius: 18.0,
                    style: CornerStyle::Continuous,
                }),
            },
            1e-4
        ));
    }
}
