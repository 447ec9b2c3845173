//! The drawing surface.
//!
//! Owns both layers, the surface metrics, the element's on-screen rectangle
//! and the transient pointer state. All drawing happens in logical
//! coordinates; the layers scale by the device pixel ratio internally.

use kanji_core::{
    ElementRect, InputEvent, LogicalPoint, LogicalSize, PointerKind, PointerPhase,
    StrokeGeometry, SurfaceMetrics,
};
use serde::Serialize;
use tiny_skia::{Pixmap, PixmapPaint, Transform};

use crate::error::RenderResult;
use crate::export::{self, ExportedImage, ImageFormat};
use crate::guide::{GuideMode, GuideRenderer};
use crate::ink::{allocate, InkLayer, InkStyle};

/// Notifications emitted by the surface for its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceSignal {
    /// Pen down.
    StrokeStarted,
    /// Pen up.
    StrokeEnded,
    /// Ink content changed (emitted after each completed stroke).
    DrawingChanged,
}

/// Result of feeding an input event to the surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputResponse {
    /// Whether the host should suppress the platform's default handling
    /// (scrolling, gestures). Never set for mouse input.
    pub prevent_default: bool,
    /// Signals produced by the event, in order.
    pub signals: Vec<SurfaceSignal>,
}

/// Guide layer state.
struct GuideLayer {
    pixmap: Pixmap,
    character: Option<char>,
    geometry: Option<StrokeGeometry>,
    mode: Option<GuideMode>,
}

/// Dual-layer drawing surface.
pub struct DrawingSurface {
    metrics: SurfaceMetrics,
    element_rect: ElementRect,
    renderer: GuideRenderer,
    guide: GuideLayer,
    ink: InkLayer,
    pointer: Option<LogicalPoint>,
}

impl DrawingSurface {
    /// Create a surface with system fonts for the guide.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing buffers cannot be allocated.
    pub fn new(metrics: SurfaceMetrics) -> RenderResult<Self> {
        Self::with_renderer(metrics, GuideRenderer::new(), InkStyle::default())
    }

    /// Create a surface with an explicit guide renderer and pen style.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing buffers cannot be allocated.
    pub fn with_renderer(
        metrics: SurfaceMetrics,
        renderer: GuideRenderer,
        style: InkStyle,
    ) -> RenderResult<Self> {
        let ink = InkLayer::new(metrics, style)?;
        let mut surface = Self {
            metrics,
            element_rect: ElementRect::at_origin(metrics.size),
            renderer,
            guide: GuideLayer {
                pixmap: allocate(metrics)?,
                character: None,
                geometry: None,
                mode: None,
            },
            ink,
            pointer: None,
        };
        surface.redraw_guide();
        Ok(surface)
    }

    /// Current metrics.
    #[must_use]
    pub fn metrics(&self) -> SurfaceMetrics {
        self.metrics
    }

    /// Rendered rectangle used for viewport mapping.
    #[must_use]
    pub fn element_rect(&self) -> ElementRect {
        self.element_rect
    }

    /// Update the element's rendered rectangle (scroll, layout, CSS scale).
    pub fn set_element_rect(&mut self, rect: ElementRect) {
        self.element_rect = rect;
    }

    /// Resize to a new container size and pixel ratio.
    ///
    /// Zero-sized containers are ignored. The element rectangle keeps its
    /// origin and its ratio to the logical size. A resize that keeps the physical
    /// size and ratio only updates the metrics. Otherwise both layers are
    /// reallocated, the guide is redrawn, and ink is replayed from the stroke
    /// log. Returns whether the buffers were reallocated.
    ///
    /// # Errors
    ///
    /// Returns an error if the new buffers cannot be allocated; the surface
    /// keeps its previous buffers in that case.
    pub fn resize(&mut self, size: LogicalSize, device_pixel_ratio: f32) -> RenderResult<bool> {
        if size.is_empty() {
            tracing::debug!(?size, "Ignoring resize to empty container");
            return Ok(false);
        }

        let next = SurfaceMetrics::new(size, device_pixel_ratio);
        let unchanged = next.physical_size() == self.metrics.physical_size()
            && (next.device_pixel_ratio - self.metrics.device_pixel_ratio).abs() < f32::EPSILON;

        // Keep any CSS scaling between the element and its logical size.
        let (scale_x, scale_y) = if self.metrics.size.is_empty() {
            (1.0, 1.0)
        } else {
            (
                self.element_rect.width / self.metrics.size.width,
                self.element_rect.height / self.metrics.size.height,
            )
        };
        self.element_rect = ElementRect::new(
            self.element_rect.left,
            self.element_rect.top,
            size.width * scale_x,
            size.height * scale_y,
        );
        if unchanged {
            self.metrics = next;
            return Ok(false);
        }

        let guide = allocate(next)?;
        self.ink.resize(next)?;
        self.guide.pixmap = guide;
        self.metrics = next;
        self.redraw_guide();

        let (w, h) = next.physical_size();
        tracing::debug!(width = w, height = h, dpr = next.device_pixel_ratio, "Surface resized");
        Ok(true)
    }

    /// Show `character` on the guide layer, with stroke overlay if geometry
    /// is given, otherwise as a fallback glyph. Returns the mode actually
    /// drawn, which steps down when a richer guide fails to render.
    pub fn render_guide(&mut self, character: char, geometry: Option<StrokeGeometry>) -> GuideMode {
        self.guide.character = Some(character);
        self.guide.geometry = geometry;
        self.redraw_guide();
        self.guide.mode.unwrap_or(GuideMode::GridOnly)
    }

    /// Remove the reference character, leaving the grid only.
    pub fn clear_guide(&mut self) {
        self.guide.character = None;
        self.guide.geometry = None;
        self.redraw_guide();
    }

    /// Mode currently drawn, `None` when no character is shown.
    #[must_use]
    pub fn guide_mode(&self) -> Option<GuideMode> {
        self.guide.mode
    }

    /// Character currently on the guide layer.
    #[must_use]
    pub fn guide_character(&self) -> Option<char> {
        self.guide.character
    }

    /// Map a viewport position into logical coordinates.
    #[must_use]
    pub fn to_logical(&self, client_x: f32, client_y: f32) -> LogicalPoint {
        self.element_rect
            .to_logical(client_x, client_y, self.metrics.size)
    }

    /// Feed a pointer or touch event.
    pub fn handle_input(&mut self, event: &InputEvent) -> InputResponse {
        let suppressible = event.kind() != PointerKind::Mouse;
        let was_drawing = self.is_drawing();
        let mut response = InputResponse::default();

        // Two or more fingers are a platform gesture, never ink.
        if event.is_multi_touch() {
            if self.end_stroke() {
                response
                    .signals
                    .extend([SurfaceSignal::StrokeEnded, SurfaceSignal::DrawingChanged]);
            }
            return response;
        }

        match event.phase() {
            PointerPhase::Down => {
                if let Some((x, y)) = event.client_position() {
                    let point = self.to_logical(x, y);
                    response.signals.push(self.begin_stroke(point));
                }
                response.prevent_default = suppressible;
            }
            PointerPhase::Move => {
                if let Some((x, y)) = event.client_position() {
                    let point = self.to_logical(x, y);
                    self.continue_stroke(point);
                }
                response.prevent_default = suppressible && was_drawing;
            }
            PointerPhase::Up | PointerPhase::Leave | PointerPhase::Cancel => {
                if self.end_stroke() {
                    response
                        .signals
                        .extend([SurfaceSignal::StrokeEnded, SurfaceSignal::DrawingChanged]);
                }
                response.prevent_default = suppressible && was_drawing;
            }
        }

        response
    }

    /// Pen down at a logical point. Draws a dot.
    ///
    /// A pen-down while already drawing starts a fresh stroke.
    pub fn begin_stroke(&mut self, point: LogicalPoint) -> SurfaceSignal {
        self.ink.begin(point);
        self.pointer = Some(point);
        SurfaceSignal::StrokeStarted
    }

    /// Extend the active stroke. Returns `false` if no stroke is active.
    pub fn continue_stroke(&mut self, point: LogicalPoint) -> bool {
        if self.pointer.is_none() {
            return false;
        }
        self.ink.extend(point);
        self.pointer = Some(point);
        true
    }

    /// Pen up. Returns `false` if no stroke was active.
    pub fn end_stroke(&mut self) -> bool {
        self.pointer.take().is_some()
    }

    /// Whether a stroke is in progress.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.pointer.is_some()
    }

    /// Erase all ink. The guide is untouched.
    pub fn clear(&mut self) {
        self.ink.clear();
        self.pointer = None;
    }

    /// True iff no ink has been drawn since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ink.is_empty()
    }

    /// Encode the ink over opaque white at backing-buffer size.
    ///
    /// Callers check [`DrawingSurface::is_empty`] first; exporting an empty
    /// surface yields a blank white image.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn export_image(&self, format: ImageFormat) -> RenderResult<ExportedImage> {
        export::encode(self.ink.pixmap(), format)
    }

    /// Guide and ink flattened into one pixmap over white.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixmap cannot be allocated.
    pub fn composite(&self) -> RenderResult<Pixmap> {
        let mut out = allocate(self.metrics)?;
        out.fill(tiny_skia::Color::WHITE);
        let paint = PixmapPaint::default();
        out.draw_pixmap(0, 0, self.guide.pixmap.as_ref(), &paint, Transform::identity(), None);
        out.draw_pixmap(0, 0, self.ink.pixmap().as_ref(), &paint, Transform::identity(), None);
        Ok(out)
    }

    /// Guide and ink flattened and encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if compositing or encoding fails.
    pub fn export_composite(&self, format: ImageFormat) -> RenderResult<ExportedImage> {
        export::encode(&self.composite()?, format)
    }

    /// Guide layer raster.
    #[must_use]
    pub fn guide_pixmap(&self) -> &Pixmap {
        &self.guide.pixmap
    }

    /// Ink layer.
    #[must_use]
    pub fn ink(&self) -> &InkLayer {
        &self.ink
    }

    fn redraw_guide(&mut self) {
        let character = self.guide.character;
        let geometry = self.guide.geometry.as_ref();
        match self.renderer.render(self.metrics, character, geometry) {
            Ok((pixmap, mode)) => {
                self.guide.pixmap = pixmap;
                self.guide.mode = mode;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Guide rendering failed, leaving the layer blank");
                self.guide.pixmap.fill(tiny_skia::Color::TRANSPARENT);
                self.guide.mode = character.map(|_| GuideMode::GridOnly);
            }
        }
    }
}

impl std::fmt::Debug for DrawingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingSurface")
            .field("metrics", &self.metrics)
            .field("element_rect", &self.element_rect)
            .field("guide_character", &self.guide.character)
            .field("guide_mode", &self.guide.mode)
            .field("ink", &self.ink)
            .field("drawing", &self.is_drawing())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use kanji_core::{StrokePath, TouchEvent, TouchPhase, TouchPoint};

    use super::*;

    fn surface() -> DrawingSurface {
        let metrics = SurfaceMetrics::new(LogicalSize::square(100.0), 1.0);
        DrawingSurface::with_renderer(
            metrics,
            GuideRenderer::with_fontdb(usvg::fontdb::Database::new()),
            InkStyle::default(),
        )
        .expect("surface")
    }

    #[test]
    fn test_mouse_never_prevents_default() {
        let mut s = surface();
        let down = s.handle_input(&InputEvent::mouse(PointerPhase::Down, 10.0, 10.0));
        let moved = s.handle_input(&InputEvent::mouse(PointerPhase::Move, 20.0, 20.0));
        let up = s.handle_input(&InputEvent::mouse(PointerPhase::Up, 20.0, 20.0));
        assert!(!down.prevent_default && !moved.prevent_default && !up.prevent_default);
        assert_eq!(down.signals, vec![SurfaceSignal::StrokeStarted]);
        assert_eq!(
            up.signals,
            vec![SurfaceSignal::StrokeEnded, SurfaceSignal::DrawingChanged]
        );
    }

    #[test]
    fn test_touch_prevents_default_while_drawing() {
        let mut s = surface();
        assert!(
            !s.handle_input(&InputEvent::touch(TouchPhase::Move, 5.0, 5.0))
                .prevent_default,
            "hover-free move before a stroke"
        );
        assert!(s.handle_input(&InputEvent::touch(TouchPhase::Start, 10.0, 10.0)).prevent_default);
        assert!(s.handle_input(&InputEvent::touch(TouchPhase::Move, 30.0, 30.0)).prevent_default);
        assert!(s.handle_input(&InputEvent::touch(TouchPhase::End, 0.0, 0.0)).prevent_default);
        assert!(!s.is_drawing());
    }

    #[test]
    fn test_second_finger_ends_stroke_and_yields_gesture() {
        let mut s = surface();
        let two = |phase| {
            InputEvent::Touch(TouchEvent::new(
                phase,
                vec![TouchPoint::at(0, 10.0, 10.0), TouchPoint::at(1, 60.0, 60.0)],
            ))
        };

        let pinch = s.handle_input(&two(TouchPhase::Start));
        assert!(!pinch.prevent_default && pinch.signals.is_empty());
        assert!(s.is_empty());

        s.handle_input(&InputEvent::touch(TouchPhase::Start, 10.0, 10.0));
        s.handle_input(&InputEvent::touch(TouchPhase::Move, 30.0, 30.0));
        let second = s.handle_input(&two(TouchPhase::Move));
        assert!(!second.prevent_default);
        assert_eq!(
            second.signals,
            vec![SurfaceSignal::StrokeEnded, SurfaceSignal::DrawingChanged]
        );
        assert!(!s.is_drawing());
        assert!(!s.is_empty());
    }

    #[test]
    fn test_mouse_leave_ends_stroke() {
        let mut s = surface();
        s.handle_input(&InputEvent::mouse(PointerPhase::Down, 10.0, 10.0));
        let leave = s.handle_input(&InputEvent::mouse(PointerPhase::Leave, 100.0, 50.0));
        assert!(leave.signals.contains(&SurfaceSignal::StrokeEnded));
        assert!(!s.continue_stroke(LogicalPoint::new(50.0, 50.0)));
    }

    #[test]
    fn test_move_and_end_without_begin_are_noops() {
        let mut s = surface();
        assert!(!s.continue_stroke(LogicalPoint::new(10.0, 10.0)));
        assert!(!s.end_stroke());
        assert!(s.is_empty());
    }

    #[test]
    fn test_guide_modes_are_exclusive() {
        let mut s = surface();
        assert_eq!(s.guide_mode(), None);
        assert_eq!(s.render_guide('山', None), GuideMode::Fallback);

        let geometry = StrokeGeometry::new(vec![StrokePath::new("M10,10 L90,90")]);
        assert_eq!(
            s.render_guide('山', Some(geometry)),
            GuideMode::Strokes { count: 1 }
        );
        assert_eq!(s.guide_character(), Some('山'));

        s.clear_guide();
        assert_eq!(s.guide_mode(), None);
    }

    #[test]
    fn test_clear_keeps_guide() {
        let mut s = surface();
        s.render_guide('一', None);
        s.begin_stroke(LogicalPoint::new(50.0, 50.0));
        s.end_stroke();
        assert!(!s.is_empty());

        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.guide_mode(), Some(GuideMode::Fallback));
    }

    #[test]
    fn test_resize_ignores_empty_and_coalesces() {
        let mut s = surface();
        assert!(!s.resize(LogicalSize::new(0.0, 100.0), 1.0).expect("resize"));
        assert!(!s.resize(LogicalSize::square(100.0), 1.0).expect("resize"));
        assert!(s.resize(LogicalSize::square(100.0), 2.0).expect("resize"));
        assert_eq!(s.guide_pixmap().width(), 200);
        assert_eq!(s.ink().pixmap().width(), 200);
    }

    #[test]
    fn test_resize_keeps_css_scale() {
        let mut s = surface();
        s.set_element_rect(ElementRect::new(10.0, 20.0, 200.0, 50.0));
        s.resize(LogicalSize::square(150.0), 1.0).expect("resize");

        assert_eq!(s.element_rect(), ElementRect::new(10.0, 20.0, 300.0, 75.0));
        let p = s.to_logical(10.0 + 150.0, 20.0 + 75.0);
        assert!((p.x - 75.0).abs() < 1e-3 && (p.y - 150.0).abs() < 1e-3, "{p:?}");
    }

    #[test]
    fn test_resize_preserves_ink_and_guide() {
        let mut s = surface();
        s.render_guide('山', None);
        s.begin_stroke(LogicalPoint::new(20.0, 50.0));
        s.continue_stroke(LogicalPoint::new(80.0, 50.0));
        s.end_stroke();

        s.resize(LogicalSize::square(200.0), 1.5).expect("resize");
        assert!(!s.is_empty());
        assert_eq!(s.guide_mode(), Some(GuideMode::Fallback));
        let alpha = s.ink().pixmap().pixel(75, 75).map_or(0, |p| p.alpha());
        assert_eq!(alpha, 255);
    }

    #[test]
    fn test_composite_is_opaque() {
        let mut s = surface();
        s.render_guide('一', None);
        let pixmap = s.composite().expect("composite");
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 255));
    }
}
