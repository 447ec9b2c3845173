//! Ink layer: the user's strokes.
//!
//! Strokes are kept as a log of logical points alongside the raster so the
//! layer can be rebuilt at a new size without losing ink.

use kanji_core::{LogicalPoint, SurfaceMetrics};
use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::error::{RenderError, RenderResult};

/// Pen appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkStyle {
    /// RGBA colour.
    pub color: [u8; 4],
    /// Line width in logical pixels.
    pub width: f32,
}

impl Default for InkStyle {
    fn default() -> Self {
        Self {
            color: [0x1e, 0x29, 0x3b, 0xff],
            width: 6.0,
        }
    }
}

/// One pen-down to pen-up path in logical coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InkStroke {
    /// Sampled points in order. Never empty once logged.
    pub points: Vec<LogicalPoint>,
}

/// Transparent raster of user ink plus the stroke log that produced it.
pub struct InkLayer {
    pixmap: Pixmap,
    metrics: SurfaceMetrics,
    style: InkStyle,
    strokes: Vec<InkStroke>,
}

impl InkLayer {
    /// Allocate an empty layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixmap cannot be allocated.
    pub fn new(metrics: SurfaceMetrics, style: InkStyle) -> RenderResult<Self> {
        Ok(Self {
            pixmap: allocate(metrics)?,
            metrics,
            style,
            strokes: Vec::new(),
        })
    }

    /// Start a new stroke with a round dot at `point`.
    pub fn begin(&mut self, point: LogicalPoint) {
        self.strokes.push(InkStroke {
            points: vec![point],
        });
        self.draw_dot(point);
    }

    /// Extend the current stroke to `point`.
    ///
    /// Does nothing if no stroke was begun.
    pub fn extend(&mut self, point: LogicalPoint) {
        let Some(from) = self
            .strokes
            .last()
            .and_then(|s| s.points.last())
            .copied()
        else {
            return;
        };
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.points.push(point);
        }
        self.draw_segment(from, point);
    }

    /// Erase all ink and forget the stroke log.
    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        self.strokes.clear();
    }

    /// Reallocate at new metrics and replay the stroke log.
    ///
    /// # Errors
    ///
    /// Returns an error if the new pixmap cannot be allocated; the old
    /// buffer is kept in that case.
    pub fn resize(&mut self, metrics: SurfaceMetrics) -> RenderResult<()> {
        self.pixmap = allocate(metrics)?;
        self.metrics = metrics;
        self.replay();
        Ok(())
    }

    /// True if nothing has been drawn since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Logged strokes.
    #[must_use]
    pub fn strokes(&self) -> &[InkStroke] {
        &self.strokes
    }

    /// The rasterized ink.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Pen appearance.
    #[must_use]
    pub fn style(&self) -> InkStyle {
        self.style
    }

    fn replay(&mut self) {
        let strokes = std::mem::take(&mut self.strokes);
        for stroke in &strokes {
            let mut points = stroke.points.iter().copied();
            let Some(first) = points.next() else {
                continue;
            };
            self.draw_dot(first);
            let mut last = first;
            for point in points {
                self.draw_segment(last, point);
                last = point;
            }
        }
        self.strokes = strokes;
    }

    fn transform(&self) -> Transform {
        let dpr = self.metrics.device_pixel_ratio;
        Transform::from_scale(dpr, dpr)
    }

    fn paint(&self) -> Paint<'static> {
        let [r, g, b, a] = self.style.color;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        paint
    }

    fn draw_dot(&mut self, at: LogicalPoint) {
        let Some(path) = PathBuilder::from_circle(at.x, at.y, self.style.width / 2.0) else {
            return;
        };
        let paint = self.paint();
        let transform = self.transform();
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, transform, None);
    }

    fn draw_segment(&mut self, from: LogicalPoint, to: LogicalPoint) {
        if from == to {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(from.x, from.y);
        pb.line_to(to.x, to.y);
        let Some(path) = pb.finish() else {
            return;
        };

        let stroke = Stroke {
            width: self.style.width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        let paint = self.paint();
        let transform = self.transform();
        self.pixmap
            .stroke_path(&path, &paint, &stroke, transform, None);
    }
}

impl std::fmt::Debug for InkLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InkLayer")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("strokes", &self.strokes.len())
            .finish_non_exhaustive()
    }
}

/// Allocate a transparent pixmap at the metrics' physical size.
pub(crate) fn allocate(metrics: SurfaceMetrics) -> RenderResult<Pixmap> {
    let (width, height) = metrics.physical_size();
    Pixmap::new(width, height)
        .ok_or_else(|| RenderError::Surface(format!("Failed to allocate {width}x{height} pixmap")))
}

#[cfg(test)]
mod tests {
    use kanji_core::LogicalSize;

    use super::*;

    fn alpha_at(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap.pixel(x, y).map_or(0, |p| p.alpha())
    }

    #[test]
    fn test_dot_on_begin() {
        let metrics = SurfaceMetrics::new(LogicalSize::square(50.0), 1.0);
        let mut ink = InkLayer::new(metrics, InkStyle::default()).expect("layer");
        assert!(ink.is_empty());

        ink.begin(LogicalPoint::new(25.0, 25.0));
        assert!(!ink.is_empty());
        assert_eq!(alpha_at(ink.pixmap(), 25, 25), 255);
        assert_eq!(alpha_at(ink.pixmap(), 5, 5), 0);
    }

    #[test]
    fn test_extend_without_begin_is_noop() {
        let metrics = SurfaceMetrics::new(LogicalSize::square(50.0), 1.0);
        let mut ink = InkLayer::new(metrics, InkStyle::default()).expect("layer");
        ink.extend(LogicalPoint::new(10.0, 10.0));
        assert!(ink.is_empty());
        assert_eq!(alpha_at(ink.pixmap(), 10, 10), 0);
    }

    #[test]
    fn test_segment_scales_with_dpr() {
        let metrics = SurfaceMetrics::new(LogicalSize::square(50.0), 2.0);
        let mut ink = InkLayer::new(metrics, InkStyle::default()).expect("layer");
        ink.begin(LogicalPoint::new(10.0, 25.0));
        ink.extend(LogicalPoint::new(40.0, 25.0));

        assert_eq!((ink.pixmap().width(), ink.pixmap().height()), (100, 100));
        // Logical (25, 25) is physical (50, 50).
        assert_eq!(alpha_at(ink.pixmap(), 50, 50), 255);
        assert_eq!(alpha_at(ink.pixmap(), 50, 20), 0);
    }

    #[test]
    fn test_resize_replays_log() {
        let metrics = SurfaceMetrics::new(LogicalSize::square(50.0), 1.0);
        let mut ink = InkLayer::new(metrics, InkStyle::default()).expect("layer");
        ink.begin(LogicalPoint::new(10.0, 10.0));
        ink.extend(LogicalPoint::new(30.0, 10.0));

        ink.resize(SurfaceMetrics::new(LogicalSize::square(50.0), 3.0))
            .expect("resize");
        assert_eq!(ink.pixmap().width(), 150);
        assert_eq!(alpha_at(ink.pixmap(), 60, 30), 255);
        assert_eq!(ink.strokes().len(), 1);
        assert_eq!(ink.strokes()[0].points.len(), 2);
    }

    #[test]
    fn test_clear_erases_everything() {
        let metrics = SurfaceMetrics::new(LogicalSize::square(50.0), 1.0);
        let mut ink = InkLayer::new(metrics, InkStyle::default()).expect("layer");
        ink.begin(LogicalPoint::new(25.0, 25.0));
        ink.clear();
        assert!(ink.is_empty());
        assert!(ink.pixmap().pixels().iter().all(|p| p.alpha() == 0));
    }
}
