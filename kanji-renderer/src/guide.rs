//! Guide layer rendering.
//!
//! The guide is built as an SVG document in logical units (the root `viewBox`)
//! at physical pixel size, then rasterized with usvg/resvg. It always shows a
//! dashed centre cross and, when a character is set, either the coloured
//! stroke-order overlay or a faint fallback glyph.

use std::fmt::Write;
use std::sync::Arc;

use kanji_core::{StrokeGeometry, SurfaceMetrics};
use serde::Serialize;
use tiny_skia::Pixmap;

use crate::error::{RenderError, RenderResult};

/// Per-stroke colours, cycled by stroke index.
pub const PALETTE: [&str; 8] = [
    "#ef4444", "#f97316", "#84cc16", "#10b981", "#06b6d4", "#3b82f6", "#8b5cf6", "#d946ef",
];

/// Dashed centre cross.
pub const GRID_COLOR: &str = "#cbd5e1";
/// Light underlay drawn beneath the coloured strokes.
pub const SILHOUETTE_COLOR: &str = "#f1f5f9";
/// Fallback glyph fill.
pub const GLYPH_COLOR: &str = "#e2e8f0";
/// Stroke numeral fill.
pub const LABEL_COLOR: &str = "#808080";

const GRID_WIDTH: f32 = 2.0;
const SILHOUETTE_WIDTH: f32 = 5.0;
const STROKE_WIDTH: f32 = 4.0;
const LABEL_FONT_SIZE: f32 = 8.0;
const GLYPH_FONTS: &str = "'Noto Sans CJK JP', 'Noto Sans JP', 'Hiragino Sans', 'Yu Gothic', sans-serif";

/// What the guide layer is currently showing for its character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GuideMode {
    /// Stroke-order overlay with this many strokes.
    Strokes {
        /// Number of strokes drawn.
        count: usize,
    },
    /// Large glyph, used when no stroke geometry is available.
    Fallback,
    /// Neither strokes nor glyph could be drawn; only the grid is shown.
    GridOnly,
}

/// Rasterizes guide documents. Holds the font database used for glyphs
/// and numerals, which is expensive to build, so create one and reuse it.
pub struct GuideRenderer {
    options: usvg::Options<'static>,
}

impl GuideRenderer {
    /// Renderer with the system fonts loaded.
    #[must_use]
    pub fn new() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        tracing::debug!(faces = fontdb.len(), "Loaded guide fonts");
        Self::with_fontdb(fontdb)
    }

    /// Renderer with a caller-supplied font database.
    ///
    /// If the database has no face for its generic sans-serif family, the
    /// first loaded family takes that role so glyphs still resolve; usvg then
    /// falls back per character to any face that covers it.
    #[must_use]
    pub fn with_fontdb(mut fontdb: usvg::fontdb::Database) -> Self {
        use usvg::fontdb::{Family, Query, Stretch, Style, Weight};

        let generic = Query {
            families: &[Family::SansSerif],
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        if fontdb.query(&generic).is_none() {
            let family = fontdb
                .faces()
                .find_map(|face| face.families.first().map(|(name, _)| name.clone()));
            if let Some(family) = family {
                tracing::debug!(%family, "Using as sans-serif guide font");
                fontdb.set_sans_serif_family(family);
            }
        }

        let mut options = usvg::Options::default();
        options.fontdb = Arc::new(fontdb);
        Self { options }
    }

    /// Build and rasterize the guide for `metrics`.
    ///
    /// `character` of `None` renders the grid only. Returns the pixmap and the
    /// mode that was actually drawn; see [`render_degrading`].
    ///
    /// # Errors
    ///
    /// Returns an error if not even the grid can be rasterized.
    pub fn render(
        &self,
        metrics: SurfaceMetrics,
        character: Option<char>,
        geometry: Option<&StrokeGeometry>,
    ) -> RenderResult<(Pixmap, Option<GuideMode>)> {
        render_degrading(metrics, character, geometry, |svg| self.rasterize(svg))
    }

    /// Rasterize an SVG string to a pixmap of its declared size.
    ///
    /// # Errors
    ///
    /// Returns an error if the SVG cannot be parsed or the pixmap cannot be
    /// allocated.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rasterize(&self, svg: &str) -> RenderResult<Pixmap> {
        let tree = usvg::Tree::from_str(svg, &self.options)
            .map_err(|e| RenderError::Guide(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width().round() as u32;
        let px_h = tree.size().height().round() as u32;

        let mut pixmap = Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Surface("Failed to create guide pixmap".to_string()))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        Ok(pixmap)
    }
}

impl Default for GuideRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GuideRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuideRenderer")
            .field("font_faces", &self.options.fontdb.len())
            .finish()
    }
}

/// Rasterize the guide with `rasterize`, stepping down from the stroke
/// overlay to the fallback glyph and then to the bare grid when a document
/// fails. The returned mode names what the pixmap shows.
///
/// # Errors
///
/// Returns the grid's error if even the bare grid cannot be rasterized.
pub fn render_degrading<F>(
    metrics: SurfaceMetrics,
    character: Option<char>,
    geometry: Option<&StrokeGeometry>,
    mut rasterize: F,
) -> RenderResult<(Pixmap, Option<GuideMode>)>
where
    F: FnMut(&str) -> RenderResult<Pixmap>,
{
    let (svg, mode) = build_guide_svg(metrics, character, geometry);
    let mut error = match rasterize(&svg) {
        Ok(pixmap) => return Ok((pixmap, mode)),
        Err(e) => e,
    };

    if matches!(mode, Some(GuideMode::Strokes { .. })) {
        tracing::warn!(error = %error, "Stroke guide failed, drawing glyph instead");
        let (svg, mode) = build_guide_svg(metrics, character, None);
        match rasterize(&svg) {
            Ok(pixmap) => return Ok((pixmap, mode)),
            Err(e) => error = e,
        }
    }

    if character.is_none() {
        return Err(error);
    }
    tracing::warn!(error = %error, "Guide glyph failed, showing grid only");
    let (svg, _) = build_guide_svg(metrics, None, None);
    let pixmap = rasterize(&svg)?;
    Ok((pixmap, Some(GuideMode::GridOnly)))
}

/// Build the guide SVG document.
///
/// Geometry with no strokes counts as absent, so exactly one of the stroke
/// overlay or the fallback glyph is drawn whenever a character is given.
#[must_use]
pub fn build_guide_svg(
    metrics: SurfaceMetrics,
    character: Option<char>,
    geometry: Option<&StrokeGeometry>,
) -> (String, Option<GuideMode>) {
    let (px_w, px_h) = metrics.physical_size();
    let w = metrics.size.width;
    let h = metrics.size.height;

    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{px_w}\" height=\"{px_h}\" viewBox=\"0 0 {w} {h}\">",
    );
    write_grid(&mut svg, w, h);

    let mode = match (character, geometry.filter(|g| !g.is_empty())) {
        (None, _) => None,
        (Some(_), Some(geometry)) => {
            write_strokes(&mut svg, w, h, geometry);
            Some(GuideMode::Strokes {
                count: geometry.len(),
            })
        }
        (Some(c), None) => {
            write_glyph(&mut svg, w, h, c);
            Some(GuideMode::Fallback)
        }
    };

    svg.push_str("</svg>");
    (svg, mode)
}

fn write_grid(svg: &mut String, w: f32, h: f32) {
    let dash = w * 0.02;
    let cx = w / 2.0;
    let cy = h / 2.0;
    let _ = write!(
        svg,
        "<g stroke=\"{GRID_COLOR}\" stroke-width=\"{GRID_WIDTH}\" stroke-dasharray=\"{dash} {dash}\">\
         <line x1=\"{cx}\" y1=\"0\" x2=\"{cx}\" y2=\"{h}\"/>\
         <line x1=\"0\" y1=\"{cy}\" x2=\"{w}\" y2=\"{cy}\"/></g>",
    );
}

fn write_strokes(svg: &mut String, w: f32, h: f32, geometry: &StrokeGeometry) {
    let vb = geometry.view_box;
    let scale = (w / vb.width).min(h / vb.height);
    let ox = (w - vb.width * scale) / 2.0;
    let oy = (h - vb.height * scale) / 2.0;

    let _ = write!(
        svg,
        "<g transform=\"translate({ox} {oy}) scale({scale})\" fill=\"none\" stroke-linecap=\"round\" stroke-linejoin=\"round\">",
    );

    for stroke in &geometry.strokes {
        let _ = write!(
            svg,
            "<path d=\"{}\" stroke=\"{SILHOUETTE_COLOR}\" stroke-width=\"{SILHOUETTE_WIDTH}\"/>",
            escape_xml(&stroke.path_data),
        );
    }
    for (i, stroke) in geometry.strokes.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let _ = write!(
            svg,
            "<path d=\"{}\" stroke=\"{color}\" stroke-width=\"{STROKE_WIDTH}\"/>",
            escape_xml(&stroke.path_data),
        );
    }
    for stroke in &geometry.strokes {
        let (Some(label), Some(transform)) = (&stroke.label, stroke.label_transform) else {
            continue;
        };
        let _ = write!(
            svg,
            "<text transform=\"{}\" font-size=\"{LABEL_FONT_SIZE}\" fill=\"{LABEL_COLOR}\" stroke=\"none\" font-family=\"sans-serif\">{}</text>",
            transform.to_svg(),
            escape_xml(label),
        );
    }

    svg.push_str("</g>");
}

fn write_glyph(svg: &mut String, w: f32, h: f32, character: char) {
    let size = w * 0.8;
    let x = w / 2.0;
    let y = h / 2.0 + w * 0.03;
    let mut buf = [0u8; 4];
    let _ = write!(
        svg,
        "<text x=\"{x}\" y=\"{y}\" font-size=\"{size}\" fill=\"{GLYPH_COLOR}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{GLYPH_FONTS}\">{}</text>",
        escape_xml(character.encode_utf8(&mut buf)),
    );
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use kanji_core::{Affine, LogicalSize, StrokePath};

    use super::*;

    fn two_strokes() -> StrokeGeometry {
        StrokeGeometry::new(vec![
            StrokePath::new("M20,30 L90,30")
                .with_label("1", Some(Affine::translate(15.0, 28.0))),
            StrokePath::new("M10,80 L100,80"),
        ])
    }

    fn metrics() -> SurfaceMetrics {
        SurfaceMetrics::new(LogicalSize::square(218.0), 2.0)
    }

    #[test]
    fn test_strokes_mode_uses_palette_in_order() {
        let geometry = two_strokes();
        let (svg, mode) = build_guide_svg(metrics(), Some('二'), Some(&geometry));
        assert_eq!(mode, Some(GuideMode::Strokes { count: 2 }));

        let first = svg.find(PALETTE[0]).expect("first colour");
        let second = svg.find(PALETTE[1]).expect("second colour");
        assert!(first < second);
        assert_eq!(svg.matches(SILHOUETTE_COLOR).count(), 2);
        assert!(svg.contains("scale(2)"));
        assert!(!svg.contains(GLYPH_COLOR));
    }

    #[test]
    fn test_label_only_for_strokes_with_transform() {
        let geometry = two_strokes();
        let (svg, _) = build_guide_svg(metrics(), Some('二'), Some(&geometry));
        assert_eq!(svg.matches("<text").count(), 1);
        assert!(svg.contains("matrix(1 0 0 1 15 28)"));
    }

    #[test]
    fn test_fallback_without_geometry() {
        let (svg, mode) = build_guide_svg(metrics(), Some('山'), None);
        assert_eq!(mode, Some(GuideMode::Fallback));
        assert!(svg.contains('山'));
        assert!(svg.contains(GLYPH_COLOR));
        assert!(!svg.contains(PALETTE[0]));
    }

    #[test]
    fn test_empty_geometry_falls_back() {
        let empty = StrokeGeometry::new(Vec::new());
        let (_, mode) = build_guide_svg(metrics(), Some('山'), Some(&empty));
        assert_eq!(mode, Some(GuideMode::Fallback));
    }

    #[test]
    fn test_grid_only_without_character() {
        let (svg, mode) = build_guide_svg(metrics(), None, None);
        assert_eq!(mode, None);
        assert!(svg.contains(GRID_COLOR));
        assert!(svg.contains("width=\"436\""));
        assert!(svg.contains("viewBox=\"0 0 218 218\""));
    }

    #[test]
    fn test_rasterize_grid_at_physical_size() {
        let renderer = GuideRenderer::with_fontdb(usvg::fontdb::Database::new());
        let (pixmap, _) = renderer.render(metrics(), None, None).expect("render");
        assert_eq!((pixmap.width(), pixmap.height()), (436, 436));

        // Centre cross passes through the middle column.
        let painted = (0..436).any(|y| pixmap.pixel(218, y).is_some_and(|p| p.alpha() > 0));
        assert!(painted);
    }

    #[test]
    fn test_rasterize_strokes_paints_palette() {
        let renderer = GuideRenderer::with_fontdb(usvg::fontdb::Database::new());
        let geometry = two_strokes();
        let m = SurfaceMetrics::new(LogicalSize::square(109.0), 1.0);
        let (pixmap, mode) = renderer.render(m, Some('二'), Some(&geometry)).expect("render");
        assert_eq!(mode, Some(GuideMode::Strokes { count: 2 }));

        // Mid-point of the first stroke is painted red-ish.
        let px = pixmap.pixel(55, 30).expect("pixel").demultiply();
        assert!(px.red() > 200 && px.green() < 120, "{px:?}");
    }

    fn tuffy() -> usvg::fontdb::Database {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_font_data(include_bytes!("../tests/fixtures/Tuffy.ttf").to_vec());
        fontdb
    }

    fn painted_with(pixmap: &Pixmap, (r, g, b): (u8, u8, u8)) -> usize {
        pixmap
            .pixels()
            .iter()
            .map(|p| p.demultiply())
            .filter(|p| {
                p.alpha() == 255
                    && p.red().abs_diff(r) <= 2
                    && p.green().abs_diff(g) <= 2
                    && p.blue().abs_diff(b) <= 2
            })
            .count()
    }

    #[test]
    fn test_fallback_glyph_paints_with_loaded_font() {
        let renderer = GuideRenderer::with_fontdb(tuffy());
        let (glyph, mode) = renderer.render(metrics(), Some('A'), None).expect("render");
        assert_eq!(mode, Some(GuideMode::Fallback));
        let (grid, _) = renderer.render(metrics(), None, None).expect("render");

        // #e2e8f0 fill covers a large area only when the glyph is drawn.
        assert!(painted_with(&glyph, (0xe2, 0xe8, 0xf0)) > 500);
        assert_eq!(painted_with(&grid, (0xe2, 0xe8, 0xf0)), 0);
    }

    #[test]
    fn test_sans_serif_resolves_to_loaded_family() {
        use usvg::fontdb::{Family, Query, Stretch, Style, Weight};

        let renderer = GuideRenderer::with_fontdb(tuffy());
        let query = Query {
            families: &[Family::SansSerif],
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        assert!(renderer.options.fontdb.query(&query).is_some());
    }

    #[test]
    fn test_failed_strokes_degrade_to_glyph() {
        let geometry = two_strokes();
        let mut attempts = 0;
        let (_, mode) = render_degrading(metrics(), Some('二'), Some(&geometry), |svg| {
            attempts += 1;
            if svg.contains(PALETTE[0]) {
                Err(RenderError::Guide("stroke overlay".to_string()))
            } else {
                Pixmap::new(1, 1).ok_or_else(|| RenderError::Surface("pixmap".to_string()))
            }
        })
        .expect("render");
        assert_eq!(mode, Some(GuideMode::Fallback));
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_failed_glyph_reports_grid_only() {
        let geometry = two_strokes();
        let (_, mode) = render_degrading(metrics(), Some('二'), Some(&geometry), |svg| {
            if svg.contains("<path") || svg.contains("<text") {
                Err(RenderError::Guide("character layer".to_string()))
            } else {
                Pixmap::new(1, 1).ok_or_else(|| RenderError::Surface("pixmap".to_string()))
            }
        })
        .expect("render");
        assert_eq!(mode, Some(GuideMode::GridOnly));
    }

    #[test]
    fn test_failed_grid_is_an_error() {
        let result = render_degrading(metrics(), Some('山'), None, |_| {
            Err(RenderError::Guide("nothing renders".to_string()))
        });
        assert!(result.is_err());

        let result = render_degrading(metrics(), None, None, |_| {
            Err(RenderError::Guide("nothing renders".to_string()))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_escape_path_data() {
        assert_eq!(escape_xml("M0,0 \"<&>"), "M0,0 &quot;&lt;&amp;&gt;");
    }
}
