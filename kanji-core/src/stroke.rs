//! Stroke-order geometry and the KanjiVG document parser.
//!
//! KanjiVG publishes one SVG document per character, keyed by the
//! character's code point. Each stroke is a `<path>` in drawing order; an
//! optional `StrokeNumbers` group carries one `<text>` numeral per stroke,
//! positioned by a `transform`.

use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{KanjiError, KanjiResult, LogicalSize};

/// Side length of the KanjiVG coordinate box.
pub const KANJIVG_BOX: f32 = 109.0;

const KVG_NAMESPACE: &str = "http://kanjivg.tagaini.net";

/// Lookup key for a character: lowercase hex code point, zero-padded to
/// five digits (`漢` → `06f22`).
#[must_use]
pub fn stroke_key(character: char) -> String {
    format!("{:05x}", u32::from(character))
}

/// 2D affine transform in SVG `matrix(a b c d e f)` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    /// Horizontal scale.
    pub a: f32,
    /// Vertical skew.
    pub b: f32,
    /// Horizontal skew.
    pub c: f32,
    /// Vertical scale.
    pub d: f32,
    /// Horizontal translation.
    pub e: f32,
    /// Vertical translation.
    pub f: f32,
}

impl Affine {
    /// The identity transform.
    pub const IDENTITY: Self = Self::translate(0.0, 0.0);

    /// Pure translation.
    #[must_use]
    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    /// Apply the transform to a point.
    #[must_use]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// SVG `transform` attribute value.
    #[must_use]
    pub fn to_svg(&self) -> String {
        format!(
            "matrix({} {} {} {} {} {})",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}

impl From<svgtypes::Transform> for Affine {
    #[allow(clippy::cast_possible_truncation)]
    fn from(t: svgtypes::Transform) -> Self {
        Self {
            a: t.a as f32,
            b: t.b as f32,
            c: t.c as f32,
            d: t.d as f32,
            e: t.e as f32,
            f: t.f as f32,
        }
    }
}

/// One stroke of the reference character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokePath {
    /// SVG path data (`d` attribute).
    pub path_data: String,
    /// Stroke-order numeral, when the document carries one.
    pub label: Option<String>,
    /// Placement of the numeral.
    pub label_transform: Option<Affine>,
}

impl StrokePath {
    /// Stroke without a label.
    #[must_use]
    pub fn new(path_data: impl Into<String>) -> Self {
        Self {
            path_data: path_data.into(),
            label: None,
            label_transform: None,
        }
    }

    /// Attach a numeral label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>, transform: Option<Affine>) -> Self {
        self.label = Some(label.into());
        self.label_transform = transform;
        self
    }
}

/// Ordered strokes of one character. Index is stroke-drawing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeGeometry {
    /// Strokes in drawing order.
    pub strokes: Vec<StrokePath>,
    /// Size of the document's coordinate box.
    pub view_box: LogicalSize,
}

impl StrokeGeometry {
    /// Geometry in the standard KanjiVG box.
    #[must_use]
    pub fn new(strokes: Vec<StrokePath>) -> Self {
        Self {
            strokes,
            view_box: LogicalSize::square(KANJIVG_BOX),
        }
    }

    /// Number of strokes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    /// True if there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Parse a KanjiVG stroke-order document.
    ///
    /// Structural elements (groups, clip paths, definitions) are skipped.
    /// Labels from the `StrokeNumbers` group pair with strokes by position;
    /// missing labels are simply absent.
    ///
    /// # Errors
    ///
    /// Returns [`KanjiError::StrokeDocument`] if the document is not
    /// well-formed SVG and [`KanjiError::InvalidPath`] if a stroke's path
    /// data does not parse.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_kanjivg(document: &str) -> KanjiResult<Self> {
        let prepared = prepare_document(document);
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(&prepared, options)
            .map_err(|e| KanjiError::StrokeDocument(e.to_string()))?;

        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(KanjiError::StrokeDocument(format!(
                "root element is <{}>, expected <svg>",
                root.tag_name().name()
            )));
        }

        let view_box = root
            .attribute("viewBox")
            .and_then(|v| svgtypes::ViewBox::from_str(v).ok())
            .map_or(LogicalSize::square(KANJIVG_BOX), |vb| {
                LogicalSize::new(vb.w as f32, vb.h as f32)
            });

        let candidates: Vec<_> = doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "path")
            .filter(|n| !is_non_rendered(*n))
            .filter(|n| n.attribute("d").is_some_and(|d| !d.trim().is_empty()))
            .collect();

        let has_stroke_ids = candidates
            .iter()
            .any(|n| n.attribute("id").is_some_and(is_stroke_id));

        let mut strokes = Vec::with_capacity(candidates.len());
        for node in candidates {
            if has_stroke_ids && !node.attribute("id").is_some_and(is_stroke_id) {
                continue;
            }
            let d = node.attribute("d").unwrap_or_default().trim();
            validate_path(strokes.len(), d)?;
            strokes.push(StrokePath::new(d));
        }

        for (stroke, (label, transform)) in strokes.iter_mut().zip(stroke_labels(&doc)) {
            stroke.label = Some(label);
            stroke.label_transform = transform;
        }

        tracing::debug!(strokes = strokes.len(), "parsed stroke document");
        Ok(Self { strokes, view_box })
    }
}

/// Strip the DOCTYPE (KanjiVG declares its `kvg` attributes there) and make
/// sure the `kvg` prefix resolves for a namespace-aware parser.
fn prepare_document(document: &str) -> Cow<'_, str> {
    let mut text = Cow::Borrowed(document);

    if let Some(start) = text.find("<!DOCTYPE") {
        let rest = &text[start..];
        let subset = rest.find('[');
        let close = rest.find('>');
        let end = match (subset, close) {
            (Some(open), Some(gt)) if open < gt => rest.find("]>").map(|i| i + 2),
            (_, Some(gt)) => Some(gt + 1),
            _ => None,
        };
        if let Some(end) = end {
            let mut owned = String::with_capacity(text.len());
            owned.push_str(&text[..start]);
            owned.push_str(&text[start + end..]);
            text = Cow::Owned(owned);
        }
    }

    if text.contains(" kvg:") && !text.contains("xmlns:kvg") {
        if let Some(pos) = find_svg_tag(&text) {
            let insert_at = pos + "<svg".len();
            let mut owned = String::with_capacity(text.len() + 48);
            owned.push_str(&text[..insert_at]);
            owned.push_str(" xmlns:kvg=\"");
            owned.push_str(KVG_NAMESPACE);
            owned.push('"');
            owned.push_str(&text[insert_at..]);
            text = Cow::Owned(owned);
        }
    }

    text
}

fn find_svg_tag(text: &str) -> Option<usize> {
    text.match_indices("<svg").map(|(i, _)| i).find(|&i| {
        text[i + 4..]
            .chars()
            .next()
            .is_some_and(|c| c.is_whitespace() || c == '>')
    })
}

fn is_non_rendered(node: roxmltree::Node<'_, '_>) -> bool {
    node.ancestors().any(|a| {
        a.is_element()
            && matches!(
                a.tag_name().name(),
                "defs" | "clipPath" | "mask" | "symbol" | "pattern"
            )
    })
}

/// KanjiVG stroke ids end in `-s<N>` (`kvg:04e8c-s1`).
fn is_stroke_id(id: &str) -> bool {
    id.rsplit_once("-s")
        .is_some_and(|(_, n)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn validate_path(index: usize, data: &str) -> KanjiResult<()> {
    for segment in svgtypes::PathParser::from(data) {
        segment.map_err(|e| KanjiError::InvalidPath {
            index,
            message: e.to_string(),
        })?;
    }
    Ok(())
}

fn stroke_labels(doc: &roxmltree::Document<'_>) -> Vec<(String, Option<Affine>)> {
    let Some(group) = doc.descendants().find(|n| {
        n.is_element()
            && n.tag_name().name() == "g"
            && n.attribute("id").is_some_and(|id| id.contains("StrokeNumbers"))
    }) else {
        return Vec::new();
    };

    group
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "text")
        .map(|n| {
            let label: String = n
                .descendants()
                .filter(roxmltree::Node::is_text)
                .filter_map(|t| t.text())
                .collect();
            let transform = n
                .attribute("transform")
                .and_then(|t| svgtypes::Transform::from_str(t).ok())
                .map(Affine::from);
            (label.trim().to_string(), transform)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO: &str = include_str!("../tests/fixtures/kanjivg_04e8c.svg");

    #[test]
    fn test_stroke_key_is_padded_lowercase_hex() {
        assert_eq!(stroke_key('一'), "04e00");
        assert_eq!(stroke_key('漢'), "06f22");
        assert_eq!(stroke_key('A'), "00041");
        assert_eq!(stroke_key('𠀋'), "2000b");
    }

    #[test]
    fn test_parse_kanjivg_document() {
        let geometry = StrokeGeometry::from_kanjivg(TWO).expect("parse");
        assert_eq!(geometry.len(), 2);
        assert_eq!(geometry.view_box, LogicalSize::square(109.0));
        assert!(geometry.strokes[0].path_data.starts_with("M28.25,26.65"));
        assert_eq!(geometry.strokes[0].label.as_deref(), Some("1"));
        assert_eq!(geometry.strokes[1].label.as_deref(), Some("2"));

        let t = geometry.strokes[1].label_transform.expect("transform");
        assert!((t.e - 5.5).abs() < 1e-4);
        assert!((t.f - 80.5).abs() < 1e-4);
    }

    #[test]
    fn test_missing_labels_are_omitted() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 109 109">
            <g><path id="x-s1" d="M10,10 L90,10"/><path id="x-s2" d="M10,50 L90,50"/></g>
            <g id="kvg:StrokeNumbers_x"><text transform="translate(5 5)">1</text></g>
        </svg>"#;
        let geometry = StrokeGeometry::from_kanjivg(doc).expect("parse");
        assert_eq!(geometry.len(), 2);
        assert_eq!(geometry.strokes[0].label.as_deref(), Some("1"));
        assert_eq!(
            geometry.strokes[0].label_transform,
            Some(Affine::translate(5.0, 5.0))
        );
        assert_eq!(geometry.strokes[1].label, None);
        assert_eq!(geometry.strokes[1].label_transform, None);
    }

    #[test]
    fn test_structural_paths_are_filtered() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg">
            <defs><clipPath id="c"><path d="M0,0 L1,1"/></clipPath></defs>
            <path id="frame" d="M0,0 H109 V109 H0 Z"/>
            <path id="k-s1" d="M10,10 L90,10"/>
        </svg>"#;
        let geometry = StrokeGeometry::from_kanjivg(doc).expect("parse");
        assert_eq!(geometry.len(), 1);
        assert_eq!(geometry.strokes[0].path_data, "M10,10 L90,10");
    }

    #[test]
    fn test_paths_without_stroke_ids_are_kept() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 100">
            <path d="M10,10 L90,10"/><path d=""/><path d="M10,50 L90,50"/>
        </svg>"#;
        let geometry = StrokeGeometry::from_kanjivg(doc).expect("parse");
        assert_eq!(geometry.len(), 2);
        assert_eq!(geometry.view_box, LogicalSize::new(200.0, 100.0));
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(matches!(
            StrokeGeometry::from_kanjivg("<svg><path d=\"M0,0\"></svg>"),
            Err(KanjiError::StrokeDocument(_))
        ));
        assert!(matches!(
            StrokeGeometry::from_kanjivg("<html></html>"),
            Err(KanjiError::StrokeDocument(_))
        ));
    }

    #[test]
    fn test_invalid_path_data_is_an_error() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg"><path d="M10,10 Q"/></svg>"#;
        assert!(matches!(
            StrokeGeometry::from_kanjivg(doc),
            Err(KanjiError::InvalidPath { index: 0, .. })
        ));
    }

    #[test]
    fn test_affine_apply_and_svg() {
        let t = Affine::translate(3.0, 4.0);
        assert_eq!(t.apply(1.0, 1.0), (4.0, 5.0));
        assert_eq!(t.to_svg(), "matrix(1 0 0 1 3 4)");
        assert_eq!(Affine::IDENTITY.apply(7.0, 8.0), (7.0, 8.0));
    }
}
