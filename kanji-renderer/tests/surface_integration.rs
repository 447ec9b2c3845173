//! Integration tests for the drawing surface (kanji-renderer).
//!
//! Drives the surface through input events the way a host would and checks
//! the exported image and the rendered guide.

use kanji_core::{
    ElementRect, InputEvent, LogicalPoint, LogicalSize, PointerPhase, StrokeGeometry,
    SurfaceMetrics, TouchPhase,
};
use kanji_renderer::{
    DrawingSurface, GuideMode, GuideRenderer, ImageFormat, InkStyle, SurfaceSignal,
};
use proptest::prelude::*;

const NI_DOCUMENT: &str = include_str!("../../kanji-core/tests/fixtures/kanjivg_04e8c.svg");

fn surface(side: f32, dpr: f32) -> DrawingSurface {
    DrawingSurface::with_renderer(
        SurfaceMetrics::new(LogicalSize::square(side), dpr),
        // No fonts: keeps tests independent of the host.
        GuideRenderer::with_fontdb(usvg::fontdb::Database::new()),
        InkStyle::default(),
    )
    .expect("surface")
}

fn ink_alpha(surface: &DrawingSurface, px: u32, py: u32) -> u8 {
    surface.ink().pixmap().pixel(px, py).map_or(0, |p| p.alpha())
}

// ==========================================================================
// Stroke lifecycle
// ==========================================================================

#[test]
fn test_stroke_produces_non_empty_export() {
    let mut s = surface(300.0, 2.0);
    assert!(s.is_empty());

    let mut signals = Vec::new();
    signals.extend(s.handle_input(&InputEvent::mouse(PointerPhase::Down, 50.0, 150.0)).signals);
    for x in (60..=250).step_by(10) {
        #[allow(clippy::cast_precision_loss)]
        let x = x as f32;
        signals.extend(s.handle_input(&InputEvent::mouse(PointerPhase::Move, x, 150.0)).signals);
    }
    signals.extend(s.handle_input(&InputEvent::mouse(PointerPhase::Up, 250.0, 150.0)).signals);

    assert_eq!(
        signals,
        vec![
            SurfaceSignal::StrokeStarted,
            SurfaceSignal::StrokeEnded,
            SurfaceSignal::DrawingChanged
        ]
    );
    assert!(!s.is_empty());

    let image = s.export_image(ImageFormat::Png).expect("export");
    assert_eq!((image.width, image.height), (600, 600));

    let decoded = image::load_from_memory(&image.bytes).expect("decode").to_rgb8();
    let ink = decoded.get_pixel(300, 300);
    let paper = decoded.get_pixel(10, 10);
    assert_eq!(paper.0, [255, 255, 255]);
    assert!(ink.0[0] < 64 && ink.0[2] < 96, "ink pixel {ink:?}");

    s.clear();
    assert!(s.is_empty());
}

#[test]
fn test_export_excludes_guide() {
    let mut s = surface(109.0, 1.0);
    let geometry = StrokeGeometry::from_kanjivg(NI_DOCUMENT).expect("parse");
    s.render_guide('二', Some(geometry));

    let image = s.export_image(ImageFormat::Png).expect("export");
    let decoded = image::load_from_memory(&image.bytes).expect("decode").to_rgb8();
    assert!(decoded.pixels().all(|p| p.0 == [255, 255, 255]));
}

#[test]
fn test_jpeg_export_at_default_quality() {
    let mut s = surface(120.0, 1.0);
    s.begin_stroke(LogicalPoint::new(10.0, 10.0));
    s.continue_stroke(LogicalPoint::new(110.0, 110.0));
    s.end_stroke();

    let image = s.export_image(ImageFormat::JPEG).expect("export");
    assert_eq!(image.format, ImageFormat::Jpeg { quality: 90 });
    assert_eq!(&image.bytes[..2], &[0xFF, 0xD8]);
}

// ==========================================================================
// Guide
// ==========================================================================

#[test]
fn test_kanjivg_guide_draws_coloured_strokes() {
    let mut s = surface(218.0, 1.0);
    let geometry = StrokeGeometry::from_kanjivg(NI_DOCUMENT).expect("parse");
    assert_eq!(s.render_guide('二', Some(geometry)), GuideMode::Strokes { count: 2 });

    let colored = s
        .guide_pixmap()
        .pixels()
        .iter()
        .filter(|p| {
            let c = p.demultiply();
            p.alpha() > 200 && c.red() > 200 && c.green() < 120 && c.blue() < 120
        })
        .count();
    assert!(colored > 50, "first stroke should be painted red, got {colored}");
}

#[test]
fn test_guide_survives_resize() {
    let mut s = surface(100.0, 1.0);
    let geometry = StrokeGeometry::from_kanjivg(NI_DOCUMENT).expect("parse");
    s.render_guide('二', Some(geometry));
    assert!(s.resize(LogicalSize::square(150.0), 2.0).expect("resize"));
    assert_eq!(s.guide_mode(), Some(GuideMode::Strokes { count: 2 }));
    assert_eq!(s.guide_pixmap().width(), 300);
}

// ==========================================================================
// Coordinate mapping
// ==========================================================================

#[test]
fn test_css_scaled_element_maps_to_logical() {
    let mut s = surface(300.0, 1.0);
    // Rendered at half size, offset by the page layout.
    s.set_element_rect(ElementRect::new(40.0, 60.0, 150.0, 150.0));
    s.handle_input(&InputEvent::touch(TouchPhase::Start, 115.0, 135.0));
    s.handle_input(&InputEvent::touch(TouchPhase::End, 0.0, 0.0));

    assert_eq!(ink_alpha(&s, 150, 150), 255);
    assert_eq!(ink_alpha(&s, 75, 75), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_ink_lands_at_logical_point(
        dpr in 1.0f32..3.0,
        css_scale in 0.5f32..2.0,
        left in 0.0f32..200.0,
        top in 0.0f32..200.0,
        fx in 0.2f32..0.8,
        fy in 0.2f32..0.8,
    ) {
        let side = 100.0;
        let mut s = surface(side, dpr);
        let rendered = side * css_scale;
        s.set_element_rect(ElementRect::new(left, top, rendered, rendered));

        let client_x = left + fx * rendered;
        let client_y = top + fy * rendered;
        s.handle_input(&InputEvent::mouse(PointerPhase::Down, client_x, client_y));
        s.handle_input(&InputEvent::mouse(PointerPhase::Up, client_x, client_y));

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (px, py) = ((fx * side * dpr) as u32, (fy * side * dpr) as u32);
        prop_assert_eq!(ink_alpha(&s, px, py), 255);

        // Well outside the dot radius stays clear.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let far = (((fx * side + 10.0) * dpr) as u32).min(s.ink().pixmap().width() - 1);
        prop_assert_eq!(ink_alpha(&s, far, py), 0);
    }
}
