use card_points::overlay::{BadgeStyle, PointBand, Renderer, COMPACT_SIZE};
use card_points::typeface::Typeface;
use image::{DynamicImage, ImageBuffer, Rgba};

fn solid_image(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(ImageBuffer::from_fn(width, height, |_, _| Rgba(color)))
}

fn renderer() -> Renderer {
    Renderer::new(Typeface::builtin())
}

/// Renders on black at full size and reads the badge color just inside its
/// top-left corner, where only padding is drawn.
fn badge_corner_color(points: i64) -> [u8; 4] {
    let renderer = renderer();
    let source = solid_image(400, 400, [0, 0, 0, 255]);
    let layout = renderer
        .layout(400, 400, points, true, &BadgeStyle::default())
        .expect("layout should succeed");
    let rendered = renderer.render(&source, points, true).expect("render should succeed");

    rendered
        .get_pixel(layout.rect.x1 as u32 + 1, layout.rect.y1 as u32 + 1)
        .0
}

#[test]
fn badge_color_follows_point_band() {
    let cases = [
        (100, PointBand::Red, [200, 0, 0, 255]),
        (50, PointBand::Red, [200, 0, 0, 255]),
        (49, PointBand::Orange, [200, 129, 0, 255]),
        (20, PointBand::Orange, [200, 129, 0, 255]),
        (19, PointBand::Yellow, [200, 200, 0, 255]),
        (10, PointBand::Yellow, [200, 200, 0, 255]),
        (9, PointBand::Green, [0, 200, 0, 255]),
        (1, PointBand::Green, [0, 200, 0, 255]),
    ];

    for (points, band, expected) in cases {
        assert_eq!(PointBand::for_points(points), band);
        assert_eq!(
            badge_corner_color(points),
            expected,
            "unexpected badge color for {points} points"
        );
    }
}

#[test]
fn badge_is_translucent() {
    // the source shows through the background rectangle
    let renderer = renderer();
    let source = solid_image(400, 400, [0, 0, 255, 255]);
    let layout = renderer
        .layout(400, 400, 60, true, &BadgeStyle::default())
        .unwrap();
    let rendered = renderer.render(&source, 60, true).unwrap();

    let pixel = rendered.get_pixel(layout.rect.x1 as u32 + 1, layout.rect.y1 as u32 + 1);
    assert!(pixel[2] > 0 && pixel[2] < 255);
    assert!(pixel[0] > pixel[2]);
}

#[test]
fn standard_mode_resizes_to_compact_size() {
    let rendered = renderer()
        .render(&solid_image(421, 614, [30, 30, 30, 255]), 12, false)
        .unwrap();

    assert_eq!(rendered.dimensions(), COMPACT_SIZE);
}

#[test]
fn high_quality_mode_keeps_source_size() {
    let rendered = renderer()
        .render(&solid_image(421, 614, [30, 30, 30, 255]), 12, true)
        .unwrap();

    assert_eq!(rendered.dimensions(), (421, 614));
}

#[test]
fn rendering_is_deterministic() {
    let source = DynamicImage::ImageRgba8(ImageBuffer::from_fn(300, 420, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
    }));
    let renderer = renderer();

    for high_quality in [false, true] {
        let first = renderer.render(&source, 37, high_quality).unwrap();
        let second = renderer.render(&source, 37, high_quality).unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
    }
}

#[test]
fn hundred_points_on_large_card_gets_red_badge_bottom_left() {
    let source = solid_image(600, 800, [20, 40, 120, 255]);
    let rendered = renderer().render(&source, 100, false).unwrap();

    assert_eq!(rendered.dimensions(), (177, 254));

    let is_red = |pixel: &Rgba<u8>| pixel[0] > 150 && pixel[1] < 90 && pixel[2] < 90;
    let red_bottom_left = rendered
        .enumerate_pixels()
        .filter(|(x, y, pixel)| *x < 100 && *y > 200 && is_red(pixel))
        .count();
    let red_top_right = rendered
        .enumerate_pixels()
        .filter(|(x, y, pixel)| *x > 100 && *y < 100 && is_red(pixel))
        .count();

    assert!(
        red_bottom_left > 300,
        "expected a red badge in the bottom-left, found {red_bottom_left} red pixels"
    );
    assert_eq!(red_top_right, 0);
}

#[test]
fn zero_points_render_in_green_band() {
    assert_eq!(badge_corner_color(0), [0, 200, 0, 255]);
}

#[test]
fn card_style_in_high_quality_moves_badge_inward() {
    let renderer = renderer();
    let plain = renderer
        .layout(813, 1185, 30, true, &BadgeStyle::default())
        .unwrap();
    let card = renderer
        .layout(813, 1185, 30, true, &BadgeStyle::for_cards(true))
        .unwrap();

    assert!(card.rect.x1 > plain.rect.x1);
    assert!(card.rect.y2 < plain.rect.y2);
    assert!(card.font_px > plain.font_px);
}
