use crate::geometry::{BoundingBox, ReferenceFrame};
use crate::hierarchy::{NodeClass, UiNode};
use image::{Rgb, RgbImage};

pub const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
pub const OUTLINE_WIDTH: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub nodes: usize,
    pub rectangles: usize,
}

/// Draws every drawable node under `root` onto `img`, parents before
/// children.
pub fn draw_hierarchy(img: &mut RgbImage, root: &UiNode, frame: ReferenceFrame) -> WalkStats {
    let mut stats = WalkStats::default();
    for node in root.pre_order() {
        stats.nodes += 1;
        if let NodeClass::Drawable(bbox) = node.classify() {
            if draw_bounding_box(img, &bbox, frame) {
                stats.rectangles += 1;
            }
        }
    }
    stats
}

/// Rescales `bbox` from `frame` to the image and outlines it. Returns
/// `false` when the rescaled box is inverted and nothing was drawn.
pub fn draw_bounding_box(img: &mut RgbImage, bbox: &BoundingBox, frame: ReferenceFrame) -> bool {
    let scaled = bbox.to_image(frame, img.width(), img.height());
    if scaled.is_degenerate() {
        tracing::debug!(?bbox, "skipping inverted bounding box");
        return false;
    }
    let (x0, y0, x1, y1) = scaled.pixel_corners();
    draw_rect_outline(img, x0, y0, x1, y1, OUTLINE_COLOR, OUTLINE_WIDTH);
    true
}

/// Outlines the inclusive rectangle `(x0, y0)..=(x1, y1)`. The stroke
/// grows inward from the rectangle edge; anything off-image is clipped.
pub fn draw_rect_outline(
    img: &mut RgbImage,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    color: Rgb<u8>,
    thickness: u32,
) {
    if img.width() == 0 || img.height() == 0 {
        return;
    }
    let max_x = i64::from(img.width()) - 1;
    let max_y = i64::from(img.height()) - 1;

    for t in 0..i64::from(thickness.max(1)) {
        let (tx0, ty0) = (x0.saturating_add(t), y0.saturating_add(t));
        let (tx1, ty1) = (x1.saturating_sub(t), y1.saturating_sub(t));
        if tx1 < tx0 || ty1 < ty0 {
            break;
        }
        for xx in tx0.max(0)..=tx1.min(max_x) {
            put_clipped(img, xx, ty0, max_x, max_y, color);
            put_clipped(img, xx, ty1, max_x, max_y, color);
        }
        for yy in ty0.max(0)..=ty1.min(max_y) {
            put_clipped(img, tx0, yy, max_x, max_y, color);
            put_clipped(img, tx1, yy, max_x, max_y, color);
        }
    }
}

fn put_clipped(img: &mut RgbImage, x: i64, y: i64, max_x: i64, max_y: i64, color: Rgb<u8>) {
    if (0..=max_x).contains(&x) && (0..=max_y).contains(&y) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::REFERENCE_FRAME;
    use serde_json::json;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn magenta_count(img: &RgbImage) -> usize {
        img.pixels().filter(|p| **p == OUTLINE_COLOR).count()
    }

    #[test]
    fn outline_is_two_pixels_wide_and_inward() {
        let mut img = RgbImage::from_pixel(20, 20, BLACK);
        draw_rect_outline(&mut img, 2, 3, 10, 12, OUTLINE_COLOR, 2);

        for (x, y) in [(2, 3), (10, 12), (3, 4), (9, 11), (6, 3), (6, 4), (2, 7), (3, 7)] {
            assert_eq!(*img.get_pixel(x, y), OUTLINE_COLOR, "({x}, {y})");
        }
        for (x, y) in [(1, 3), (11, 12), (6, 5), (4, 7), (6, 2), (6, 13)] {
            assert_eq!(*img.get_pixel(x, y), BLACK, "({x}, {y})");
        }
    }

    #[test]
    fn outline_is_clipped_to_image() {
        let mut img = RgbImage::from_pixel(10, 10, BLACK);
        draw_rect_outline(&mut img, -5, -5, 20, 20, OUTLINE_COLOR, 2);
        assert_eq!(magenta_count(&img), 0);

        draw_rect_outline(&mut img, 5, 5, 20, 20, OUTLINE_COLOR, 2);
        assert_eq!(*img.get_pixel(5, 9), OUTLINE_COLOR);
        assert_eq!(*img.get_pixel(9, 5), OUTLINE_COLOR);
        assert_eq!(*img.get_pixel(9, 9), BLACK);
    }

    #[test]
    fn extreme_coordinates_are_clipped_without_overflow() {
        let mut img = RgbImage::from_pixel(10, 10, BLACK);
        let far = BoundingBox::new(1e300, 0.0, 1e300, 2560.0);
        assert!(draw_bounding_box(&mut img, &far, REFERENCE_FRAME));
        draw_rect_outline(&mut img, i64::MIN, i64::MIN, i64::MAX, i64::MAX, OUTLINE_COLOR, 2);
        assert_eq!(magenta_count(&img), 0);
    }

    #[test]
    fn thin_rectangle_is_filled_by_stroke() {
        let mut img = RgbImage::from_pixel(10, 10, BLACK);
        draw_rect_outline(&mut img, 1, 1, 1, 4, OUTLINE_COLOR, 2);
        assert_eq!(magenta_count(&img), 4);
    }

    #[test]
    fn half_screen_box_lands_on_expected_pixels() {
        let mut img = RgbImage::from_pixel(360, 640, BLACK);
        let bbox = BoundingBox::new(0.0, 0.0, 720.0, 1280.0);
        assert!(draw_bounding_box(&mut img, &bbox, REFERENCE_FRAME));

        for (x, y) in [(0, 0), (180, 0), (0, 320), (180, 320), (1, 1), (179, 319)] {
            assert_eq!(*img.get_pixel(x, y), OUTLINE_COLOR, "({x}, {y})");
        }
        assert_eq!(*img.get_pixel(181, 0), BLACK);
        assert_eq!(*img.get_pixel(0, 321), BLACK);
        assert_eq!(*img.get_pixel(90, 160), BLACK);
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 720.0, 1280.0));
    }

    #[test]
    fn inverted_box_draws_nothing() {
        let mut img = RgbImage::from_pixel(36, 64, BLACK);
        let bbox = BoundingBox::new(720.0, 0.0, 0.0, 1280.0);
        assert!(!draw_bounding_box(&mut img, &bbox, REFERENCE_FRAME));
        assert_eq!(magenta_count(&img), 0);
    }

    #[test]
    fn counts_only_drawable_nodes() {
        let root: UiNode = serde_json::from_value(json!({
            "bounds": [0, 0, 1440, 2560],
            "visible-to-user": true,
            "visibility": "visible",
            "children": [
                {"bounds": [0, 0, 720, 1280], "visible-to-user": false, "visibility": "visible"},
                {"bounds": [0, 0, 720, 1280], "visible-to-user": true, "visibility": "invisible"},
                {"visible-to-user": true, "visibility": "visible", "children": [
                    {"bounds": [720, 1280, 1440, 2560], "visible-to-user": true, "visibility": "visible"},
                    {"bounds": [10, 10, 20, 20]}
                ]}
            ]
        }))
        .unwrap();

        let mut img = RgbImage::from_pixel(144, 256, BLACK);
        let stats = draw_hierarchy(&mut img, &root, REFERENCE_FRAME);
        assert_eq!(stats, WalkStats { nodes: 6, rectangles: 2 });
        assert_eq!(*img.get_pixel(72, 128), OUTLINE_COLOR);
        assert_eq!(*img.get_pixel(36, 64), BLACK);
    }
}
