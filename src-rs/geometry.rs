use serde::Deserialize;

/// Virtual screen size in which hierarchy bounds are expressed.
pub const REFERENCE_FRAME: ReferenceFrame = ReferenceFrame {
    width: 1440.0,
    height: 2560.0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned box given by its top-left `(x0, y0)` and bottom-right
/// `(x1, y1)` corners. Deserializes from a `[x0, y0, x1, y1]` array.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 4]")]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x0, y0, x1, y1]: [f64; 4]) -> Self {
        Self::new(x0, y0, x1, y1)
    }
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Maps a box from `frame` coordinates into the pixel space of a
    /// `width` x `height` image. x and y are scaled independently, so no
    /// aspect-ratio correction takes place.
    pub fn to_image(&self, frame: ReferenceFrame, width: u32, height: u32) -> BoundingBox {
        self.rescaled(
            (frame.width, frame.height),
            (f64::from(width), f64::from(height)),
        )
    }

    /// Inverse of [`BoundingBox::to_image`].
    #[cfg(test)]
    pub fn to_reference(&self, frame: ReferenceFrame, width: u32, height: u32) -> BoundingBox {
        self.rescaled(
            (f64::from(width), f64::from(height)),
            (frame.width, frame.height),
        )
    }

    pub fn is_degenerate(&self) -> bool {
        self.x1 < self.x0 || self.y1 < self.y0
    }

    /// Integer pixel corners, rounded to the nearest pixel.
    pub fn pixel_corners(&self) -> (i64, i64, i64, i64) {
        (
            self.x0.round() as i64,
            self.y0.round() as i64,
            self.x1.round() as i64,
            self.y1.round() as i64,
        )
    }

    // Divide before multiplying so a coordinate equal to the source span
    // maps exactly onto the target span.
    fn rescaled(&self, from: (f64, f64), to: (f64, f64)) -> BoundingBox {
        BoundingBox {
            x0: self.x0 / from.0 * to.0,
            y0: self.y0 / from.1 * to.1,
            x1: self.x1 / from.0 * to.0,
            y1: self.y1 / from.1 * to.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &BoundingBox, b: &BoundingBox) -> bool {
        let eps = 1e-9;
        (a.x0 - b.x0).abs() < eps
            && (a.y0 - b.y0).abs() < eps
            && (a.x1 - b.x1).abs() < eps
            && (a.y1 - b.y1).abs() < eps
    }

    #[test]
    fn rescales_half_screen_box() {
        let bbox = BoundingBox::new(0.0, 0.0, 720.0, 1280.0);
        let scaled = bbox.to_image(REFERENCE_FRAME, 360, 640);
        assert_eq!(scaled, BoundingBox::new(0.0, 0.0, 180.0, 320.0));
        assert_eq!(scaled.pixel_corners(), (0, 0, 180, 320));
    }

    #[test]
    fn rescale_leaves_source_untouched() {
        let bbox = BoundingBox::new(100.0, 200.0, 300.0, 400.0);
        let _ = bbox.to_image(REFERENCE_FRAME, 1080, 1920);
        assert_eq!(bbox, BoundingBox::new(100.0, 200.0, 300.0, 400.0));
    }

    #[test]
    fn rescale_preserves_ordering_and_bounds() {
        let sizes = [(1, 1), (360, 640), (1080, 1920), (1440, 2560), (3000, 200)];
        let boxes = [
            BoundingBox::new(0.0, 0.0, 1440.0, 2560.0),
            BoundingBox::new(0.0, 0.0, 0.0, 0.0),
            BoundingBox::new(12.0, 84.0, 1428.0, 240.0),
            BoundingBox::new(700.0, 1300.0, 701.0, 1301.0),
        ];
        for (w, h) in sizes {
            for bbox in &boxes {
                let s = bbox.to_image(REFERENCE_FRAME, w, h);
                assert!(0.0 <= s.x0 && s.x0 <= s.x1 && s.x1 <= f64::from(w), "{s:?}");
                assert!(0.0 <= s.y0 && s.y0 <= s.y1 && s.y1 <= f64::from(h), "{s:?}");
            }
        }
    }

    #[test]
    fn inverse_rescale_round_trips() {
        let bbox = BoundingBox::new(33.0, 77.0, 1201.0, 2499.0);
        for (w, h) in [(360, 640), (1079, 1917), (7, 3)] {
            let back = bbox
                .to_image(REFERENCE_FRAME, w, h)
                .to_reference(REFERENCE_FRAME, w, h);
            assert!(approx_eq(&back, &bbox), "{back:?} != {bbox:?}");
        }
    }

    #[test]
    fn deserializes_from_array() {
        let bbox: BoundingBox = serde_json::from_str("[1, 2, 3.5, 4]").unwrap();
        assert_eq!(bbox, BoundingBox::new(1.0, 2.0, 3.5, 4.0));
    }

    #[test]
    fn detects_inverted_boxes() {
        assert!(BoundingBox::new(10.0, 0.0, 5.0, 10.0).is_degenerate());
        assert!(BoundingBox::new(0.0, 10.0, 5.0, 0.0).is_degenerate());
        assert!(!BoundingBox::new(5.0, 5.0, 5.0, 5.0).is_degenerate());
    }
}
