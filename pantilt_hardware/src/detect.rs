//! Built-in detector: bounding box of the bright pixels in a frame.

use pantilt_traits::{BBox, Detection, Detector, Frame};

#[derive(Debug, Clone, Copy)]
pub struct BrightSpotDetector {
    /// Pixels strictly above this value count as target.
    pub threshold: u8,
    /// Fewer bright pixels than this is reported as "not found".
    pub min_pixels: usize,
}

impl Default for BrightSpotDetector {
    fn default() -> Self {
        Self {
            threshold: 200,
            min_pixels: 4,
        }
    }
}

impl Detector for BrightSpotDetector {
    fn detect(&mut self, frame: &Frame) -> Option<Detection> {
        let (mut x0, mut y0) = (usize::MAX, usize::MAX);
        let (mut x1, mut y1) = (0, 0);
        let mut count = 0usize;
        for (y, row) in frame.pixels().chunks(frame.width()).enumerate() {
            for (x, _) in row.iter().enumerate().filter(|&(_, &p)| p > self.threshold) {
                x0 = x0.min(x);
                x1 = x1.max(x);
                y0 = y0.min(y);
                y1 = y1.max(y);
                count += 1;
            }
        }
        if count < self.min_pixels.max(1) {
            return None;
        }
        let w = x1 - x0 + 1;
        let h = y1 - y0 + 1;
        #[allow(clippy::cast_precision_loss)]
        let confidence = count as f32 / (w * h) as f32;
        let px = |v: usize| i32::try_from(v).unwrap_or(i32::MAX);
        Some(Detection {
            bbox: BBox::new(px(x0), px(y0), px(w), px(h)),
            confidence,
        })
    }
}
