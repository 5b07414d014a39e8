//! Clamp a detection into the frame, find its center, and smooth it.

use pantilt_traits::{BBox, Detection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One frame's detection, clamped to the frame. Not retained across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackResult {
    pub bbox: Option<BBox>,
    pub center_raw: Option<Point>,
}

impl TrackResult {
    pub const LOST: Self = Self {
        bbox: None,
        center_raw: None,
    };

    pub fn from_detection(detection: Option<&Detection>, width: usize, height: usize) -> Self {
        detection.map_or(Self::LOST, |d| {
            let bbox = clamp_bbox(d.bbox, width, height);
            Self {
                bbox: Some(bbox),
                center_raw: Some(center_of(&bbox)),
            }
        })
    }

    pub const fn found(&self) -> bool {
        self.center_raw.is_some()
    }
}

fn to_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Clamp `x,y` into `[0, dim-1]` and shrink `w,h` so the box stays inside
/// the frame. Extents are at least one pixel.
pub fn clamp_bbox(b: BBox, width: usize, height: usize) -> BBox {
    let (fw, fh) = (to_i32(width).max(1), to_i32(height).max(1));
    let x = b.x.clamp(0, fw - 1);
    let y = b.y.clamp(0, fh - 1);
    BBox::new(x, y, b.w.clamp(1, fw - x), b.h.clamp(1, fh - y))
}

/// Floor-division center of a box.
pub const fn center_of(b: &BBox) -> Point {
    Point::new(b.x + b.w / 2, b.y + b.h / 2)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmoothingState {
    pub prev_center: Option<Point>,
}

impl SmoothingState {
    pub fn reset(&mut self) {
        self.prev_center = None;
    }
}

fn blend(alpha: f32, raw: i32, prev: i32) -> i32 {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let v = alpha.mul_add(raw as f32, (1.0 - alpha) * prev as f32) as i32;
    v
}

/// Advance the smoother by one result.
///
/// Loss clears the history and yields `None`. The first center after a loss
/// is passed through unchanged; later ones are blended with weight `alpha`
/// on the newest sample and truncated toward zero.
pub fn smooth(result: &TrackResult, state: &mut SmoothingState, alpha: f32) -> Option<Point> {
    let Some(raw) = result.center_raw else {
        state.reset();
        return None;
    };
    let smoothed = match state.prev_center {
        None => raw,
        Some(prev) => Point::new(blend(alpha, raw.x, prev.x), blend(alpha, raw.y, prev.y)),
    };
    state.prev_center = Some(smoothed);
    Some(smoothed)
}
