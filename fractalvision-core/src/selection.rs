/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Center pixel, rounded down.
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A drag selection used to zoom into a region.
///
/// The two corners may be given in any order; [`rect`](Self::rect)
/// normalizes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoomRectangle {
    pub start: (u32, u32),
    pub end: (u32, u32),
    pub selecting: bool,
}

impl ZoomRectangle {
    /// Selections this small or smaller on either side are treated as clicks.
    pub const MIN_SIDE: u32 = 5;

    pub fn begin(&mut self, point: (u32, u32)) {
        self.start = point;
        self.end = point;
        self.selecting = true;
    }

    pub fn update(&mut self, point: (u32, u32)) {
        self.end = point;
    }

    pub fn finish(&mut self, point: (u32, u32)) {
        self.end = point;
        self.selecting = false;
    }

    pub fn rect(&self) -> PixelRect {
        PixelRect {
            x: self.start.0.min(self.end.0),
            y: self.start.1.min(self.end.1),
            width: self.start.0.abs_diff(self.end.0),
            height: self.start.1.abs_diff(self.end.1),
        }
    }

    pub fn is_valid(&self) -> bool {
        let r = self.rect();
        r.width > Self::MIN_SIDE && r.height > Self::MIN_SIDE
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
