//! Coordinate spaces of the drawing surface.
//!
//! Three spaces are involved:
//!
//! - **viewport** (client) coordinates, as delivered by input events;
//! - **logical** coordinates, CSS pixels from the surface's top-left corner,
//!   used by every drawing operation;
//! - **physical** coordinates, backing-buffer pixels (`logical × dpr`).
//!
//! The element may be rendered at a different size than its logical size
//! (CSS scaling), so viewport → logical mapping goes through the element's
//! rendered rectangle.

use serde::{Deserialize, Serialize};

/// A point in logical (CSS pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LogicalPoint {
    /// Horizontal offset from the left edge.
    pub x: f32,
    /// Vertical offset from the top edge.
    pub y: f32,
}

impl LogicalPoint {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Size in logical (CSS pixel) units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LogicalSize {
    /// Width in CSS pixels.
    pub width: f32,
    /// Height in CSS pixels.
    pub height: f32,
}

impl LogicalSize {
    /// Create a size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Square size, the usual shape of the practice box.
    #[must_use]
    pub const fn square(side: f32) -> Self {
        Self::new(side, side)
    }

    /// True if either dimension is zero, negative or not finite.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> LogicalPoint {
        LogicalPoint::new(self.width / 2.0, self.height / 2.0)
    }
}

/// The element's rendered rectangle in viewport coordinates
/// (what a browser reports from `getBoundingClientRect`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementRect {
    /// Left edge in viewport coordinates.
    pub left: f32,
    /// Top edge in viewport coordinates.
    pub top: f32,
    /// Rendered width.
    pub width: f32,
    /// Rendered height.
    pub height: f32,
}

impl ElementRect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle at the viewport origin with the given rendered size.
    #[must_use]
    pub const fn at_origin(size: LogicalSize) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    /// Map a viewport position into the surface's logical space.
    ///
    /// Accounts for CSS scaling between the rendered size and the logical
    /// drawing size. A degenerate rendered dimension maps 1:1.
    #[must_use]
    pub fn to_logical(&self, client_x: f32, client_y: f32, logical: LogicalSize) -> LogicalPoint {
        let (sx, sy) = self.scale_to(logical);
        LogicalPoint::new((client_x - self.left) * sx, (client_y - self.top) * sy)
    }

    /// Inverse of [`ElementRect::to_logical`].
    #[must_use]
    pub fn to_client(&self, point: LogicalPoint, logical: LogicalSize) -> (f32, f32) {
        let (sx, sy) = self.scale_to(logical);
        (point.x / sx + self.left, point.y / sy + self.top)
    }

    fn scale_to(&self, logical: LogicalSize) -> (f32, f32) {
        let sx = if self.width > 0.0 && logical.width > 0.0 {
            logical.width / self.width
        } else {
            1.0
        };
        let sy = if self.height > 0.0 && logical.height > 0.0 {
            logical.height / self.height
        } else {
            1.0
        };
        (sx, sy)
    }
}

/// Logical size plus device pixel ratio: everything needed to size the
/// backing buffers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMetrics {
    /// Logical size in CSS pixels.
    pub size: LogicalSize,
    /// Physical pixels per CSS pixel.
    pub device_pixel_ratio: f32,
}

impl SurfaceMetrics {
    /// Create metrics. A missing or invalid pixel ratio falls back to 1.
    #[must_use]
    pub fn new(size: LogicalSize, device_pixel_ratio: f32) -> Self {
        let device_pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            size,
            device_pixel_ratio,
        }
    }

    /// Backing buffer size in physical pixels (at least 1×1).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn physical_size(&self) -> (u32, u32) {
        let w = (self.size.width * self.device_pixel_ratio).round().max(1.0) as u32;
        let h = (self.size.height * self.device_pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }

    /// Physical position of a logical point.
    #[must_use]
    pub fn to_physical(&self, point: LogicalPoint) -> (f32, f32) {
        (
            point.x * self.device_pixel_ratio,
            point.y * self.device_pixel_ratio,
        )
    }
}

impl Default for SurfaceMetrics {
    fn default() -> Self {
        Self::new(LogicalSize::square(300.0), 1.0)
    }
}
