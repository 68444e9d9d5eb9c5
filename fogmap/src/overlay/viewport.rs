//! Viewport description and geographic-to-pixel mapping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{self, ProjectedPoint};
use crate::region::GeoBounds;

/// Errors building a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum OverlayError {
    #[error("Viewport scale must be positive and finite, got {0}")]
    InvalidScale(f64),

    #[error("Viewport size must be positive, got {width}x{height}")]
    InvalidSize { width: f64, height: f64 },

    #[error("Viewport bounds are empty or inverted")]
    InvalidBounds,
}

/// A point in viewport pixel space (origin top-left, y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// An axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    /// Whether two rectangles overlap (touching edges count).
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x <= other.x + other.width
            && other.x <= self.x + self.width
            && self.y <= other.y + other.height
            && other.y <= self.y + self.height
    }
}

/// The visible map area and its projection to pixels.
///
/// `projected_origin` is the Web Mercator position of the top-left pixel
/// and `scale` is projected meters per pixel at the current zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: GeoBounds,
    pub projected_origin: ProjectedPoint,
    pub scale: f64,
}

impl Viewport {
    /// Create a viewport from a host-supplied descriptor.
    pub fn new(
        bounds: GeoBounds,
        projected_origin: ProjectedPoint,
        scale: f64,
    ) -> Result<Self, OverlayError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(OverlayError::InvalidScale(scale));
        }
        Ok(Self {
            bounds,
            projected_origin,
            scale,
        })
    }

    /// Fit a geographic rectangle into a pixel area.
    ///
    /// The scale is chosen so the whole rectangle is visible; the axis
    /// with spare room extends past the bounds to the right or bottom.
    pub fn fit(bounds: GeoBounds, width_px: f64, height_px: f64) -> Result<Self, OverlayError> {
        if !(width_px > 0.0 && height_px > 0.0) {
            return Err(OverlayError::InvalidSize {
                width: width_px,
                height: height_px,
            });
        }
        if !(bounds.max_lat > bounds.min_lat && bounds.max_lon > bounds.min_lon) {
            return Err(OverlayError::InvalidBounds);
        }

        let top_left = coord::to_web_mercator(bounds.max_lat, bounds.min_lon);
        let bottom_right = coord::to_web_mercator(bounds.min_lat, bounds.max_lon);

        let scale_x = (bottom_right.x - top_left.x) / width_px;
        let scale_y = (top_left.y - bottom_right.y) / height_px;

        Self::new(bounds, top_left, scale_x.max(scale_y))
    }

    /// Projected point to pixel coordinates.
    #[inline]
    pub fn projected_to_pixel(&self, point: ProjectedPoint) -> PixelPoint {
        PixelPoint {
            x: (point.x - self.projected_origin.x) / self.scale,
            y: (self.projected_origin.y - point.y) / self.scale,
        }
    }

    /// Geographic coordinate to pixel coordinates.
    #[inline]
    pub fn geo_to_pixel(&self, lat: f64, lon: f64) -> PixelPoint {
        self.projected_to_pixel(coord::to_web_mercator(lat, lon))
    }

    /// Ground distance at a latitude expressed in pixels.
    ///
    /// Uses the latitude of the thing being drawn, since Mercator scale
    /// varies across the viewport.
    #[inline]
    pub fn meters_to_pixels(&self, meters: f64, lat: f64) -> f64 {
        meters * coord::mercator_scale_factor(lat) / self.scale
    }

    /// Pixel rectangle covered by the geographic bounds.
    pub fn pixel_rect(&self) -> PixelRect {
        let top_left = self.geo_to_pixel(self.bounds.max_lat, self.bounds.min_lon);
        let bottom_right = self.geo_to_pixel(self.bounds.min_lat, self.bounds.max_lon);
        PixelRect {
            x: top_left.x,
            y: top_left.y,
            width: bottom_right.x - top_left.x,
            height: bottom_right.y - top_left.y,
        }
    }
}
