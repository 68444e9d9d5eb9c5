//! Explored circles to pixel-space reveal ellipses.

use serde::{Deserialize, Serialize};

use super::viewport::{PixelPoint, PixelRect, Viewport};
use crate::region::ExploredCircle;

/// One filled ellipse to punch out of the fog layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevealEllipse {
    /// Region the ellipse was derived from.
    pub region_id: Option<i64>,
    pub center: PixelPoint,
    pub radius_x: f64,
    pub radius_y: f64,
}

impl RevealEllipse {
    /// Rectangle the ellipse is inscribed in, as drawing APIs expect.
    pub fn bounding_rect(&self) -> PixelRect {
        PixelRect {
            x: self.center.x - self.radius_x,
            y: self.center.y - self.radius_y,
            width: self.radius_x * 2.0,
            height: self.radius_y * 2.0,
        }
    }
}

/// Project one circle into the viewport.
///
/// Mercator is conformal, so a small ground circle stays a circle on the
/// map and both radii are equal.
#[inline]
pub fn project_circle(circle: &ExploredCircle, viewport: &Viewport) -> RevealEllipse {
    let center = viewport.geo_to_pixel(circle.latitude, circle.longitude);
    let radius = viewport.meters_to_pixels(circle.radius_m, circle.latitude);
    RevealEllipse {
        region_id: circle.region_id,
        center,
        radius_x: radius,
        radius_y: radius,
    }
}

/// Project every circle, one ellipse per circle, in input order.
///
/// Pure function of its inputs; safe to call on every pan or zoom.
pub fn project(circles: &[ExploredCircle], viewport: &Viewport) -> Vec<RevealEllipse> {
    circles
        .iter()
        .map(|circle| project_circle(circle, viewport))
        .collect()
}

/// Like [`project`], but drops ellipses entirely outside the viewport.
pub fn project_visible(circles: &[ExploredCircle], viewport: &Viewport) -> Vec<RevealEllipse> {
    let visible = viewport.pixel_rect();
    circles
        .iter()
        .map(|circle| project_circle(circle, viewport))
        .filter(|ellipse| ellipse.bounding_rect().intersects(&visible))
        .collect()
}
