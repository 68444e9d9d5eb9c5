//! Overlay Projector
//!
//! Converts explored circles into pixel-space ellipses for the rendering
//! host, which draws them as transparent holes in an opaque fog layer.
//!
//! # Projection
//!
//! ```text
//! (lat, lon) ──► Web Mercator meters ──► pixels
//!                 to_web_mercator        (p - origin) / scale, y flipped
//!
//! radius_m ──► radius_m / cos(circle_lat) / scale
//! ```
//!
//! Projection is a pure function of the circles and the viewport. No state
//! is carried between frames apart from the optional [`OverlayFrameCache`].

mod frame;
mod projector;
mod viewport;

pub use frame::OverlayFrameCache;
pub use projector::{project, project_circle, project_visible, RevealEllipse};
pub use viewport::{OverlayError, PixelPoint, PixelRect, Viewport};
