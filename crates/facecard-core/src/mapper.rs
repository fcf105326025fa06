//! Detector space → screen space mapping.
//!
//! The detector reports boxes relative to the upright image, which is always
//! captured in a fixed sensor orientation. Size and origin therefore depend
//! on how the device is held when the frame was captured.

use crate::types::{BoundingBox, DeviceOrientation, ScreenRect, Viewport};

/// Transform a normalized detector box into screen pixels.
pub fn to_screen(
    bbox: &BoundingBox,
    orientation: DeviceOrientation,
    viewport: Viewport,
) -> ScreenRect {
    let (w, h) = (viewport.width, viewport.height);

    // Landscape boxes are scaled by the swapped screen dimensions.
    let (width, height) = if orientation.is_landscape() {
        (bbox.width * h, bbox.height * w)
    } else {
        (bbox.width * w, bbox.height * h)
    };

    let (x, y) = match orientation {
        DeviceOrientation::LandscapeLeft => (bbox.min_y() * w, bbox.min_x() * h),
        DeviceOrientation::LandscapeRight => ((1.0 - bbox.max_y()) * w, (1.0 - bbox.max_x()) * h),
        DeviceOrientation::PortraitUpsideDown => ((1.0 - bbox.max_x()) * w, bbox.min_y() * h),
        DeviceOrientation::Portrait
        | DeviceOrientation::FaceUp
        | DeviceOrientation::FaceDown
        | DeviceOrientation::Unknown => (bbox.min_x() * w, (1.0 - bbox.max_y()) * h),
    };

    ScreenRect { x, y, width, height }
}
