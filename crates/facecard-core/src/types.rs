use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Face bounding box in normalized detector space (0..1 on both axes,
/// origin at the lower-left corner of the upright image).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }
}

/// A rectangle in device screen pixels (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    /// Center of the rectangle; the point fed to hit-testing.
    pub fn mid(&self) -> na::Point2<f32> {
        na::Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Screen bounds of the AR view at capture time, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Physical device orientation reported alongside each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

impl DeviceOrientation {
    pub fn is_landscape(self) -> bool {
        matches!(self, Self::LandscapeLeft | Self::LandscapeRight)
    }

    /// Rotation that presents the captured buffer upright to the detector.
    ///
    /// The camera sensor always delivers buffers in the same physical
    /// orientation, so this depends only on how the device is held.
    pub fn image_orientation(self) -> ImageOrientation {
        match self {
            Self::LandscapeLeft => ImageOrientation::Up,
            Self::LandscapeRight => ImageOrientation::Down,
            Self::PortraitUpsideDown => ImageOrientation::Left,
            _ => ImageOrientation::Right,
        }
    }
}

/// EXIF-style orientation of an image buffer handed to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrientation {
    Up,
    Down,
    Left,
    Right,
}

/// One classifier result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}
