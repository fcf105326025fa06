//! Face detector contract.
//!
//! Detection itself is provided by the host platform (or a model runtime);
//! the pipeline only needs the most prominent face in a frame.

use crate::types::{BoundingBox, ImageOrientation};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detection failed: {0}")]
    DetectionFailed(String),
}

/// Locates a face in a captured frame.
pub trait Detector: Send {
    /// Detect the most prominent face.
    ///
    /// `orientation` is the rotation that presents `image` upright. Returns
    /// `Ok(None)` when the frame contains no face.
    fn detect(
        &mut self,
        image: &RgbImage,
        orientation: ImageOrientation,
    ) -> Result<Option<BoundingBox>, DetectorError>;
}
