//! Recorded AR sessions.
//!
//! A recording captures, per frame, what the platform reported: tracking
//! quality, device orientation, the detector's face box, the classifier's
//! ranked labels and the hit-test batches returned while sampling.

use anyhow::{Context, Result};
use facecard_ar::{Frame, HitResult, TrackingState};
use facecard_core::{BoundingBox, Classification, DeviceOrientation, Viewport};
use image::RgbImage;
use nalgebra as na;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct Recording {
    pub viewport: Viewport,
    pub frames: Vec<RecordedFrame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedFrame {
    pub tracking: TrackingState,
    #[serde(default)]
    pub orientation: DeviceOrientation,
    /// Captured image, relative to the recording file.
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub face: Option<BoundingBox>,
    #[serde(default)]
    pub classifications: Vec<Classification>,
    /// One batch per hit-test call.
    #[serde(default)]
    pub hits: Vec<Vec<RecordedHit>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RecordedHit {
    pub position: [f32; 3],
    pub distance: f32,
}

impl From<RecordedHit> for HitResult {
    fn from(hit: RecordedHit) -> Self {
        let [x, y, z] = hit.position;
        HitResult::at(na::Point3::new(x, y, z), hit.distance)
    }
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recording {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid recording")
    }
}

impl RecordedFrame {
    /// Build the live frame, loading the captured image if one was recorded.
    pub fn to_frame(&self, viewport: Viewport, base_dir: &Path) -> Result<Frame> {
        let image = match &self.image {
            Some(path) => {
                let path = base_dir.join(path);
                image::open(&path)
                    .with_context(|| format!("failed to open frame image {}", path.display()))?
                    .to_rgb8()
            }
            None => RgbImage::new(1, 1),
        };

        Ok(Frame {
            image: Arc::new(image),
            tracking: self.tracking,
            orientation: self.orientation,
            viewport,
        })
    }
}
