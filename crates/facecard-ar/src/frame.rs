//! Frames delivered by the tracking session.

use facecard_core::{DeviceOrientation, Viewport};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// World-tracking quality at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    Normal,
    /// Tracking has not converged yet (initializing, relocalizing,
    /// excessive motion, too few features).
    Limited,
    NotAvailable,
}

/// A captured camera frame.
#[derive(Clone)]
pub struct Frame {
    pub image: Arc<RgbImage>,
    pub tracking: TrackingState,
    pub orientation: DeviceOrientation,
    /// Screen bounds of the AR view when the frame was captured.
    pub viewport: Viewport,
}

impl Frame {
    pub fn is_tracking_normal(&self) -> bool {
        self.tracking == TrackingState::Normal
    }
}
