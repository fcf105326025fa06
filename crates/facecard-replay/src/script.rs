//! Collaborators that answer from the recording instead of the platform.

use crate::recording::RecordedFrame;
use facecard_ar::{HitResult, WorldTracker};
use facecard_core::{
    BoundingBox, Classification, Classifier, ClassifierError, Detector, DetectorError,
    ImageOrientation,
};
use image::RgbImage;
use nalgebra as na;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
struct Current {
    face: Option<BoundingBox>,
    classifications: Vec<Classification>,
    hits: VecDeque<Vec<HitResult>>,
}

/// The recorded answers for the frame currently in flight.
#[derive(Clone, Default)]
pub struct Script {
    current: Arc<Mutex<Current>>,
}

impl Script {
    pub fn load(&self, frame: &RecordedFrame) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = Current {
            face: frame.face,
            classifications: frame.classifications.clone(),
            hits: frame
                .hits
                .iter()
                .map(|batch| batch.iter().copied().map(HitResult::from).collect())
                .collect(),
        };
    }

    fn with<T>(&self, f: impl FnOnce(&mut Current) -> T) -> T {
        f(&mut self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

pub struct ScriptedDetector(pub Script);

impl Detector for ScriptedDetector {
    fn detect(
        &mut self,
        _image: &RgbImage,
        _orientation: ImageOrientation,
    ) -> Result<Option<BoundingBox>, DetectorError> {
        Ok(self.0.with(|c| c.face))
    }
}

pub struct ScriptedClassifier(pub Script);

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, _image: &RgbImage) -> Result<Vec<Classification>, ClassifierError> {
        Ok(self.0.with(|c| c.classifications.clone()))
    }
}

/// Returns the recorded batches in order, then nothing.
pub struct ScriptedTracker(pub Script);

impl WorldTracker for ScriptedTracker {
    fn hit_test(&self, _point: na::Point2<f32>) -> Vec<HitResult> {
        self.0.with(|c| c.hits.pop_front().unwrap_or_default())
    }
}
