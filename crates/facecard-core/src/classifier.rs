//! Face classification: the classifier contract, the confidence gate applied
//! to its output, and an ONNX Runtime implementation.

use crate::types::Classification;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const CLASSIFIER_INPUT_SIZE: u32 = 224;
const CLASSIFIER_MEAN: f32 = 127.5;
const CLASSIFIER_STD: f32 = 127.5;
const PROBABILITY_SUM_TOLERANCE: f32 = 1e-3;

/// Default minimum confidence for accepting a classification.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.35;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0} — export the identity classifier to ONNX and place it there")]
    ModelNotFound(String),
    #[error("failed to read labels {path}: {source}")]
    Labels {
        path: String,
        source: std::io::Error,
    },
    #[error("no labels configured for model {0}")]
    LabelsMissing(String),
    #[error("model has {outputs} outputs but {labels} labels were provided")]
    LabelMismatch { labels: usize, outputs: usize },
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Assigns identity labels to a frame containing a face.
pub trait Classifier: Send {
    /// Classify the frame, returning results ranked by descending confidence.
    fn classify(&mut self, image: &RgbImage) -> Result<Vec<Classification>, ClassifierError>;
}

/// Minimum-confidence filter for classifier output.
///
/// The boundary is strict: a result whose confidence equals the threshold
/// is rejected.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn accepts(&self, result: &Classification) -> bool {
        result.confidence > self.threshold
    }

    /// First result, in ranked order, that clears the threshold.
    pub fn select<'a>(&self, results: &'a [Classification]) -> Option<&'a Classification> {
        results.iter().find(|r| self.accepts(r))
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

/// Image classifier backed by an ONNX model with one output per identity.
pub struct OnnxClassifier {
    session: Session,
    labels: Vec<String>,
}

impl OnnxClassifier {
    /// Load the classifier model. `labels[i]` names output `i`.
    pub fn load(model_path: &str, labels: Vec<String>) -> Result<Self, ClassifierError> {
        if !Path::new(model_path).exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            labels = labels.len(),
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded identity classifier"
        );

        Ok(Self { session, labels })
    }

    /// Read a newline-separated labels file, skipping blank lines.
    pub fn load_labels(path: &Path) -> Result<Vec<String>, ClassifierError> {
        let text = std::fs::read_to_string(path).map_err(|source| ClassifierError::Labels {
            path: path.display().to_string(),
            source,
        })?;
        Ok(parse_labels(&text))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Center-crop to a square, resize to the model input, and normalize
    /// into an NCHW float tensor.
    fn preprocess(image: &RgbImage) -> Array4<f32> {
        let side = image.width().min(image.height());
        let left = (image.width() - side) / 2;
        let top = (image.height() - side) / 2;
        let cropped = imageops::crop_imm(image, left, top, side, side).to_image();
        let resized = imageops::resize(
            &cropped,
            CLASSIFIER_INPUT_SIZE,
            CLASSIFIER_INPUT_SIZE,
            FilterType::Triangle,
        );

        let size = CLASSIFIER_INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 - CLASSIFIER_MEAN) / CLASSIFIER_STD;
            }
        }
        tensor
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&mut self, image: &RgbImage) -> Result<Vec<Classification>, ClassifierError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ClassifierError::InferenceFailed("empty frame".into()));
        }

        let input = Self::preprocess(image);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(format!("score extraction: {e}")))?;

        if raw.len() != self.labels.len() {
            return Err(ClassifierError::LabelMismatch {
                labels: self.labels.len(),
                outputs: raw.len(),
            });
        }

        Ok(rank(&self.labels, &to_probabilities(raw)))
    }
}

fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Pass through outputs that already form a distribution; softmax anything else.
fn to_probabilities(raw: &[f32]) -> Vec<f32> {
    let in_range = raw.iter().all(|v| (0.0..=1.0).contains(v));
    let sum: f32 = raw.iter().sum();
    if in_range && (sum - 1.0).abs() < PROBABILITY_SUM_TOLERANCE {
        return raw.to_vec();
    }

    let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = raw.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

fn rank(labels: &[String], probabilities: &[f32]) -> Vec<Classification> {
    let mut ranked: Vec<Classification> = labels
        .iter()
        .zip(probabilities)
        .map(|(label, &p)| Classification::new(label.clone(), p))
        .collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}
