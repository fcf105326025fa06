//! facecard-core — Geometry, coordinate mapping and overlay state for face cards.
//!
//! Maps normalized face detections into screen space, matches classifier
//! output against a fixed identity roster, and keeps one overlay card per
//! recognized identity.

pub mod cards;
pub mod classifier;
pub mod detector;
pub mod geometry;
pub mod mapper;
pub mod roster;
pub mod types;

pub use cards::{BillboardAxes, Card, CardLayout, CardRegistry, FixedAdvance, Placement, TextMetrics};
pub use classifier::{Classifier, ClassifierError, ConfidenceGate, OnnxClassifier};
pub use detector::{Detector, DetectorError};
pub use roster::{Identity, LazyRoster, Roster, RosterError, RosterSource};
pub use types::{
    BoundingBox, Classification, DeviceOrientation, ImageOrientation, ScreenRect, Viewport,
};
