//! facecard-ar — Tracking-session abstraction for the face card pipeline.
//!
//! Models the frames delivered by the platform AR session, its hit-test
//! query, and the sampling loop that turns a screen point into a stable
//! world position.

pub mod frame;
pub mod resolver;
pub mod tracker;

pub use frame::{Frame, TrackingState};
pub use resolver::WorldPositionResolver;
pub use tracker::{HitResult, WorldTracker};
