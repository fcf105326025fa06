use nalgebra as na;

/// One intersection of a hit-test ray with the tracked environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub world_transform: na::Matrix4<f32>,
    /// Distance from the camera, in meters.
    pub distance: f32,
}

impl HitResult {
    pub fn at(position: na::Point3<f32>, distance: f32) -> Self {
        Self {
            world_transform: na::Matrix4::new_translation(&position.coords),
            distance,
        }
    }
}

/// World queries answered by the tracking session.
pub trait WorldTracker: Send + Sync {
    /// Cast a ray from `point` (screen pixels) against tracked feature
    /// points. Results may be in any order.
    fn hit_test(&self, point: na::Point2<f32>) -> Vec<HitResult>;
}
