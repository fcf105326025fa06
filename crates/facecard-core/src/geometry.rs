//! Vector helpers for world-space positions.

use nalgebra as na;

/// Extract the translation column of a 4×4 world transform.
pub fn position_from_transform(transform: &na::Matrix4<f32>) -> na::Point3<f32> {
    na::Point3::new(transform[(0, 3)], transform[(1, 3)], transform[(2, 3)])
}

/// Arithmetic mean of a set of points. Returns `None` for an empty set.
pub fn centroid(points: &[na::Point3<f32>]) -> Option<na::Point3<f32>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(na::Vector3::zeros(), |acc, p| acc + p.coords);
    Some(na::Point3::from(sum / points.len() as f32))
}

/// Euclidean distance between two world positions.
pub fn distance(a: &na::Point3<f32>, b: &na::Point3<f32>) -> f32 {
    (a - b).norm()
}
