//! Screen point → world position via repeated hit-testing.
//!
//! A single hit-test near the edge of a face is noisy, so several samples
//! are taken a few milliseconds apart (letting the session refine its
//! feature points in between) and averaged.

use crate::tracker::{HitResult, WorldTracker};
use facecard_core::geometry;
use nalgebra as na;
use std::time::Duration;

// --- Named constants ---
const DEFAULT_SAMPLES: usize = 3;
const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(12);
const DEFAULT_MIN_HIT_DISTANCE: f32 = 0.10;

#[derive(Debug, Clone, Copy)]
pub struct WorldPositionResolver {
    samples: usize,
    interval: Duration,
    min_distance: f32,
}

impl WorldPositionResolver {
    pub fn new(samples: usize, interval: Duration, min_distance: f32) -> Self {
        Self {
            samples,
            interval,
            min_distance,
        }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Average the accepted samples for `point`.
    ///
    /// Blocks the calling thread for `samples * interval`. Returns
    /// `None` if no sample produced a hit beyond the minimum distance.
    pub fn resolve(
        &self,
        tracker: &dyn WorldTracker,
        point: na::Point2<f32>,
    ) -> Option<na::Point3<f32>> {
        let mut accepted = Vec::with_capacity(self.samples);

        for _ in 0..self.samples {
            if let Some(hit) = self.closest_hit(tracker.hit_test(point)) {
                accepted.push(geometry::position_from_transform(&hit.world_transform));
            }
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }

        let center = geometry::centroid(&accepted)?;
        let spread = accepted
            .iter()
            .map(|p| geometry::distance(p, &center))
            .fold(0.0f32, f32::max);
        tracing::debug!(
            accepted = accepted.len(),
            samples = self.samples,
            spread,
            "world position resolved"
        );
        Some(center)
    }

    /// Nearest hit beyond the minimum distance; closer hits are treated as
    /// degenerate hits on the camera's own near field.
    fn closest_hit(&self, hits: Vec<HitResult>) -> Option<HitResult> {
        hits.into_iter()
            .filter(|h| h.distance > self.min_distance)
            .min_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

impl Default for WorldPositionResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLES, DEFAULT_SAMPLE_INTERVAL, DEFAULT_MIN_HIT_DISTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns one scripted batch of hits per call.
    struct ScriptedTracker {
        batches: Mutex<VecDeque<Vec<HitResult>>>,
        calls: Mutex<Vec<na::Point2<f32>>>,
    }

    impl ScriptedTracker {
        fn new(batches: Vec<Vec<HitResult>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl WorldTracker for ScriptedTracker {
        fn hit_test(&self, point: na::Point2<f32>) -> Vec<HitResult> {
            self.calls.lock().unwrap().push(point);
            self.batches.lock().unwrap().pop_front().unwrap_or_default()
        }
    }

    fn fast() -> WorldPositionResolver {
        WorldPositionResolver::new(3, Duration::ZERO, 0.10)
    }

    fn hit(x: f32, y: f32, z: f32, distance: f32) -> HitResult {
        HitResult::at(na::Point3::new(x, y, z), distance)
    }

    #[test]
    fn test_averages_accepted_samples() {
        let tracker = ScriptedTracker::new(vec![
            vec![hit(9.0, 9.0, 9.0, 0.05)],
            vec![hit(1.0, 0.0, -1.0, 0.20)],
            vec![hit(3.0, 2.0, -3.0, 0.30)],
        ]);
        let p = fast().resolve(&tracker, na::Point2::new(100.0, 200.0)).unwrap();
        assert!((p - na::Point3::new(2.0, 1.0, -2.0)).norm() < 1e-6);
        assert_eq!(tracker.calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_all_samples_rejected() {
        let tracker = ScriptedTracker::new(vec![
            vec![hit(1.0, 1.0, 1.0, 0.05)],
            vec![hit(1.0, 1.0, 1.0, 0.05)],
            vec![hit(1.0, 1.0, 1.0, 0.05)],
        ]);
        assert!(fast().resolve(&tracker, na::Point2::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_no_hits_at_all() {
        let tracker = ScriptedTracker::new(vec![]);
        assert!(fast().resolve(&tracker, na::Point2::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_min_distance_is_exclusive() {
        let tracker = ScriptedTracker::new(vec![vec![hit(1.0, 1.0, 1.0, 0.10)]]);
        let resolver = WorldPositionResolver::new(1, Duration::ZERO, 0.10);
        assert!(resolver.resolve(&tracker, na::Point2::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_picks_closest_surviving_hit() {
        let tracker = ScriptedTracker::new(vec![vec![
            hit(5.0, 5.0, 5.0, 0.90),
            hit(0.0, 0.0, 0.0, 0.02),
            hit(1.0, 2.0, 3.0, 0.40),
        ]]);
        let resolver = WorldPositionResolver::new(1, Duration::ZERO, 0.10);
        let p = resolver.resolve(&tracker, na::Point2::new(0.0, 0.0)).unwrap();
        assert_eq!(p, na::Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_samples_same_screen_point() {
        let tracker = ScriptedTracker::new(vec![]);
        let point = na::Point2::new(12.5, 40.0);
        fast().resolve(&tracker, point);
        assert!(tracker.calls.lock().unwrap().iter().all(|&p| p == point));
    }

    #[test]
    fn test_sample_interval_blocks() {
        let tracker = ScriptedTracker::new(vec![]);
        let resolver = WorldPositionResolver::new(3, Duration::from_millis(5), 0.10);
        let start = std::time::Instant::now();
        resolver.resolve(&tracker, na::Point2::new(0.0, 0.0));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
