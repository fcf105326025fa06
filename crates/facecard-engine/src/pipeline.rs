use crate::config::Config;
use crate::events::StateChange;
use facecard_ar::{Frame, WorldPositionResolver, WorldTracker};
use facecard_core::{
    mapper, Classification, Classifier, ConfidenceGate, Detector, DeviceOrientation, Identity,
    LazyRoster, RosterSource, Viewport,
};
use image::RgbImage;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;

/// The frame slot already limits the pipeline to one cycle at a time.
const REQUEST_QUEUE_DEPTH: usize = 1;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn vision worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Receiving end of the pipeline's change stream, drained on the render thread.
pub type ChangeReceiver = mpsc::UnboundedReceiver<StateChange>;

/// Result of offering a frame to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// A previous frame is still being processed.
    Busy,
    /// World tracking has not converged for this frame.
    TrackingNotNormal,
    /// The vision worker has exited.
    Closed,
}

type SlotState = Arc<Mutex<Option<Arc<RgbImage>>>>;

/// Holds the one frame buffer currently in flight.
#[derive(Clone, Default)]
pub(crate) struct FrameSlot {
    current: SlotState,
}

impl FrameSlot {
    pub(crate) fn try_claim(&self, image: Arc<RgbImage>) -> Option<FrameLease> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_some() {
            return None;
        }
        *current = Some(Arc::clone(&image));
        Some(FrameLease {
            slot: Arc::clone(&self.current),
            image,
        })
    }

    pub(crate) fn current(&self) -> Option<Arc<RgbImage>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Claim on the frame slot. Dropping it frees the slot, so the next frame
/// is admitted however the cycle ends.
pub(crate) struct FrameLease {
    slot: SlotState,
    image: Arc<RgbImage>,
}

impl FrameLease {
    pub(crate) fn image(&self) -> &RgbImage {
        &self.image
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// One admitted frame, sent to the vision worker.
pub(crate) struct VisionRequest {
    lease: FrameLease,
    orientation: DeviceOrientation,
    viewport: Viewport,
}

/// External collaborators the pipeline drives.
pub struct Collaborators {
    pub detector: Box<dyn Detector>,
    pub classifier: Box<dyn Classifier>,
    pub tracker: Arc<dyn WorldTracker>,
    pub roster: RosterSource,
}

/// Clone-safe handle used by the frame-delivery thread.
#[derive(Clone)]
pub struct PipelineHandle {
    tx: mpsc::Sender<VisionRequest>,
    slot: FrameSlot,
}

impl PipelineHandle {
    /// Offer a frame. Never blocks: the frame is either handed to the vision
    /// worker or dropped.
    pub fn on_frame(&self, frame: Frame) -> Admission {
        if !frame.is_tracking_normal() {
            tracing::trace!(tracking = ?frame.tracking, "frame skipped: tracking not normal");
            return Admission::TrackingNotNormal;
        }

        let Some(lease) = self.slot.try_claim(frame.image) else {
            tracing::trace!("frame skipped: previous frame in flight");
            return Admission::Busy;
        };

        let request = VisionRequest {
            lease,
            orientation: frame.orientation,
            viewport: frame.viewport,
        };
        match self.tx.try_send(request) {
            Ok(()) => Admission::Admitted,
            Err(mpsc::error::TrySendError::Full(_)) => Admission::Busy,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("vision worker has exited; frame dropped");
                Admission::Closed
            }
        }
    }

    /// Whether a frame is currently being processed.
    pub fn is_busy(&self) -> bool {
        self.slot.current().is_some()
    }

    /// The frame buffer currently being processed, if any.
    pub fn in_flight(&self) -> Option<Arc<RgbImage>> {
        self.slot.current()
    }
}

/// Spawn the vision worker on a dedicated OS thread.
///
/// The worker runs one detection cycle per admitted frame and publishes
/// state changes on the returned receiver. It exits once every
/// [`PipelineHandle`] has been dropped.
pub fn spawn_pipeline(
    collaborators: Collaborators,
    config: &Config,
) -> Result<(PipelineHandle, ChangeReceiver), EngineError> {
    let (changes_tx, changes_rx) = mpsc::unbounded_channel();
    let mut worker = VisionWorker::new(collaborators, config, changes_tx);
    let (tx, mut rx) = mpsc::channel::<VisionRequest>(REQUEST_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("facecard-vision".into())
        .spawn(move || {
            tracing::info!("vision worker started");
            while let Some(request) = rx.blocking_recv() {
                worker.run_cycle(request);
            }
            tracing::info!("vision worker exiting");
        })?;

    tracing::info!(
        confidence_threshold = config.confidence_threshold,
        hit_samples = config.hit_samples,
        hit_interval_ms = config.hit_interval_ms,
        "detection pipeline started"
    );

    Ok((
        PipelineHandle {
            tx,
            slot: FrameSlot::default(),
        },
        changes_rx,
    ))
}

/// State owned by the vision thread.
pub(crate) struct VisionWorker {
    detector: Box<dyn Detector>,
    classifier: Box<dyn Classifier>,
    tracker: Arc<dyn WorldTracker>,
    resolver: WorldPositionResolver,
    gate: ConfidenceGate,
    roster: LazyRoster,
    /// Most recent accepted identity; survives across cycles.
    pending: Option<Identity>,
    changes: mpsc::UnboundedSender<StateChange>,
}

impl VisionWorker {
    pub(crate) fn new(
        collaborators: Collaborators,
        config: &Config,
        changes: mpsc::UnboundedSender<StateChange>,
    ) -> Self {
        Self {
            detector: collaborators.detector,
            classifier: collaborators.classifier,
            tracker: collaborators.tracker,
            resolver: config.resolver(),
            gate: config.gate(),
            roster: LazyRoster::new(collaborators.roster),
            pending: None,
            changes,
        }
    }

    /// Detect → (classify ∥ resolve position) → request placement.
    ///
    /// Failures end the cycle early; the frame slot is released when
    /// `request` goes out of scope.
    pub(crate) fn run_cycle(&mut self, request: VisionRequest) {
        let VisionRequest {
            lease,
            orientation,
            viewport,
        } = request;
        let image = lease.image();

        let face = match self.detector.detect(image, orientation.image_orientation()) {
            Ok(face) => face,
            Err(e) => {
                tracing::warn!(error = %e, "face detection failed; dropping frame");
                return;
            }
        };

        let Some(face) = face else {
            tracing::debug!("no face in frame; clearing cards");
            self.emit(StateChange::CardsCleared);
            return;
        };

        let point = mapper::to_screen(&face, orientation, viewport).mid();
        tracing::debug!(x = point.x, y = point.y, ?orientation, "face detected");

        let classifier = &mut self.classifier;
        let tracker = self.tracker.as_ref();
        let resolver = &self.resolver;
        let (classified, position) = std::thread::scope(|s| {
            let classification = s.spawn(move || classifier.classify(image));
            let position = resolver.resolve(tracker, point);
            (classification.join(), position)
        });

        let results = match classified {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "classification failed; dropping frame");
                return;
            }
            Err(_) => {
                tracing::warn!("classifier panicked; dropping frame");
                return;
            }
        };
        self.update_pending(&results);

        let Some(position) = position else {
            tracing::debug!("no world position for face; skipping placement");
            return;
        };
        let Some(identity) = self.pending.clone() else {
            tracing::debug!("face localized but not identified yet");
            return;
        };

        self.emit(StateChange::Placement { identity, position });
    }

    fn update_pending(&mut self, results: &[Classification]) {
        let Some(best) = self.gate.select(results) else {
            tracing::debug!(
                top = ?results.first().map(|r| (&r.label, r.confidence)),
                threshold = self.gate.threshold(),
                "no classification above threshold"
            );
            return;
        };

        let identity = match self.roster.get() {
            Ok(roster) => roster.find(&best.label).cloned(),
            Err(e) => {
                tracing::warn!(error = %e, "identity roster unavailable");
                return;
            }
        };
        let Some(identity) = identity else {
            tracing::debug!(label = %best.label, "classified label not in roster");
            return;
        };

        if self.pending.as_ref() != Some(&identity) {
            tracing::info!(
                name = %identity.name,
                confidence = best.confidence,
                "identity recognized"
            );
            self.pending = Some(identity.clone());
            self.emit(StateChange::Identified(identity));
        }
    }

    fn emit(&self, change: StateChange) {
        if self.changes.send(change).is_err() {
            tracing::debug!("change receiver dropped; state change discarded");
        }
    }
}
