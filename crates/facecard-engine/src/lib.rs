//! facecard-engine — Per-frame face card pipeline.
//!
//! Admits at most one frame at a time, runs detection and classification on
//! a dedicated vision thread, resolves the face's world position, and hands
//! placement requests to the render thread as a stream of [`StateChange`]s.

pub mod config;
pub mod events;
pub mod pipeline;
pub mod stage;

pub use config::{Config, ConfigError};
pub use events::{RenderCommand, RenderSink, StateChange};
pub use pipeline::{spawn_pipeline, Admission, ChangeReceiver, Collaborators, EngineError, PipelineHandle};
pub use stage::CardStage;
