//! Messages leaving the vision worker and commands sent to the renderer.

use facecard_core::{Card, Identity};
use nalgebra as na;
use serde::Serialize;

/// Pipeline state changes, one variant per piece of state.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// The pending identity changed after an accepted classification.
    Identified(Identity),
    /// A face belonging to `identity` was localized at `position`.
    Placement {
        identity: Identity,
        position: na::Point3<f32>,
    },
    /// A frame contained no face; every card is dropped.
    CardsCleared,
}

/// Scene-graph mutation for the external renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RenderCommand {
    /// Attach a newly built card at the scene root.
    Attach { card: Card },
    Reposition {
        name: String,
        position: na::Point3<f32>,
    },
    Remove { name: String },
}

/// Receives render commands on the renderer's thread.
pub trait RenderSink {
    fn apply(&mut self, command: RenderCommand);
}

impl RenderSink for Vec<RenderCommand> {
    fn apply(&mut self, command: RenderCommand) {
        self.push(command);
    }
}
