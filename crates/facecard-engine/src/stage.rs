//! Render-thread side of the pipeline.
//!
//! The card registry lives here, not on the vision worker: every mutation
//! of cards and of the scene graph happens on the renderer's own thread.

use crate::events::{RenderCommand, RenderSink, StateChange};
use crate::pipeline::ChangeReceiver;
use facecard_core::{CardRegistry, Placement};

pub struct CardStage {
    registry: CardRegistry,
}

impl CardStage {
    pub fn new(registry: CardRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    /// Apply one state change, emitting the matching render commands.
    pub fn apply(&mut self, change: StateChange, sink: &mut dyn RenderSink) {
        match change {
            StateChange::Identified(identity) => {
                tracing::debug!(name = %identity.name, "pending identity updated");
            }
            StateChange::Placement { identity, position } => {
                match self.registry.place_or_update(&identity, position) {
                    Placement::Created(card) => {
                        tracing::info!(name = %card.name, position = ?card.position, "card created");
                        sink.apply(RenderCommand::Attach { card: card.clone() });
                    }
                    Placement::Moved(card) => {
                        sink.apply(RenderCommand::Reposition {
                            name: card.name.clone(),
                            position: card.position,
                        });
                    }
                }
            }
            StateChange::CardsCleared => {
                let removed = self.registry.clear();
                if !removed.is_empty() {
                    tracing::info!(count = removed.len(), "no face in view; cards removed");
                }
                for name in removed {
                    sink.apply(RenderCommand::Remove { name });
                }
            }
        }
    }

    /// Drain every pending change without blocking. Call once per render tick.
    pub fn pump(&mut self, changes: &mut ChangeReceiver, sink: &mut dyn RenderSink) -> usize {
        let mut applied = 0;
        while let Ok(change) = changes.try_recv() {
            self.apply(change, sink);
            applied += 1;
        }
        applied
    }
}
