//! Overlay cards keyed by identity.
//!
//! A card is a rounded background panel with three stacked text labels
//! (name, title, department). Each identity gets at most one card; later
//! recognitions move the existing card rather than building a new one.

use crate::roster::Identity;
use nalgebra as na;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

// --- Layout constants, all multiplied by the card scale ---
const CARD_WIDTH: f32 = 0.125;
const CARD_HEIGHT: f32 = 0.075;
const CARD_OFFSET_X: f32 = 0.0;
const CARD_OFFSET_Y: f32 = 0.0775;
const TEXT_SCALE: f32 = 0.004;
const LINE_SPACING: f32 = 0.02;

const CARD_CORNER_RADIUS: f32 = 0.02;
const CARD_MATERIAL: &str = "bgCard.png";
const TEXT_EXTRUSION_DEPTH: f32 = 0.2;
const TEXT_FONT: &str = "Arial";
const TEXT_FONT_SIZE: f32 = 2.0;
const TEXT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Default card scale.
pub const DEFAULT_CARD_SCALE: f32 = 2.5;

/// Measures unscaled text width so labels can be centered on the panel.
pub trait TextMetrics: Send {
    fn width(&self, text: &str, font_size: f32) -> f32;
}

/// Approximates every glyph with the same advance, as a fraction of the font size.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvance {
    pub advance: f32,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMetrics for FixedAdvance {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.advance
    }
}

/// Rotation axes a billboard constraint leaves free to follow the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BillboardAxes {
    All,
    /// Yaw only; the card stays upright.
    Y,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub width: f32,
    pub height: f32,
    pub corner_radius: f32,
    pub material: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLabel {
    pub text: String,
    pub font: String,
    pub font_size: f32,
    pub extrusion_depth: f32,
    pub color: [f32; 4],
    pub scale: f32,
    /// Position relative to the panel center.
    pub offset: na::Point3<f32>,
}

/// A renderable identity card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub name: String,
    pub panel: Panel,
    pub labels: Vec<TextLabel>,
    pub billboard: BillboardAxes,
    /// World position of the panel center.
    pub position: na::Point3<f32>,
}

/// Geometry and placement parameters for cards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardLayout {
    pub width: f32,
    pub height: f32,
    pub corner_radius: f32,
    /// Bias from the face position to the card center, in world units.
    pub offset: na::Vector3<f32>,
    pub text_scale: f32,
    pub line_spacing: f32,
}

impl CardLayout {
    pub fn with_scale(scale: f32) -> Self {
        Self {
            width: CARD_WIDTH * scale,
            height: CARD_HEIGHT * scale,
            corner_radius: CARD_CORNER_RADIUS,
            offset: na::Vector3::new(CARD_OFFSET_X * scale, CARD_OFFSET_Y * scale, 0.0),
            text_scale: TEXT_SCALE * scale,
            line_spacing: LINE_SPACING * scale,
        }
    }

    /// Where a card belongs for a face at `face`.
    pub fn anchor(&self, face: na::Point3<f32>) -> na::Point3<f32> {
        face + self.offset
    }

    fn label(&self, text: String, line: usize, metrics: &dyn TextMetrics) -> TextLabel {
        let text_width = metrics.width(&text, TEXT_FONT_SIZE) * self.text_scale;
        let (min_x, max_y) = (-self.width / 2.0, self.height / 2.0);
        let x = min_x + (self.width - text_width) / 2.0;
        let y = max_y - line as f32 * self.line_spacing;

        TextLabel {
            text,
            font: TEXT_FONT.to_string(),
            font_size: TEXT_FONT_SIZE,
            extrusion_depth: TEXT_EXTRUSION_DEPTH,
            color: TEXT_COLOR,
            scale: self.text_scale,
            offset: na::Point3::new(x, y, 0.0),
        }
    }

    /// Build a new card for `identity` next to a face at `face`.
    pub fn build(
        &self,
        identity: &Identity,
        face: na::Point3<f32>,
        metrics: &dyn TextMetrics,
    ) -> Card {
        let labels = vec![
            self.label(format!("Name: {}", identity.name), 1, metrics),
            self.label(format!("Title: {}", identity.title), 2, metrics),
            self.label(format!("Department: {}", identity.department), 3, metrics),
        ];

        Card {
            name: identity.name.clone(),
            panel: Panel {
                width: self.width,
                height: self.height,
                corner_radius: self.corner_radius,
                material: CARD_MATERIAL.to_string(),
            },
            labels,
            billboard: BillboardAxes::Y,
            position: self.anchor(face),
        }
    }
}

impl Default for CardLayout {
    fn default() -> Self {
        Self::with_scale(DEFAULT_CARD_SCALE)
    }
}

/// Outcome of [`CardRegistry::place_or_update`].
#[derive(Debug)]
pub enum Placement<'a> {
    Created(&'a Card),
    Moved(&'a Card),
}

impl<'a> Placement<'a> {
    pub fn card(&self) -> &'a Card {
        match self {
            Self::Created(card) | Self::Moved(card) => *card,
        }
    }
}

/// Identity name → card.
pub struct CardRegistry {
    layout: CardLayout,
    metrics: Box<dyn TextMetrics>,
    cards: HashMap<String, Card>,
}

impl CardRegistry {
    pub fn new(layout: CardLayout) -> Self {
        Self::with_metrics(layout, Box::new(FixedAdvance::default()))
    }

    pub fn with_metrics(layout: CardLayout, metrics: Box<dyn TextMetrics>) -> Self {
        Self {
            layout,
            metrics,
            cards: HashMap::new(),
        }
    }

    /// Move the identity's card next to `face`, building it first if needed.
    pub fn place_or_update(&mut self, identity: &Identity, face: na::Point3<f32>) -> Placement<'_> {
        match self.cards.entry(identity.name.clone()) {
            Entry::Occupied(entry) => {
                let card = entry.into_mut();
                card.position = self.layout.anchor(face);
                Placement::Moved(card)
            }
            Entry::Vacant(entry) => {
                let card = self.layout.build(identity, face, self.metrics.as_ref());
                Placement::Created(entry.insert(card))
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Card> {
        self.cards.get(name)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn layout(&self) -> &CardLayout {
        &self.layout
    }

    /// Drop every card, returning the removed names in sorted order.
    pub fn clear(&mut self) -> Vec<String> {
        let mut names: Vec<String> = self.cards.drain().map(|(name, _)| name).collect();
        names.sort();
        names
    }
}

impl Default for CardRegistry {
    fn default() -> Self {
        Self::new(CardLayout::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> Identity {
        Identity {
            name: name.into(),
            title: "Engineer".into(),
            department: "R&D".into(),
        }
    }

    fn close(a: na::Point3<f32>, b: na::Point3<f32>) -> bool {
        (a - b).norm() < 1e-5
    }

    #[test]
    fn test_layout_constants() {
        let layout = CardLayout::default();
        assert!((layout.width - 0.3125).abs() < 1e-6);
        assert!((layout.height - 0.1875).abs() < 1e-6);
        assert!((layout.offset.y - 0.19375).abs() < 1e-6);
        assert_eq!(layout.offset.x, 0.0);
        assert!((layout.text_scale - 0.01).abs() < 1e-6);
        assert!((layout.line_spacing - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_create_then_reposition() {
        let mut registry = CardRegistry::default();
        let offset = registry.layout().offset;
        let alice = identity("Alice");
        let p1 = na::Point3::new(0.1, 0.2, -0.5);
        let p2 = na::Point3::new(0.3, 0.1, -0.7);

        assert!(matches!(registry.place_or_update(&alice, p1), Placement::Created(_)));
        let moved = registry.place_or_update(&alice, p2);
        assert!(matches!(moved, Placement::Moved(_)));
        assert!(close(moved.card().position, p2 + offset));

        assert_eq!(registry.len(), 1);
        assert!(close(registry.get("Alice").unwrap().position, p2 + offset));
    }

    #[test]
    fn test_reposition_keeps_geometry() {
        let mut registry = CardRegistry::default();
        let alice = identity("Alice");
        let first = registry
            .place_or_update(&alice, na::Point3::origin())
            .card()
            .clone();
        let second = registry
            .place_or_update(&alice, na::Point3::new(1.0, 1.0, 1.0))
            .card()
            .clone();
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.panel, second.panel);
    }

    #[test]
    fn test_distinct_identities_get_distinct_cards() {
        let mut registry = CardRegistry::default();
        registry.place_or_update(&identity("Alice"), na::Point3::origin());
        registry.place_or_update(&identity("Bob"), na::Point3::origin());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_card_labels_stack_below_top_edge() {
        let layout = CardLayout::default();
        let card = layout.build(&identity("Bob"), na::Point3::origin(), &FixedAdvance::default());

        assert_eq!(card.labels.len(), 3);
        assert_eq!(card.labels[0].text, "Name: Bob");
        assert_eq!(card.labels[1].text, "Title: Engineer");
        assert_eq!(card.labels[2].text, "Department: R&D");
        for (i, label) in card.labels.iter().enumerate() {
            let expected = layout.height / 2.0 - (i + 1) as f32 * layout.line_spacing;
            assert!((label.offset.y - expected).abs() < 1e-6);
        }
        assert_eq!(card.billboard, BillboardAxes::Y);
    }

    #[test]
    fn test_card_labels_centered_horizontally() {
        let layout = CardLayout::default();
        let metrics = FixedAdvance::default();
        let card = layout.build(&identity("Bob"), na::Point3::origin(), &metrics);
        for label in &card.labels {
            let w = metrics.width(&label.text, label.font_size) * label.scale;
            // Left and right margins are equal.
            let left = label.offset.x + layout.width / 2.0;
            let right = layout.width / 2.0 - (label.offset.x + w);
            assert!((left - right).abs() < 1e-5, "{}: {left} vs {right}", label.text);
        }
    }

    #[test]
    fn test_clear_returns_sorted_names() {
        let mut registry = CardRegistry::default();
        registry.place_or_update(&identity("Carol"), na::Point3::origin());
        registry.place_or_update(&identity("Alice"), na::Point3::origin());
        assert_eq!(registry.clear(), vec!["Alice", "Carol"]);
        assert!(registry.is_empty());
    }
}
