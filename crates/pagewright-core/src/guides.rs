//! Ruler guides of a page.

use serde::{Deserialize, Serialize};

/// Orientation of a guide line.
///
/// A horizontal guide is a line of constant `y`; a vertical guide has constant `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Guide positions of one page, in page pixels, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guides {
    #[serde(default)]
    pub horizontal: Vec<f64>,
    #[serde(default)]
    pub vertical: Vec<f64>,
}

impl Guides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self, orientation: Orientation) -> &[f64] {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        }
    }

    fn positions_mut(&mut self, orientation: Orientation) -> &mut Vec<f64> {
        match orientation {
            Orientation::Horizontal => &mut self.horizontal,
            Orientation::Vertical => &mut self.vertical,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty() && self.vertical.is_empty()
    }

    pub fn len(&self) -> usize {
        self.horizontal.len() + self.vertical.len()
    }

    /// Drop non-finite positions left behind by corrupt records.
    pub fn sanitized(mut self) -> Self {
        self.horizontal.retain(|p| p.is_finite());
        self.vertical.retain(|p| p.is_finite());
        self
    }
}

/// Guide requests emitted by the ruler UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GuideEvent {
    CreateGuide {
        position: f64,
        orientation: Orientation,
    },
    UpdateGuide {
        orientation: Orientation,
        index: usize,
        position: f64,
    },
    DeleteGuide {
        index: usize,
        orientation: Orientation,
    },
}

/// Applies guide events to a page's guides.
///
/// Every method returns whether the guides changed; unchanged guides need no save.
pub struct GuideManager;

impl GuideManager {
    /// Append a guide. Non-finite positions are refused.
    pub fn create_guide(guides: &mut Guides, position: f64, orientation: Orientation) -> bool {
        if !position.is_finite() {
            log::warn!("Refusing {:?} guide at non-finite position", orientation);
            return false;
        }
        guides.positions_mut(orientation).push(position);
        true
    }

    /// Move an existing guide.
    pub fn update_guide(
        guides: &mut Guides,
        orientation: Orientation,
        index: usize,
        position: f64,
    ) -> bool {
        if !position.is_finite() {
            return false;
        }
        match guides.positions_mut(orientation).get_mut(index) {
            Some(slot) => {
                *slot = position;
                true
            }
            None => {
                log::warn!("No {:?} guide at index {}", orientation, index);
                false
            }
        }
    }

    /// Delete a guide by index.
    pub fn delete_guide(guides: &mut Guides, index: usize, orientation: Orientation) -> bool {
        let positions = guides.positions_mut(orientation);
        if index >= positions.len() {
            log::warn!("No {:?} guide at index {}", orientation, index);
            return false;
        }
        positions.remove(index);
        true
    }

    /// Apply a ruler event.
    pub fn apply(guides: &mut Guides, event: GuideEvent) -> bool {
        match event {
            GuideEvent::CreateGuide {
                position,
                orientation,
            } => Self::create_guide(guides, position, orientation),
            GuideEvent::UpdateGuide {
                orientation,
                index,
                position,
            } => Self::update_guide(guides, orientation, index, position),
            GuideEvent::DeleteGuide { index, orientation } => {
                Self::delete_guide(guides, index, orientation)
            }
        }
    }
}

/// An in-progress drag of a new guide out of a ruler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideDrag {
    pub orientation: Orientation,
    /// Current position of the dragged line.
    pub position: f64,
}

impl GuideDrag {
    pub fn new(orientation: Orientation, position: f64) -> Self {
        Self {
            orientation,
            position,
        }
    }

    pub fn move_to(&mut self, position: f64) {
        self.position = position;
    }

    /// Finish the drag. Guides released outside `0..=extent` are discarded.
    pub fn release(self, extent: f64) -> Option<GuideEvent> {
        if !self.position.is_finite() || self.position < 0.0 || self.position > extent {
            return None;
        }
        Some(GuideEvent::CreateGuide {
            position: self.position,
            orientation: self.orientation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_update_delete() {
        let mut guides = Guides::new();
        assert!(GuideManager::create_guide(&mut guides, 100.0, Orientation::Vertical));
        assert!(GuideManager::create_guide(&mut guides, 50.0, Orientation::Horizontal));
        assert_eq!(guides.vertical, vec![100.0]);
        assert_eq!(guides.horizontal, vec![50.0]);

        assert!(GuideManager::update_guide(&mut guides, Orientation::Vertical, 0, 120.0));
        assert_eq!(guides.vertical, vec![120.0]);

        assert!(GuideManager::delete_guide(&mut guides, 0, Orientation::Horizontal));
        assert!(guides.horizontal.is_empty());
        assert_eq!(guides.len(), 1);
    }

    #[test]
    fn test_out_of_range_index_is_noop() {
        let mut guides = Guides::new();
        assert!(!GuideManager::update_guide(&mut guides, Orientation::Vertical, 3, 1.0));
        assert!(!GuideManager::delete_guide(&mut guides, 0, Orientation::Horizontal));
        assert!(guides.is_empty());
    }

    #[test]
    fn test_non_finite_positions_refused() {
        let mut guides = Guides::new();
        assert!(!GuideManager::create_guide(&mut guides, f64::NAN, Orientation::Vertical));
        assert!(guides.is_empty());
    }

    #[test]
    fn test_apply_event() {
        let mut guides = Guides::new();
        let event: GuideEvent = serde_json::from_str(
            r#"{"event":"createGuide","position":42.0,"orientation":"horizontal"}"#,
        )
        .unwrap();
        assert!(GuideManager::apply(&mut guides, event));
        assert_eq!(guides.horizontal, vec![42.0]);
    }

    #[test]
    fn test_guide_drag_release() {
        let mut drag = GuideDrag::new(Orientation::Vertical, 0.0);
        drag.move_to(250.0);
        assert_eq!(
            drag.release(800.0),
            Some(GuideEvent::CreateGuide {
                position: 250.0,
                orientation: Orientation::Vertical
            })
        );

        let mut outside = GuideDrag::new(Orientation::Horizontal, 0.0);
        outside.move_to(-10.0);
        assert_eq!(outside.release(800.0), None);
    }

    #[test]
    fn test_sanitized_drops_non_finite() {
        let guides = Guides {
            horizontal: vec![1.0, f64::INFINITY],
            vertical: vec![f64::NAN],
        }
        .sanitized();
        assert_eq!(guides.horizontal, vec![1.0]);
        assert!(guides.vertical.is_empty());
    }
}
