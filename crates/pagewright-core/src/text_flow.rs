//! Linked text frames.
//!
//! Pagination of flowed text is not done here. When the content of a frame in a
//! chain changes, the editor hands the whole chain to a [`TextFlow`]
//! implementation and applies the content it hands back.

use crate::live::LiveObjectSet;
use crate::object::{CanvasObject, ObjectId};
use std::collections::HashSet;

/// New content for one frame of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameContent {
    pub id: ObjectId,
    pub content: String,
}

/// Distributes text across a chain of linked frames.
pub trait TextFlow {
    /// Reflow `chain` (head first). Returns the frames whose content changed.
    fn reflow(&mut self, chain: &[&CanvasObject]) -> Vec<FrameContent>;
}

/// Leaves every frame as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTextFlow;

impl TextFlow for NoopTextFlow {
    fn reflow(&mut self, _chain: &[&CanvasObject]) -> Vec<FrameContent> {
        Vec::new()
    }
}

/// The text frame chain containing `id`, head first.
///
/// The head is the frame no other frame links to; the rest follow the links of
/// each member in turn. Links to missing objects or to objects that are not text
/// frames are skipped. Returns an empty chain when `id` is not a linked text frame.
pub fn chain_of(live: &LiveObjectSet, id: &ObjectId) -> Vec<ObjectId> {
    let is_frame = |id: &ObjectId| {
        live.get(id)
            .is_some_and(|o| o.shape.as_text_frame().is_some())
    };
    if !is_frame(id) {
        return Vec::new();
    }

    // Walk back to the head.
    let mut head = id.clone();
    let mut seen = HashSet::from([head.clone()]);
    while let Some(prev) = live
        .ordered()
        .find(|o| o.linked_object_ids().contains(&head))
    {
        if !seen.insert(prev.id().clone()) {
            break;
        }
        head = prev.id().clone();
    }

    // Walk forward through every member's links, in link order.
    let mut chain = vec![head.clone()];
    let mut members = HashSet::from([head]);
    let mut next = 0;
    while let Some(current) = chain.get(next).and_then(|member| live.get(member)) {
        for linked in current.linked_object_ids() {
            if is_frame(linked) && members.insert(linked.clone()) {
                chain.push(linked.clone());
            }
        }
        next += 1;
    }
    if !members.contains(id) {
        chain.push(id.clone());
    }
    if chain.len() < 2 { Vec::new() } else { chain }
}
