//! The live object set of the displayed page.

use crate::object::{CanvasObject, ObjectId};
use kurbo::Rect;
use std::collections::HashMap;
use thiserror::Error;

/// Refused edits on the live object set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Object not found: {0}")]
    NotFound(ObjectId),
    #[error("Duplicate object id: {0}")]
    DuplicateId(ObjectId),
    #[error("Object {0} is inherited from a master page and cannot be edited directly")]
    MasterObjectLocked(ObjectId),
    #[error("Object {0} is not overridable")]
    NotOverridable(ObjectId),
    #[error("Object {0} is not inherited from a master page")]
    NotFromMaster(ObjectId),
    #[error("Object id cannot change during an update ({0})")]
    IdChanged(ObjectId),
    #[error("Object {0} is not a text frame")]
    NotTextFrame(ObjectId),
}

/// Objects of one page, keyed by id, with a paint order.
///
/// Ids are unique within the set. Inherited (master) objects are kept behind
/// all page-local objects and refuse direct edits.
#[derive(Debug, Clone, Default)]
pub struct LiveObjectSet {
    objects: HashMap<ObjectId, CanvasObject>,
    /// Paint order (back to front).
    z_order: Vec<ObjectId>,
}

impl LiveObjectSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from objects in paint order. Later duplicates get a fresh id.
    pub fn from_objects(objects: impl IntoIterator<Item = CanvasObject>) -> Self {
        let mut set = Self::new();
        for mut object in objects {
            if object.id.is_missing() || set.contains(&object.id) {
                let fresh = ObjectId::new();
                log::warn!("Re-keying object {:?} as {}", object.id.as_str(), fresh);
                object.id = fresh;
            }
            set.push(object);
        }
        set
    }

    fn push(&mut self, object: CanvasObject) {
        self.z_order.push(object.id.clone());
        self.objects.insert(object.id.clone(), object);
    }

    /// Add a page-local object on top. Inherited objects go through
    /// [`install_master_instances`](Self::install_master_instances).
    pub fn insert(&mut self, object: CanvasObject) -> Result<ObjectId, EditError> {
        if object.is_from_master() {
            return Err(EditError::MasterObjectLocked(object.id));
        }
        if self.contains(&object.id) {
            return Err(EditError::DuplicateId(object.id));
        }
        let id = object.id.clone();
        self.push(object);
        Ok(id)
    }

    /// Replace every inherited object with `instances`, placed behind all local objects.
    /// Instances whose id collides with a local object are dropped.
    pub(crate) fn install_master_instances(&mut self, instances: Vec<CanvasObject>) -> usize {
        self.remove_master_instances();
        let mut front = Vec::with_capacity(instances.len());
        for instance in instances {
            if self.contains(&instance.id) {
                log::warn!("Skipping master instance with colliding id {}", instance.id);
                continue;
            }
            front.push(instance.id.clone());
            self.objects.insert(instance.id.clone(), instance);
        }
        let installed = front.len();
        front.append(&mut self.z_order);
        self.z_order = front;
        installed
    }

    /// Remove every inherited object. Returns how many were removed.
    pub(crate) fn remove_master_instances(&mut self) -> usize {
        let inherited: Vec<ObjectId> = self
            .ordered()
            .filter(|o| o.is_from_master())
            .map(|o| o.id.clone())
            .collect();
        for id in &inherited {
            self.take(id);
        }
        inherited.len()
    }

    /// Remove a page-local object. Also unlinks it from text frame chains.
    pub fn remove(&mut self, id: &ObjectId) -> Result<CanvasObject, EditError> {
        match self.objects.get(id) {
            None => Err(EditError::NotFound(id.clone())),
            Some(o) if o.is_from_master() => Err(EditError::MasterObjectLocked(id.clone())),
            Some(_) => {
                let removed = self.take(id).ok_or_else(|| EditError::NotFound(id.clone()))?;
                self.unlink_everywhere(id);
                Ok(removed)
            }
        }
    }

    /// Remove an object regardless of origin.
    pub(crate) fn take(&mut self, id: &ObjectId) -> Option<CanvasObject> {
        self.z_order.retain(|other| other != id);
        self.objects.remove(id)
    }

    /// Swap the object `id` for `replacement`, keeping its paint position.
    pub(crate) fn replace_in_place(
        &mut self,
        id: &ObjectId,
        replacement: CanvasObject,
    ) -> Result<(), EditError> {
        let Some(pos) = self.z_order.iter().position(|other| other == id) else {
            return Err(EditError::NotFound(id.clone()));
        };
        if replacement.id != *id && self.contains(&replacement.id) {
            return Err(EditError::DuplicateId(replacement.id));
        }
        self.objects.remove(id);
        self.z_order[pos] = replacement.id.clone();
        self.objects.insert(replacement.id.clone(), replacement);
        Ok(())
    }

    /// Replace a page-local object by value. The update must keep the id and may
    /// not touch inherited objects.
    pub fn update<F>(&mut self, id: &ObjectId, f: F) -> Result<(), EditError>
    where
        F: FnOnce(&CanvasObject) -> CanvasObject,
    {
        let current = self
            .objects
            .get(id)
            .ok_or_else(|| EditError::NotFound(id.clone()))?;
        if current.is_from_master() {
            return Err(EditError::MasterObjectLocked(id.clone()));
        }
        let updated = f(current);
        if updated.id != *id {
            return Err(EditError::IdChanged(id.clone()));
        }
        if updated.is_from_master() {
            return Err(EditError::MasterObjectLocked(id.clone()));
        }
        self.objects.insert(id.clone(), updated);
        Ok(())
    }

    /// Give every object with a missing id a fresh one. Returns the re-keyed ids.
    pub fn ensure_ids(&mut self) -> Vec<ObjectId> {
        let missing: Vec<ObjectId> = self
            .z_order
            .iter()
            .filter(|id| id.is_missing())
            .cloned()
            .collect();
        let mut assigned = Vec::with_capacity(missing.len());
        for old in missing {
            if let Some(mut object) = self.objects.remove(&old) {
                let fresh = ObjectId::new();
                object.id = fresh.clone();
                if let Some(slot) = self.z_order.iter_mut().find(|id| **id == old) {
                    *slot = fresh.clone();
                }
                self.objects.insert(fresh.clone(), object);
                assigned.push(fresh);
            }
        }
        assigned
    }

    fn unlink_everywhere(&mut self, id: &ObjectId) {
        for object in self.objects.values_mut() {
            let owner = object.id.clone();
            if let Some(frame) = object.shape.as_text_frame_mut() {
                if frame.unlink(id) {
                    log::debug!("Unlinked {} from text chain of {}", id, owner);
                }
            }
        }
    }

    /// Clear all objects.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.z_order.clear();
    }

    /// Get an object by ID.
    pub fn get(&self, id: &ObjectId) -> Option<&CanvasObject> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Objects in paint order (back to front).
    pub fn ordered(&self) -> impl Iterator<Item = &CanvasObject> {
        self.z_order.iter().filter_map(|id| self.objects.get(id))
    }

    /// Page-local objects in paint order.
    pub fn local_objects(&self) -> impl Iterator<Item = &CanvasObject> {
        self.ordered().filter(|o| !o.is_from_master())
    }

    /// Inherited objects in paint order.
    pub fn master_instances(&self) -> impl Iterator<Item = &CanvasObject> {
        self.ordered().filter(|o| o.is_from_master())
    }

    /// Find the inherited instance of a master object, if present.
    pub fn find_by_master_object_id(&self, master_object_id: &str) -> Option<&CanvasObject> {
        self.master_instances()
            .find(|o| o.master().is_some_and(|m| m.master_object_id == master_object_id))
    }

    /// Ids in paint order.
    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.z_order.iter()
    }

    /// Bounds of every object except `exclude`, in paint order.
    pub fn sibling_bounds(&self, exclude: &ObjectId) -> Vec<Rect> {
        self.ordered()
            .filter(|o| o.id != *exclude && o.visible)
            .map(CanvasObject::bounds)
            .collect()
    }

    /// Bring a page-local object to the front.
    pub fn bring_to_front(&mut self, id: &ObjectId) -> Result<(), EditError> {
        self.ensure_local(id)?;
        self.z_order.retain(|other| other != id);
        self.z_order.push(id.clone());
        Ok(())
    }

    /// Send an object to the back of the local objects (still in front of inherited ones).
    pub fn send_to_back(&mut self, id: &ObjectId) -> Result<(), EditError> {
        self.ensure_local(id)?;
        self.z_order.retain(|other| other != id);
        let first_local = self
            .z_order
            .iter()
            .position(|other| self.objects.get(other).is_some_and(|o| !o.is_from_master()))
            .unwrap_or(self.z_order.len());
        self.z_order.insert(first_local, id.clone());
        Ok(())
    }

    fn ensure_local(&self, id: &ObjectId) -> Result<(), EditError> {
        match self.objects.get(id) {
            None => Err(EditError::NotFound(id.clone())),
            Some(o) if o.is_from_master() => Err(EditError::MasterObjectLocked(id.clone())),
            Some(_) => Ok(()),
        }
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Get the number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Consume the set, yielding objects in paint order.
    pub fn into_ordered(mut self) -> Vec<CanvasObject> {
        self.z_order
            .iter()
            .filter_map(|id| self.objects.remove(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::MasterLink;
    use crate::shapes::{Rectangle, Shape, TextFrame};
    use kurbo::{Point, Vec2};

    fn rect(id: &str) -> CanvasObject {
        CanvasObject::new(Shape::Rectangle(Rectangle::new(Point::ZERO, 10.0, 10.0))).with_id(id)
    }

    fn inherited(id: &str) -> CanvasObject {
        rect(id).into_master_instance(
            ObjectId::from(id),
            MasterLink {
                master_id: "m".into(),
                master_object_id: id.into(),
                overridable: true,
            },
        )
    }

    fn order(set: &LiveObjectSet) -> Vec<&str> {
        set.ids().map(ObjectId::as_str).collect()
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut set = LiveObjectSet::new();
        set.insert(rect("a")).unwrap();
        assert_eq!(
            set.insert(rect("a")),
            Err(EditError::DuplicateId(ObjectId::from("a")))
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_insert_refuses_inherited_objects() {
        let mut set = LiveObjectSet::new();
        assert!(matches!(
            set.insert(inherited("m1")),
            Err(EditError::MasterObjectLocked(_))
        ));
    }

    #[test]
    fn test_master_instances_paint_behind_locals() {
        let mut set = LiveObjectSet::new();
        set.insert(rect("a")).unwrap();
        set.insert(rect("b")).unwrap();
        set.install_master_instances(vec![inherited("m1"), inherited("m2")]);
        assert_eq!(order(&set), vec!["m1", "m2", "a", "b"]);

        // Re-installing replaces the previous instances.
        set.install_master_instances(vec![inherited("m3")]);
        assert_eq!(order(&set), vec!["m3", "a", "b"]);
    }

    #[test]
    fn test_update_refuses_master_objects_and_id_changes() {
        let mut set = LiveObjectSet::new();
        set.insert(rect("a")).unwrap();
        set.install_master_instances(vec![inherited("m1")]);

        let locked = set.update(&ObjectId::from("m1"), |o| o.clone().translated(Vec2::new(1.0, 0.0)));
        assert!(matches!(locked, Err(EditError::MasterObjectLocked(_))));

        let renamed = set.update(&ObjectId::from("a"), |o| o.clone().with_id("z"));
        assert!(matches!(renamed, Err(EditError::IdChanged(_))));

        set.update(&ObjectId::from("a"), |o| o.clone().translated(Vec2::new(5.0, 0.0)))
            .unwrap();
        assert!((set.get(&ObjectId::from("a")).unwrap().bounds().x0 - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_remove_unlinks_text_chains() {
        let mut set = LiveObjectSet::new();
        let mut frame = TextFrame::new(Point::ZERO, 10.0, 10.0, "flow");
        frame.linked_object_ids = vec![ObjectId::from("b")];
        set.insert(CanvasObject::new(Shape::TextFrame(frame)).with_id("a"))
            .unwrap();
        set.insert(rect("b")).unwrap();

        set.remove(&ObjectId::from("b")).unwrap();
        assert!(set.get(&ObjectId::from("a")).unwrap().linked_object_ids().is_empty());
    }

    #[test]
    fn test_remove_refuses_master_objects() {
        let mut set = LiveObjectSet::new();
        set.install_master_instances(vec![inherited("m1")]);
        assert!(set.remove(&ObjectId::from("m1")).is_err());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_replace_in_place_keeps_position() {
        let mut set = LiveObjectSet::new();
        set.insert(rect("a")).unwrap();
        set.insert(rect("b")).unwrap();
        set.insert(rect("c")).unwrap();
        set.replace_in_place(&ObjectId::from("b"), rect("x")).unwrap();
        assert_eq!(order(&set), vec!["a", "x", "c"]);
        assert!(!set.contains(&ObjectId::from("b")));
    }

    #[test]
    fn test_from_objects_rekeys_duplicates() {
        let set = LiveObjectSet::from_objects(vec![rect("a"), rect("a"), rect("")]);
        assert_eq!(set.len(), 3);
        assert!(set.ids().all(|id| !id.is_missing()));
        assert_eq!(set.ids().filter(|id| id.as_str() == "a").count(), 1);
    }

    #[test]
    fn test_ensure_ids_assigns_missing() {
        let mut set = LiveObjectSet::new();
        set.push(rect(""));
        let assigned = set.ensure_ids();
        assert_eq!(assigned.len(), 1);
        assert!(set.get(&assigned[0]).is_some());
        assert!(set.ids().all(|id| !id.is_missing()));
    }

    #[test]
    fn test_send_to_back_stays_in_front_of_inherited() {
        let mut set = LiveObjectSet::new();
        set.insert(rect("a")).unwrap();
        set.insert(rect("b")).unwrap();
        set.install_master_instances(vec![inherited("m1")]);
        set.send_to_back(&ObjectId::from("b")).unwrap();
        assert_eq!(order(&set), vec!["m1", "b", "a"]);
    }
}
