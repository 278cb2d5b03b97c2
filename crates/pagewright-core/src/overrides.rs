//! Overriding inherited master objects.

use crate::document::Page;
use crate::live::{EditError, LiveObjectSet};
use crate::object::{CanvasObject, ObjectId};

/// Replace the inherited object `id` with an editable page-local copy.
///
/// The copy keeps the geometry and style, gets a fresh id, loses all master
/// metadata, and takes the original's paint position. The page records
/// `overrides[masterObjectId] = true` so the master is not re-instantiated there.
///
/// Refused without side effects when the object is missing, is not inherited, or
/// is not overridable.
pub fn override_master_object(
    live: &mut LiveObjectSet,
    page: &mut Page,
    id: &ObjectId,
) -> Result<CanvasObject, EditError> {
    let original = live
        .get(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))?;
    let link = original
        .master()
        .ok_or_else(|| EditError::NotFromMaster(id.clone()))?;
    if !link.overridable {
        log::warn!("Refusing to override locked master object {}", link.master_object_id);
        return Err(EditError::NotOverridable(id.clone()));
    }

    let master_object_id = link.master_object_id.clone();
    let replacement = original.detached_copy();
    live.replace_in_place(id, replacement.clone())?;
    page.overrides.insert(master_object_id.clone(), true);

    log::info!(
        "Overrode master object {} on page {} as {}",
        master_object_id,
        page.id,
        replacement.id()
    );
    Ok(replacement)
}

/// Whether `object` can be overridden on a page.
pub fn can_override(object: &CanvasObject) -> bool {
    object.master().is_some_and(|link| link.overridable)
}
