//! Master page resolution.
//!
//! Turns a master page's serialized objects into inherited live instances for one
//! page, skipping whatever the page has overridden. Master pages are never
//! modified here.

use crate::document::{Document, MasterPage, Page};
use crate::live::LiveObjectSet;
use crate::object::{CanvasObject, MasterLink, ObjectId};
use crate::snapshot::{SerializedObject, decode_object, encode_object};
use std::collections::{HashMap, HashSet};

/// Live id of the instance of `master_object_id` on `page_id`.
///
/// Derived rather than minted, so resolving the same master twice yields the same ids.
pub fn instance_id(page_id: &str, master_id: &str, master_object_id: &str) -> ObjectId {
    ObjectId::from(format!("{page_id}:{master_id}:{master_object_id}"))
}

/// Identity of a serialized master object: its `masterObjectId`, else its `id`,
/// else its position in the master.
pub fn master_object_id_of(entry: &SerializedObject, master_id: &str, index: usize) -> String {
    entry
        .master_object_id()
        .or_else(|| entry.id())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{master_id}:{index}"))
}

/// The master `master_id` and its `basedOn` ancestors, root first.
///
/// A missing ancestor ends the chain; a cycle is cut where it closes.
pub fn master_chain<'a>(document: &'a Document, master_id: &str) -> Vec<&'a MasterPage> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(master_id.to_string());

    while let Some(id) = next.take() {
        if !seen.insert(id.clone()) {
            log::warn!("Master page chain of {} loops back to {}, cutting it", master_id, id);
            break;
        }
        match document.master_page(&id) {
            Some(master) => {
                next = master.based_on.clone();
                chain.push(master);
            }
            None => {
                log::warn!("Master page not found: {}", id);
                break;
            }
        }
    }

    chain.reverse();
    chain
}

/// Instantiate the objects of `master` for `page`.
///
/// Objects the page has overridden are skipped. Every instance is tagged with the
/// master's id, keeps or gets a `masterObjectId`, is overridable unless the master
/// says otherwise, and is not selectable. Objects that fail to reconstruct are
/// logged and skipped.
pub fn apply(page: &Page, master: &MasterPage) -> Vec<CanvasObject> {
    let identities = identity_table(master);
    let mut seen = HashSet::new();
    let mut instances = Vec::with_capacity(master.object_snapshot.len());

    for (index, entry) in master.object_snapshot.iter().enumerate() {
        let master_object_id = master_object_id_of(entry, &master.id, index);
        if page.is_overridden(&master_object_id) {
            log::debug!(
                "Page {} overrides {} of master {}, skipping",
                page.id,
                master_object_id,
                master.id
            );
            continue;
        }
        if !seen.insert(master_object_id.clone()) {
            log::warn!(
                "Master {} has more than one object {}, keeping the first",
                master.id,
                master_object_id
            );
            continue;
        }

        let mut object = match decode_object(entry) {
            Ok(object) => object,
            Err(e) => {
                log::error!(
                    "Skipping object #{} of master {}: {}",
                    index,
                    master.id,
                    e
                );
                continue;
            }
        };

        let link = MasterLink {
            master_id: master.id.clone(),
            overridable: entry.get_bool(crate::snapshot::KEY_OVERRIDABLE).unwrap_or(true),
            master_object_id,
        };
        relink_frame(&mut object, page, master, &identities);
        let id = instance_id(&page.id, &master.id, &link.master_object_id);
        instances.push(object.into_master_instance(id, link));
    }

    instances
}

/// Serialized `id` and `masterObjectId` of each master object, mapped to its identity.
fn identity_table(master: &MasterPage) -> HashMap<&str, String> {
    let mut table = HashMap::new();
    for (index, entry) in master.object_snapshot.iter().enumerate() {
        let identity = master_object_id_of(entry, &master.id, index);
        for key in [entry.id(), entry.master_object_id()].into_iter().flatten() {
            table.entry(key).or_insert_with(|| identity.clone());
        }
    }
    table
}

/// Point the links of an inherited text frame at the instances on `page`.
///
/// Links to objects outside the master, or overridden on the page, are dropped.
fn relink_frame(
    object: &mut CanvasObject,
    page: &Page,
    master: &MasterPage,
    identities: &HashMap<&str, String>,
) {
    let Some(frame) = object.shape.as_text_frame_mut() else {
        return;
    };
    frame.linked_object_ids = frame
        .linked_object_ids
        .iter()
        .filter_map(|target| match identities.get(target.as_str()) {
            Some(identity) if !page.is_overridden(identity) => {
                Some(instance_id(&page.id, &master.id, identity))
            }
            _ => {
                log::debug!(
                    "Dropping link to {} from a frame of master {} on page {}",
                    target,
                    master.id,
                    page.id
                );
                None
            }
        })
        .collect();
}

/// Instantiate a chain of masters, ancestors first so they paint behind.
pub fn apply_chain(page: &Page, chain: &[&MasterPage]) -> Vec<CanvasObject> {
    chain.iter().flat_map(|master| apply(page, master)).collect()
}

/// Resolve the inherited objects of `page` within `document`.
///
/// A page without a master yields nothing; a missing master is logged and yields nothing.
pub fn resolve(document: &Document, page: &Page) -> Vec<CanvasObject> {
    match page.master_page_id.as_deref() {
        Some(master_id) => apply_chain(page, &master_chain(document, master_id)),
        None => Vec::new(),
    }
}

/// Replace the inherited objects of a live set with `instances`, behind all local objects.
pub fn apply_to_live(live: &mut LiveObjectSet, instances: Vec<CanvasObject>) -> usize {
    let installed = live.install_master_instances(instances);
    log::debug!("Installed {} master instances", installed);
    installed
}

/// Remove every inherited object from a live set.
pub fn detach_live(live: &mut LiveObjectSet) -> usize {
    live.remove_master_instances()
}

/// Build a master page from page-local objects.
///
/// Each serialized object's `masterObjectId` is its current id, so instances on other
/// pages keep their identity as long as the object stays in the master.
pub fn master_from_objects<'a>(
    name: impl Into<String>,
    objects: impl IntoIterator<Item = &'a CanvasObject>,
) -> MasterPage {
    let entries = objects
        .into_iter()
        .filter(|object| !object.is_from_master())
        .map(|object| {
            let mut entry = encode_object(object);
            entry.set(crate::snapshot::KEY_MASTER_OBJECT_ID, object.id().as_str());
            entry
        })
        .collect();
    MasterPage::new(name, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rectangle, Shape};
    use kurbo::Point;
    use serde_json::json;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn master_with(objects: serde_json::Value) -> MasterPage {
        let entries = objects
            .as_array()
            .unwrap()
            .iter()
            .cloned()
            .map(SerializedObject::from_value)
            .collect();
        MasterPage::new("M", entries).with_id("M")
    }

    fn page_on(master: &str) -> Page {
        let mut page = Page::with_id("P");
        page.master_page_id = Some(master.to_string());
        page
    }

    #[test]
    fn test_apply_tags_instances() {
        let master = master_with(json!([
            {"type": "rect", "id": "obj-1", "masterObjectId": "obj-1"},
        ]));
        let instances = apply(&page_on("M"), &master);
        assert_eq!(instances.len(), 1);
        let link = instances[0].master().unwrap();
        assert_eq!(link.master_id, "M");
        assert_eq!(link.master_object_id, "obj-1");
        assert!(link.overridable);
        assert!(!instances[0].selectable);
        assert!(instances[0].evented);
        assert_eq!(instances[0].id().as_str(), "P:M:obj-1");
    }

    #[test]
    fn test_apply_skips_overridden() {
        let master = master_with(json!([
            {"type": "rect", "masterObjectId": "obj-1"},
            {"type": "rect", "masterObjectId": "obj-2"},
        ]));
        let mut page = page_on("M");
        page.overrides.insert("obj-1".into(), true);
        page.overrides.insert("obj-2".into(), false);
        let instances = apply(&page, &master);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].master().unwrap().master_object_id, "obj-2");
    }

    #[test]
    fn test_apply_is_stable() {
        let master = master_with(json!([{"type": "ellipse"}, {"type": "line", "id": "l"}]));
        let page = page_on("M");
        let first: Vec<ObjectId> = apply(&page, &master).iter().map(|o| o.id().clone()).collect();
        let second: Vec<ObjectId> = apply(&page, &master).iter().map(|o| o.id().clone()).collect();
        assert_eq!(first, second);
        assert_eq!(first[0].as_str(), "P:M:M:0");
        assert_eq!(first[1].as_str(), "P:M:l");
    }

    #[test]
    fn test_apply_survives_malformed_objects() {
        init_logging();
        let master = master_with(json!([
            {"type": "rect", "masterObjectId": "a"},
            {"nope": true},
            "junk",
            {"type": "textbox", "masterObjectId": "b", "overridable": false},
        ]));
        let instances = apply(&page_on("M"), &master);
        assert_eq!(instances.len(), 2);
        assert!(!instances[1].master().unwrap().overridable);
    }

    #[test]
    fn test_apply_points_frame_links_at_instances() {
        let master = master_with(json!([
            {"type": "textbox", "id": "t1", "linkedObjectIds": ["t2", "elsewhere"]},
            {"type": "textbox", "id": "t2"},
        ]));
        let page = page_on("M");
        let mut live = LiveObjectSet::new();
        apply_to_live(&mut live, apply(&page, &master));

        let head = live.get(&ObjectId::from("P:M:t1")).unwrap();
        assert_eq!(head.linked_object_ids(), &[ObjectId::from("P:M:t2")]);
        assert!(head.linked_object_ids().iter().all(|id| live.contains(id)));
    }

    #[test]
    fn test_apply_drops_links_to_overridden_frames() {
        let master = master_with(json!([
            {"type": "textbox", "masterObjectId": "t1", "linkedObjectIds": ["t2"]},
            {"type": "textbox", "masterObjectId": "t2"},
        ]));
        let mut page = page_on("M");
        page.overrides.insert("t2".into(), true);
        let instances = apply(&page, &master);
        assert_eq!(instances.len(), 1);
        assert!(instances[0].linked_object_ids().is_empty());
    }

    #[test]
    fn test_master_chain_root_first_and_cycle_safe() {
        init_logging();
        let mut doc = Document::new();
        doc.upsert_master_page(MasterPage::new("base", Vec::new()).with_id("base"));
        doc.upsert_master_page(MasterPage::new("child", Vec::new()).with_id("child").based_on("base"));
        let chain: Vec<&str> = master_chain(&doc, "child").iter().map(|m| m.id.as_str()).collect();
        assert_eq!(chain, vec!["base", "child"]);

        doc.upsert_master_page(MasterPage::new("a", Vec::new()).with_id("a").based_on("b"));
        doc.upsert_master_page(MasterPage::new("b", Vec::new()).with_id("b").based_on("a"));
        let cyclic: Vec<&str> = master_chain(&doc, "a").iter().map(|m| m.id.as_str()).collect();
        assert_eq!(cyclic, vec!["b", "a"]);

        assert!(master_chain(&doc, "missing").is_empty());
    }

    #[test]
    fn test_resolve_chain_paints_ancestors_first() {
        let mut doc = Document::new();
        let mut base = master_with(json!([{"type": "rect", "masterObjectId": "bg"}]));
        base.id = "base".into();
        let mut child = master_with(json!([{"type": "textbox", "masterObjectId": "title"}]));
        child.id = "child".into();
        child.based_on = Some("base".into());
        doc.upsert_master_page(base);
        doc.upsert_master_page(child);

        let page = page_on("child");
        let instances = resolve(&doc, &page);
        let owners: Vec<&str> = instances
            .iter()
            .map(|o| o.master().unwrap().master_id.as_str())
            .collect();
        assert_eq!(owners, vec!["base", "child"]);
    }

    #[test]
    fn test_resolve_without_master() {
        let doc = Document::new();
        assert!(resolve(&doc, &Page::with_id("P")).is_empty());
        assert!(resolve(&doc, &page_on("ghost")).is_empty());
    }

    #[test]
    fn test_master_from_objects_stamps_identity() {
        let objects = vec![
            CanvasObject::new(Shape::Rectangle(Rectangle::new(Point::ZERO, 10.0, 10.0))).with_id("hdr"),
        ];
        let master = master_from_objects("Header", &objects);
        assert_eq!(master.name, "Header");
        assert_eq!(master.object_snapshot[0].master_object_id(), Some("hdr"));

        let instances = apply(&page_on(&master.id), &master);
        assert_eq!(instances[0].master().unwrap().master_object_id, "hdr");
    }

    #[test]
    fn test_apply_to_live_replaces_previous_instances() {
        let master = master_with(json!([{"type": "rect", "masterObjectId": "a"}]));
        let page = page_on("M");
        let mut live = LiveObjectSet::new();
        apply_to_live(&mut live, apply(&page, &master));
        apply_to_live(&mut live, apply(&page, &master));
        assert_eq!(live.len(), 1);
        assert_eq!(detach_live(&mut live), 1);
        assert!(live.is_empty());
    }
}
