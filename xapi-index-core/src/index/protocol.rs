//! Remove-then-insert maintenance of the per-key tables.

use std::collections::HashSet;

use crate::{
    bbox::{BoundingBox, PositionBox},
    element::{Element, ElementKind, ElementRef},
    error::IndexError,
    resolver::BboxResolver,
    schema::TagKey,
    store::{IndexRecord, TagIndexStore},
};

/// Delete every row filed for `element`, then its element index entry.
///
/// Elements without an entry are left alone. Rows already missing from a
/// table listed in the entry are skipped.
pub(crate) fn remove_element<S>(store: &mut S, element: &ElementRef) -> Result<(), IndexError>
where
    S: TagIndexStore + ?Sized,
{
    let Some(keys) = store.element_keys(element)? else {
        return Ok(());
    };
    for key in &keys {
        store.ensure_key(key)?;
        if let Some(row_id) = store.find_row(key, element)? {
            store.delete_row(key, row_id)?;
        }
    }
    store.remove_element_keys(element)?;
    Ok(())
}

/// Replace whatever is filed for `element` with its current tags.
///
/// Returns the number of (key, element) rows inserted. The element index
/// entry is written before the rows so a failure part way through still
/// leaves every inserted row reachable for removal.
pub(crate) fn apply_update<S, R>(
    store: &mut S,
    resolver: &R,
    element: &Element,
) -> Result<usize, IndexError>
where
    S: TagIndexStore + ?Sized,
    R: BboxResolver + ?Sized,
{
    let reference = element.reference();
    remove_element(store, &reference)?;
    if element.tags.is_empty() {
        return Ok(0);
    }

    let position = PositionBox::from(resolve_bbox(resolver, element)?);
    let tags = sanitized_tags(element);
    let keys: Vec<TagKey> = tags.iter().map(|(key, _)| key.clone()).collect();
    store.set_element_keys(&reference, &keys)?;

    let (has_nodes, has_ways) = element.member_flags();
    for (key, value) in &tags {
        store.ensure_key(key)?;
        store.insert_record(
            key,
            &IndexRecord {
                element: reference,
                value: *value,
                has_nodes,
                has_ways,
                position,
            },
        )?;
    }
    Ok(tags.len())
}

fn resolve_bbox<R>(resolver: &R, element: &Element) -> Result<BoundingBox, IndexError>
where
    R: BboxResolver + ?Sized,
{
    let reference = element.reference();
    let bbox = match element.kind {
        ElementKind::Node => element
            .location
            .map(BoundingBox::point)
            .ok_or(IndexError::MissingCoordinates { element: reference })?,
        ElementKind::Way | ElementKind::Relation => resolver
            .resolve_bbox(&reference)?
            .ok_or(IndexError::MissingBbox { element: reference })?,
    };
    if !bbox.is_well_formed() {
        return Err(IndexError::MalformedBbox {
            element: reference,
            bbox,
        });
    }
    Ok(bbox)
}

/// Sanitised keys paired with their values, first key wins on collision.
fn sanitized_tags(element: &Element) -> Vec<(TagKey, &str)> {
    let mut seen = HashSet::new();
    let mut tags = Vec::with_capacity(element.tags.len());
    for (raw, value) in &element.tags {
        let key = TagKey::sanitize(raw);
        if seen.insert(key.clone()) {
            tags.push((key, value.as_str()));
        } else {
            log::warn!(
                "{}: tag {raw:?} collides with an earlier key as {key}; skipped",
                element.reference()
            );
        }
    }
    tags
}
