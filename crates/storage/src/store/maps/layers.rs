#![forbid(unsafe_code)]

use super::super::support::{non_empty_trimmed, now_ms, writable_branch};
use super::super::wiki::wiki_entry_row;
use super::super::*;
use super::{layer_row, map_row, map_snapshot_row, object_row};
use fl_core::ChangeTracker;
use fl_core::ids::{ActorId, BranchId, LayerId, MapObjectId, MapSnapshotId, WikiEntryId};
use rusqlite::{Connection, params};

impl SqliteStore {
    pub fn map_layer_add(&mut self, request: LayerAddRequest) -> Result<MapLayerRow, StoreError> {
        let name = non_empty_trimmed(&request.name, "layer name must not be empty")?;
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        writable_snapshot(&tx, request.snapshot_id, &request.actor)?;

        tx.execute(
            "INSERT INTO map_layers(snapshot_id, name, layer_type, z_index, is_visible, style_json, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                request.snapshot_id.get(),
                name,
                request.layer_type.as_str(),
                request.z_index,
                request.is_visible,
                request.style_json,
                now_ms
            ],
        )?;
        let layer = layer_row(&tx, LayerId::new(tx.last_insert_rowid()))?;
        tx.commit()?;

        tracing::info!(
            snapshot_id = %layer.snapshot_id,
            layer_id = %layer.id,
            z_index = layer.z_index,
            "map layer added"
        );
        Ok(layer)
    }

    /// A wiki link, when given, must point at an entry of the map's own branch.
    pub fn map_object_add(&mut self, request: MapObjectAddRequest) -> Result<MapObjectRow, StoreError> {
        if request.coordinates.is_null() {
            return Err(StoreError::InvalidInput("coordinates must not be null"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let layer = layer_row(&tx, request.layer_id)?;
        let branch_id = writable_snapshot(&tx, layer.snapshot_id, &request.actor)?;

        if let Some(entry_id) = request.wiki_entry_id {
            ensure_entry_in_branch(&tx, entry_id, branch_id)?;
        }

        tx.execute(
            "INSERT INTO map_objects(layer_id, object_type, coordinates_json, label, description, wiki_entry_id, style_json, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                layer.id.get(),
                request.object_type.as_str(),
                request.coordinates,
                request.label,
                request.description,
                request.wiki_entry_id.map(|id| id.get()),
                request.style_json,
                now_ms
            ],
        )?;
        let object = object_row(&tx, MapObjectId::new(tx.last_insert_rowid()))?;
        tx.commit()?;

        tracing::info!(layer_id = %layer.id, object_id = %object.id, "map object added");
        Ok(object)
    }

    pub fn map_layer_update(
        &mut self,
        layer_id: LayerId,
        actor: &ActorId,
        patch: LayerPatch,
    ) -> Result<MapLayerRow, StoreError> {
        if patch == LayerPatch::default() {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }
        let name = patch
            .name
            .map(|name| non_empty_trimmed(&name, "layer name must not be empty"))
            .transpose()?;

        let tx = self.conn.transaction()?;
        let current = layer_row(&tx, layer_id)?;
        writable_snapshot(&tx, current.snapshot_id, actor)?;

        let mut changes = ChangeTracker::new();
        let name = changes.apply("name", current.name.clone(), name);
        let layer_type = changes.apply("layer_type", current.layer_type, patch.layer_type);
        let z_index = changes.apply("z_index", current.z_index, patch.z_index);
        let is_visible = changes.apply("is_visible", current.is_visible, patch.is_visible);
        let style_json = changes.apply("style_json", current.style_json.clone(), patch.style_json);
        if !changes.has_changes() {
            return Ok(current);
        }

        tx.execute(
            "UPDATE map_layers SET name=?2, layer_type=?3, z_index=?4, is_visible=?5, style_json=?6 WHERE id=?1",
            params![
                layer_id.get(),
                name,
                layer_type.as_str(),
                z_index,
                is_visible,
                style_json
            ],
        )?;
        let layer = layer_row(&tx, layer_id)?;
        tx.commit()?;

        tracing::info!(layer_id = %layer_id, fields = ?changes.changed_fields(), "map layer updated");
        Ok(layer)
    }

    /// Removes the layer with its objects.
    pub fn map_layer_delete(&mut self, layer_id: LayerId, actor: &ActorId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let layer = layer_row(&tx, layer_id)?;
        writable_snapshot(&tx, layer.snapshot_id, actor)?;
        tx.execute("DELETE FROM map_layers WHERE id=?1", params![layer_id.get()])?;
        tx.commit()?;

        tracing::info!(snapshot_id = %layer.snapshot_id, layer_id = %layer_id, "map layer deleted");
        Ok(())
    }

    /// A new wiki link must point at an entry of the map's own branch;
    /// `Some(None)` unlinks.
    pub fn map_object_update(
        &mut self,
        object_id: MapObjectId,
        actor: &ActorId,
        patch: MapObjectPatch,
    ) -> Result<MapObjectRow, StoreError> {
        if patch == MapObjectPatch::default() {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }
        if patch.coordinates.as_ref().is_some_and(|value| value.is_null()) {
            return Err(StoreError::InvalidInput("coordinates must not be null"));
        }

        let tx = self.conn.transaction()?;
        let current = object_row(&tx, object_id)?;
        let layer = layer_row(&tx, current.layer_id)?;
        let branch_id = writable_snapshot(&tx, layer.snapshot_id, actor)?;

        let mut changes = ChangeTracker::new();
        let object_type = changes.apply("object_type", current.object_type, patch.object_type);
        let coordinates = changes.apply("coordinates", current.coordinates.clone(), patch.coordinates);
        let label = changes.apply("label", current.label.clone(), patch.label);
        let description = changes.apply("description", current.description.clone(), patch.description);
        let wiki_entry_id = changes.apply("wiki_entry_id", current.wiki_entry_id, patch.wiki_entry_id);
        let style_json = changes.apply("style_json", current.style_json.clone(), patch.style_json);
        if !changes.has_changes() {
            return Ok(current);
        }
        if changes.changed_fields().contains(&"wiki_entry_id")
            && let Some(entry_id) = wiki_entry_id
        {
            ensure_entry_in_branch(&tx, entry_id, branch_id)?;
        }

        tx.execute(
            "UPDATE map_objects SET object_type=?2, coordinates_json=?3, label=?4, description=?5, wiki_entry_id=?6, style_json=?7 \
             WHERE id=?1",
            params![
                object_id.get(),
                object_type.as_str(),
                coordinates,
                label,
                description,
                wiki_entry_id.map(|id| id.get()),
                style_json
            ],
        )?;
        let object = object_row(&tx, object_id)?;
        tx.commit()?;

        tracing::info!(object_id = %object_id, fields = ?changes.changed_fields(), "map object updated");
        Ok(object)
    }

    pub fn map_object_delete(&mut self, object_id: MapObjectId, actor: &ActorId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let object = object_row(&tx, object_id)?;
        let layer = layer_row(&tx, object.layer_id)?;
        writable_snapshot(&tx, layer.snapshot_id, actor)?;
        tx.execute("DELETE FROM map_objects WHERE id=?1", params![object_id.get()])?;
        tx.commit()?;

        tracing::info!(layer_id = %layer.id, object_id = %object_id, "map object deleted");
        Ok(())
    }
}

/// Resolves snapshot -> map -> branch and checks write access. Returns the
/// owning branch id.
fn writable_snapshot(
    conn: &Connection,
    snapshot_id: MapSnapshotId,
    actor: &ActorId,
) -> Result<BranchId, StoreError> {
    let snapshot = map_snapshot_row(conn, snapshot_id)?;
    let map = map_row(conn, snapshot.map_id)?;
    let branch = writable_branch(conn, map.branch_id, actor)?;
    Ok(branch.id)
}

fn ensure_entry_in_branch(
    conn: &Connection,
    entry_id: WikiEntryId,
    branch_id: BranchId,
) -> Result<(), StoreError> {
    if wiki_entry_row(conn, entry_id)?.branch_id != branch_id {
        return Err(StoreError::InvalidInput(
            "wiki entry belongs to another branch",
        ));
    }
    Ok(())
}
