#![forbid(unsafe_code)]

use super::super::support::{
    branch_row, map_unique_violation, non_empty_trimmed, now_ms, writable_branch,
};
use super::super::*;
use super::{map_row, maps_of_branch};
use fl_core::ChangeTracker;
use fl_core::ids::{ActorId, BranchId, MapId};
use rusqlite::params;

impl SqliteStore {
    pub fn map_create(&mut self, request: MapCreateRequest) -> Result<MapRow, StoreError> {
        let name = non_empty_trimmed(&request.name, "name must not be empty")?;
        ensure_dimensions(request.width, request.height)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let branch = writable_branch(&tx, request.branch_id, &request.actor)?;

        tx.execute(
            "INSERT INTO maps(branch_id, source_entry_id, name, description, width, height, created_at_ms, updated_at_ms) \
             VALUES (?1, NULL, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                branch.id.get(),
                name,
                request.description,
                request.width,
                request.height,
                now_ms
            ],
        )
        .map_err(|err| map_unique_violation(err, "map name already exists in this branch"))?;
        let map = map_row(&tx, MapId::new(tx.last_insert_rowid()))?;
        tx.commit()?;

        tracing::info!(branch_id = %branch.id, map_id = %map.id, "map created");
        Ok(map)
    }

    pub fn map_get(&self, map_id: MapId) -> Result<MapRow, StoreError> {
        map_row(&self.conn, map_id)
    }

    /// Ordered by name.
    pub fn maps_list(&self, branch_id: BranchId) -> Result<Vec<MapRow>, StoreError> {
        branch_row(&self.conn, branch_id)?;
        maps_of_branch(&self.conn, branch_id)
    }

    pub fn map_update(
        &mut self,
        map_id: MapId,
        actor: &ActorId,
        patch: MapPatch,
    ) -> Result<MapRow, StoreError> {
        if patch == MapPatch::default() {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }
        let name = patch
            .name
            .map(|name| non_empty_trimmed(&name, "name must not be empty"))
            .transpose()?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let current = map_row(&tx, map_id)?;
        writable_branch(&tx, current.branch_id, actor)?;

        let mut changes = ChangeTracker::new();
        let name = changes.apply("name", current.name.clone(), name);
        let description = changes.apply("description", current.description.clone(), patch.description);
        let width = changes.apply("width", current.width, patch.width);
        let height = changes.apply("height", current.height, patch.height);
        ensure_dimensions(width, height)?;
        if !changes.has_changes() {
            return Ok(current);
        }

        tx.execute(
            "UPDATE maps SET name=?2, description=?3, width=?4, height=?5, updated_at_ms=?6 WHERE id=?1",
            params![map_id.get(), name, description, width, height, now_ms],
        )
        .map_err(|err| map_unique_violation(err, "map name already exists in this branch"))?;
        let map = map_row(&tx, map_id)?;
        tx.commit()?;

        tracing::info!(map_id = %map_id, fields = ?changes.changed_fields(), "map updated");
        Ok(map)
    }

    /// Removes the map with every snapshot, layer and object under it.
    pub fn map_delete(&mut self, map_id: MapId, actor: &ActorId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let map = map_row(&tx, map_id)?;
        writable_branch(&tx, map.branch_id, actor)?;
        tx.execute("DELETE FROM maps WHERE id=?1", params![map_id.get()])?;
        tx.commit()?;

        tracing::info!(branch_id = %map.branch_id, map_id = %map_id, "map deleted");
        Ok(())
    }
}

fn ensure_dimensions(width: i64, height: i64) -> Result<(), StoreError> {
    if width <= 0 || height <= 0 {
        return Err(StoreError::InvalidInput("map dimensions must be positive"));
    }
    Ok(())
}
