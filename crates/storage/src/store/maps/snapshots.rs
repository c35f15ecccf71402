#![forbid(unsafe_code)]

use super::super::support::{map_unique_violation, now_ms, writable_branch};
use super::super::*;
use super::{map_row, map_snapshot_row, map_snapshots_of_map};
use fl_core::ids::{MapId, MapSnapshotId, validate_chapter};
use rusqlite::params;

impl SqliteStore {
    /// Starts an empty snapshot; layers and objects are added separately.
    pub fn map_snapshot_create(
        &mut self,
        request: MapSnapshotCreateRequest,
    ) -> Result<MapSnapshotRow, StoreError> {
        let chapter = validate_chapter(request.valid_from_chapter)?;
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let map = map_row(&tx, request.map_id)?;
        writable_branch(&tx, map.branch_id, &request.actor)?;

        tx.execute(
            "INSERT INTO map_snapshots(map_id, valid_from_chapter, base_image_url, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![map.id.get(), chapter, request.base_image_url, now_ms],
        )
        .map_err(|err| map_unique_violation(err, "snapshot already exists for this chapter"))?;
        let snapshot = map_snapshot_row(&tx, MapSnapshotId::new(tx.last_insert_rowid()))?;
        tx.commit()?;

        tracing::info!(
            map_id = %map.id,
            snapshot_id = %snapshot.id,
            valid_from_chapter = chapter,
            "map snapshot created"
        );
        Ok(snapshot)
    }

    /// Oldest chapter first, without layers.
    pub fn map_snapshots_list(&self, map_id: MapId) -> Result<Vec<MapSnapshotRow>, StoreError> {
        map_row(&self.conn, map_id)?;
        map_snapshots_of_map(&self.conn, map_id)
    }
}
