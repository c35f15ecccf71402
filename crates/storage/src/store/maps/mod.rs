#![forbid(unsafe_code)]

mod layers;
mod lifecycle;
mod snapshots;

use super::support::decode_enum;
use super::{
    Entity, MapLayerRow, MapLayerView, MapObjectRow, MapRow, MapSnapshotRow, MapSnapshotView,
    StoreError,
};
use fl_core::ids::{BranchId, LayerId, MapId, MapObjectId, MapSnapshotId, WikiEntryId};
use fl_core::model::{LayerType, MapObjectType};
use rusqlite::{Connection, OptionalExtension, Row, params};

pub(super) const MAP_COLUMNS: &str =
    "id, branch_id, source_entry_id, name, description, width, height, created_at_ms, updated_at_ms";

pub(super) const MAP_SNAPSHOT_COLUMNS: &str =
    "id, map_id, valid_from_chapter, base_image_url, created_at_ms";

const LAYER_COLUMNS: &str =
    "id, snapshot_id, name, layer_type, z_index, is_visible, style_json, created_at_ms";

const OBJECT_COLUMNS: &str = "id, layer_id, object_type, coordinates_json, label, description, wiki_entry_id, \
     style_json, created_at_ms";

pub(super) fn map_from_row(row: &Row<'_>) -> rusqlite::Result<MapRow> {
    Ok(MapRow {
        id: MapId::new(row.get(0)?),
        branch_id: BranchId::new(row.get(1)?),
        source_entry_id: row.get::<_, Option<i64>>(2)?.map(MapId::new),
        name: row.get(3)?,
        description: row.get(4)?,
        width: row.get(5)?,
        height: row.get(6)?,
        created_at_ms: row.get(7)?,
        updated_at_ms: row.get(8)?,
    })
}

pub(super) fn map_snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<MapSnapshotRow> {
    Ok(MapSnapshotRow {
        id: MapSnapshotId::new(row.get(0)?),
        map_id: MapId::new(row.get(1)?),
        valid_from_chapter: row.get(2)?,
        base_image_url: row.get(3)?,
        created_at_ms: row.get(4)?,
    })
}

fn layer_from_row(row: &Row<'_>) -> rusqlite::Result<MapLayerRow> {
    Ok(MapLayerRow {
        id: LayerId::new(row.get(0)?),
        snapshot_id: MapSnapshotId::new(row.get(1)?),
        name: row.get(2)?,
        layer_type: decode_enum(3, row.get(3)?, LayerType::parse)?,
        z_index: row.get(4)?,
        is_visible: row.get(5)?,
        style_json: row.get(6)?,
        created_at_ms: row.get(7)?,
    })
}

fn object_from_row(row: &Row<'_>) -> rusqlite::Result<MapObjectRow> {
    Ok(MapObjectRow {
        id: MapObjectId::new(row.get(0)?),
        layer_id: LayerId::new(row.get(1)?),
        object_type: decode_enum(2, row.get(2)?, MapObjectType::parse)?,
        coordinates: row.get(3)?,
        label: row.get(4)?,
        description: row.get(5)?,
        wiki_entry_id: row.get::<_, Option<i64>>(6)?.map(WikiEntryId::new),
        style_json: row.get(7)?,
        created_at_ms: row.get(8)?,
    })
}

pub(super) fn map_row(conn: &Connection, map_id: MapId) -> Result<MapRow, StoreError> {
    conn.query_row(
        &format!("SELECT {MAP_COLUMNS} FROM maps WHERE id=?1"),
        params![map_id.get()],
        map_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::Map))
}

pub(super) fn maps_of_branch(conn: &Connection, branch_id: BranchId) -> Result<Vec<MapRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MAP_COLUMNS} FROM maps WHERE branch_id=?1 ORDER BY name ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![branch_id.get()], map_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub(super) fn map_snapshot_row(
    conn: &Connection,
    snapshot_id: MapSnapshotId,
) -> Result<MapSnapshotRow, StoreError> {
    conn.query_row(
        &format!("SELECT {MAP_SNAPSHOT_COLUMNS} FROM map_snapshots WHERE id=?1"),
        params![snapshot_id.get()],
        map_snapshot_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::MapSnapshot))
}

/// Snapshots of one map, oldest chapter first.
pub(super) fn map_snapshots_of_map(
    conn: &Connection,
    map_id: MapId,
) -> Result<Vec<MapSnapshotRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MAP_SNAPSHOT_COLUMNS} FROM map_snapshots WHERE map_id=?1 ORDER BY valid_from_chapter ASC"
    ))?;
    let rows = stmt.query_map(params![map_id.get()], map_snapshot_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub(super) fn layer_row(conn: &Connection, layer_id: LayerId) -> Result<MapLayerRow, StoreError> {
    conn.query_row(
        &format!("SELECT {LAYER_COLUMNS} FROM map_layers WHERE id=?1"),
        params![layer_id.get()],
        layer_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::Layer))
}

pub(super) fn object_row(conn: &Connection, object_id: MapObjectId) -> Result<MapObjectRow, StoreError> {
    conn.query_row(
        &format!("SELECT {OBJECT_COLUMNS} FROM map_objects WHERE id=?1"),
        params![object_id.get()],
        object_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::MapObject))
}

/// Loads the snapshot's layers by z-index (ties by id) and each layer's
/// objects in insertion order.
pub(super) fn map_snapshot_view(
    conn: &Connection,
    snapshot: MapSnapshotRow,
) -> Result<MapSnapshotView, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LAYER_COLUMNS} FROM map_layers WHERE snapshot_id=?1 ORDER BY z_index ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![snapshot.id.get()], layer_from_row)?;
    let mut layers = Vec::new();
    for row in rows {
        layers.push(row?);
    }

    let mut object_stmt = conn.prepare(&format!(
        "SELECT {OBJECT_COLUMNS} FROM map_objects WHERE layer_id=?1 ORDER BY id ASC"
    ))?;
    let mut out = Vec::with_capacity(layers.len());
    for layer in layers {
        let rows = object_stmt.query_map(params![layer.id.get()], object_from_row)?;
        let mut objects = Vec::new();
        for row in rows {
            objects.push(row?);
        }
        out.push(MapLayerView { layer, objects });
    }

    Ok(MapSnapshotView {
        snapshot,
        layers: out,
    })
}
