#![forbid(unsafe_code)]

use super::super::maps::{
    MAP_COLUMNS, map_from_row, map_row, map_snapshot_view, map_snapshots_of_map,
};
use super::super::support::map_unique_violation;
use super::super::*;
use fl_core::ids::{BranchId, LayerId, MapId, MapSnapshotId};
use rusqlite::{Connection, params};

pub(super) fn copy_maps(
    conn: &Connection,
    source: BranchId,
    target: BranchId,
    now_ms: i64,
    out: &mut ForkReplication,
) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MAP_COLUMNS} FROM maps WHERE branch_id=?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![source.get()], map_from_row)?;
    let mut maps = Vec::new();
    for row in rows {
        maps.push(row?);
    }

    for map in maps {
        conn.execute(
            "INSERT INTO maps(branch_id, source_entry_id, name, description, width, height, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                target.get(),
                map.id.get(),
                map.name,
                map.description,
                map.width,
                map.height,
                now_ms
            ],
        )
        .map_err(|err| map_unique_violation(err, "map name already exists in target branch"))?;
        let copy_id = MapId::new(conn.last_insert_rowid());

        for snapshot in map_snapshots_of_map(conn, map.id)? {
            let view = map_snapshot_view(conn, snapshot)?;
            copy_snapshot(conn, copy_id, &view, now_ms, out)?;
        }

        out.maps.push(map_row(conn, copy_id)?);
    }
    Ok(())
}

fn copy_snapshot(
    conn: &Connection,
    map_id: MapId,
    view: &MapSnapshotView,
    now_ms: i64,
    out: &mut ForkReplication,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO map_snapshots(map_id, valid_from_chapter, base_image_url, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
        params![
            map_id.get(),
            view.snapshot.valid_from_chapter,
            view.snapshot.base_image_url,
            now_ms
        ],
    )?;
    let snapshot_id = MapSnapshotId::new(conn.last_insert_rowid());
    out.map_snapshots_copied += 1;

    for entry in &view.layers {
        let layer = &entry.layer;
        conn.execute(
            "INSERT INTO map_layers(snapshot_id, name, layer_type, z_index, is_visible, style_json, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                snapshot_id.get(),
                layer.name,
                layer.layer_type.as_str(),
                layer.z_index,
                layer.is_visible,
                layer.style_json,
                now_ms
            ],
        )?;
        let layer_id = LayerId::new(conn.last_insert_rowid());
        out.layers_copied += 1;

        for object in &entry.objects {
            conn.execute(
                "INSERT INTO map_objects(layer_id, object_type, coordinates_json, label, description, wiki_entry_id, style_json, created_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    layer_id.get(),
                    object.object_type.as_str(),
                    object.coordinates,
                    object.label,
                    object.description,
                    object.wiki_entry_id.map(|id| id.get()),
                    object.style_json,
                    now_ms
                ],
            )?;
            out.objects_copied += 1;
        }
    }
    Ok(())
}
