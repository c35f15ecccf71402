#![forbid(unsafe_code)]

mod entries;
mod snapshots;
mod tags;

use super::support::{decode_enum, decode_optional_actor};
use super::{Entity, StoreError, TagRow, WikiEntryRow, WikiSnapshotRow};
use fl_core::ids::{BranchId, TagId, WikiEntryId, WikiSnapshotId};
use fl_core::model::ContributorType;
use rusqlite::{Connection, OptionalExtension, Row, params};

pub(super) const WIKI_ENTRY_COLUMNS: &str = "id, branch_id, source_entry_id, name, image_url, first_appearance, hidden_note, \
     created_at_ms, updated_at_ms";

pub(super) const WIKI_SNAPSHOT_COLUMNS: &str = "id, entry_id, valid_from_chapter, content, contributor, contributor_type, \
     created_at_ms, updated_at_ms";

pub(super) const TAG_COLUMNS: &str = "id, branch_id, name, color, created_at_ms";

/// Decodes the entry columns only; callers fill `tag_ids`.
pub(super) fn wiki_entry_from_row(row: &Row<'_>) -> rusqlite::Result<WikiEntryRow> {
    Ok(WikiEntryRow {
        id: WikiEntryId::new(row.get(0)?),
        branch_id: BranchId::new(row.get(1)?),
        source_entry_id: row.get::<_, Option<i64>>(2)?.map(WikiEntryId::new),
        name: row.get(3)?,
        image_url: row.get(4)?,
        first_appearance: row.get(5)?,
        hidden_note: row.get(6)?,
        tag_ids: Vec::new(),
        created_at_ms: row.get(7)?,
        updated_at_ms: row.get(8)?,
    })
}

pub(super) fn wiki_snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<WikiSnapshotRow> {
    Ok(WikiSnapshotRow {
        id: WikiSnapshotId::new(row.get(0)?),
        entry_id: WikiEntryId::new(row.get(1)?),
        valid_from_chapter: row.get(2)?,
        content: row.get(3)?,
        contributor: decode_optional_actor(4, row.get(4)?)?,
        contributor_type: decode_enum(5, row.get(5)?, ContributorType::parse)?,
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
    })
}

pub(super) fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<TagRow> {
    Ok(TagRow {
        id: TagId::new(row.get(0)?),
        branch_id: BranchId::new(row.get(1)?),
        name: row.get(2)?,
        color: row.get(3)?,
        created_at_ms: row.get(4)?,
    })
}

pub(super) fn wiki_entry_row(
    conn: &Connection,
    entry_id: WikiEntryId,
) -> Result<WikiEntryRow, StoreError> {
    let mut entry = conn
        .query_row(
            &format!("SELECT {WIKI_ENTRY_COLUMNS} FROM wiki_entries WHERE id=?1"),
            params![entry_id.get()],
            wiki_entry_from_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound(Entity::WikiEntry))?;
    entry.tag_ids = entry_tag_ids(conn, entry.id)?;
    Ok(entry)
}

/// Every entry of a branch ordered by name, tags included.
pub(super) fn wiki_entries_of_branch(
    conn: &Connection,
    branch_id: BranchId,
) -> Result<Vec<WikiEntryRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WIKI_ENTRY_COLUMNS} FROM wiki_entries WHERE branch_id=?1 ORDER BY name ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![branch_id.get()], wiki_entry_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        let mut entry = row?;
        entry.tag_ids = entry_tag_ids(conn, entry.id)?;
        out.push(entry);
    }
    Ok(out)
}

pub(super) fn entry_tag_ids(
    conn: &Connection,
    entry_id: WikiEntryId,
) -> Result<Vec<TagId>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT tag_id FROM wiki_entry_tags WHERE entry_id=?1 ORDER BY tag_id ASC")?;
    let rows = stmt.query_map(params![entry_id.get()], |row| row.get::<_, i64>(0))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(TagId::new(row?));
    }
    Ok(out)
}

pub(super) fn wiki_snapshot_row(
    conn: &Connection,
    snapshot_id: WikiSnapshotId,
) -> Result<WikiSnapshotRow, StoreError> {
    conn.query_row(
        &format!("SELECT {WIKI_SNAPSHOT_COLUMNS} FROM wiki_snapshots WHERE id=?1"),
        params![snapshot_id.get()],
        wiki_snapshot_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::WikiSnapshot))
}

/// Snapshots of one entry, oldest chapter first.
pub(super) fn wiki_snapshots_of_entry(
    conn: &Connection,
    entry_id: WikiEntryId,
) -> Result<Vec<WikiSnapshotRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WIKI_SNAPSHOT_COLUMNS} FROM wiki_snapshots WHERE entry_id=?1 ORDER BY valid_from_chapter ASC"
    ))?;
    let rows = stmt.query_map(params![entry_id.get()], wiki_snapshot_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub(super) fn tags_of_branch(conn: &Connection, branch_id: BranchId) -> Result<Vec<TagRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TAG_COLUMNS} FROM wiki_tags WHERE branch_id=?1 ORDER BY name ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![branch_id.get()], tag_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
