#![forbid(unsafe_code)]

use super::super::support::map_unique_violation;
use super::super::wiki::{
    TAG_COLUMNS, WIKI_ENTRY_COLUMNS, entry_tag_ids, tag_from_row, wiki_entry_from_row,
    wiki_entry_row, wiki_snapshots_of_entry,
};
use super::super::*;
use fl_core::ids::{BranchId, TagId, WikiEntryId};
use rusqlite::{Connection, params};
use std::collections::BTreeMap;

/// Returns the old tag id -> new tag id map.
pub(super) fn copy_tags(
    conn: &Connection,
    source: BranchId,
    target: BranchId,
    now_ms: i64,
) -> Result<BTreeMap<TagId, TagId>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TAG_COLUMNS} FROM wiki_tags WHERE branch_id=?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![source.get()], tag_from_row)?;
    let mut tags = Vec::new();
    for row in rows {
        tags.push(row?);
    }

    let mut tag_map = BTreeMap::new();
    for tag in tags {
        conn.execute(
            "INSERT INTO wiki_tags(branch_id, name, color, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![target.get(), tag.name, tag.color, now_ms],
        )
        .map_err(|err| map_unique_violation(err, "tag name already exists in target branch"))?;
        tag_map.insert(tag.id, TagId::new(conn.last_insert_rowid()));
    }
    Ok(tag_map)
}

pub(super) fn copy_entries(
    conn: &Connection,
    source: BranchId,
    target: BranchId,
    now_ms: i64,
    out: &mut ForkReplication,
) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WIKI_ENTRY_COLUMNS} FROM wiki_entries WHERE branch_id=?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![source.get()], wiki_entry_from_row)?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }

    for entry in entries {
        conn.execute(
            "INSERT INTO wiki_entries(branch_id, source_entry_id, name, image_url, first_appearance, hidden_note, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                target.get(),
                entry.id.get(),
                entry.name,
                entry.image_url,
                entry.first_appearance,
                entry.hidden_note,
                now_ms
            ],
        )
        .map_err(|err| map_unique_violation(err, "wiki entry name already exists in target branch"))?;
        let copy_id = WikiEntryId::new(conn.last_insert_rowid());

        for tag_id in entry_tag_ids(conn, entry.id)? {
            let Some(new_tag) = out.tag_map.get(&tag_id) else {
                return Err(StoreError::InvalidState(
                    "wiki entry carries a tag of another branch",
                ));
            };
            conn.execute(
                "INSERT INTO wiki_entry_tags(entry_id, tag_id) VALUES (?1, ?2)",
                params![copy_id.get(), new_tag.get()],
            )?;
        }

        for snapshot in wiki_snapshots_of_entry(conn, entry.id)? {
            conn.execute(
                "INSERT INTO wiki_snapshots(entry_id, valid_from_chapter, content, contributor, contributor_type, created_at_ms, updated_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    copy_id.get(),
                    snapshot.valid_from_chapter,
                    snapshot.content,
                    snapshot.contributor.as_ref().map(|actor| actor.as_str()),
                    snapshot.contributor_type.as_str(),
                    now_ms
                ],
            )?;
            out.wiki_snapshots_copied += 1;
        }

        out.wiki_entries.push(wiki_entry_row(conn, copy_id)?);
    }
    Ok(())
}
