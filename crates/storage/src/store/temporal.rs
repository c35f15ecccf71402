#![forbid(unsafe_code)]

//! Spoiler-safe reads: a reader at chapter `n` sees, per entry, the
//! snapshot with the greatest `valid_from_chapter <= n` and nothing newer.

use super::maps::{MAP_SNAPSHOT_COLUMNS, map_row, map_snapshot_from_row, map_snapshot_view};
use super::support::branch_row;
use super::wiki::{
    WIKI_SNAPSHOT_COLUMNS, wiki_entries_of_branch, wiki_entry_row, wiki_snapshot_from_row,
};
use super::*;
use fl_core::ids::{BranchId, MapId, WikiEntryId, validate_chapter};
use fl_core::resolve_at;
use rusqlite::{OptionalExtension, params};
use std::collections::BTreeMap;

impl SqliteStore {
    pub fn wiki_snapshot_at(
        &self,
        entry_id: WikiEntryId,
        chapter: i64,
    ) -> Result<Option<WikiSnapshotRow>, StoreError> {
        let chapter = validate_chapter(chapter)?;
        wiki_entry_row(&self.conn, entry_id)?;

        let snapshot = self
            .conn
            .query_row(
                &format!(
                    "SELECT {WIKI_SNAPSHOT_COLUMNS} FROM wiki_snapshots \
                     WHERE entry_id=?1 AND valid_from_chapter <= ?2 \
                     ORDER BY valid_from_chapter DESC LIMIT 1"
                ),
                params![entry_id.get(), chapter],
                wiki_snapshot_from_row,
            )
            .optional()?;

        tracing::debug!(
            entry_id = %entry_id,
            chapter,
            resolved = snapshot.as_ref().map(|row| row.valid_from_chapter),
            "wiki snapshot resolved"
        );
        Ok(snapshot)
    }

    pub fn wiki_entry_with_context(
        &self,
        entry_id: WikiEntryId,
        chapter: i64,
    ) -> Result<WikiEntryWithContext, StoreError> {
        let snapshot = self.wiki_snapshot_at(entry_id, chapter)?;
        let entry = wiki_entry_row(&self.conn, entry_id)?;
        Ok(WikiEntryWithContext { entry, snapshot })
    }

    /// Every entry of the branch (by name) paired with what a reader at
    /// `chapter` may see. Loads all snapshots once and resolves in memory.
    pub fn wiki_timeline_at(
        &self,
        branch_id: BranchId,
        chapter: i64,
    ) -> Result<Vec<WikiEntryWithContext>, StoreError> {
        let chapter = validate_chapter(chapter)?;
        branch_row(&self.conn, branch_id)?;

        let entries = wiki_entries_of_branch(&self.conn, branch_id)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM wiki_snapshots s \
             JOIN wiki_entries e ON e.id = s.entry_id \
             WHERE e.branch_id=?1 \
             ORDER BY s.entry_id ASC, s.valid_from_chapter ASC",
            qualified(WIKI_SNAPSHOT_COLUMNS, "s")
        ))?;
        let rows = stmt.query_map(params![branch_id.get()], wiki_snapshot_from_row)?;

        let mut by_entry: BTreeMap<WikiEntryId, Vec<WikiSnapshotRow>> = BTreeMap::new();
        for row in rows {
            let snapshot = row?;
            by_entry.entry(snapshot.entry_id).or_default().push(snapshot);
        }

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let snapshot = by_entry
                .get(&entry.id)
                .and_then(|snapshots| resolve_at(snapshots, chapter))
                .cloned();
            out.push(WikiEntryWithContext { entry, snapshot });
        }
        Ok(out)
    }

    /// The snapshot in effect at `chapter` with its full layer tree.
    pub fn map_snapshot_at(
        &self,
        map_id: MapId,
        chapter: i64,
    ) -> Result<Option<MapSnapshotView>, StoreError> {
        let chapter = validate_chapter(chapter)?;
        map_row(&self.conn, map_id)?;

        let snapshot = self
            .conn
            .query_row(
                &format!(
                    "SELECT {MAP_SNAPSHOT_COLUMNS} FROM map_snapshots \
                     WHERE map_id=?1 AND valid_from_chapter <= ?2 \
                     ORDER BY valid_from_chapter DESC LIMIT 1"
                ),
                params![map_id.get(), chapter],
                map_snapshot_from_row,
            )
            .optional()?;

        tracing::debug!(
            map_id = %map_id,
            chapter,
            resolved = snapshot.as_ref().map(|row| row.valid_from_chapter),
            "map snapshot resolved"
        );
        snapshot
            .map(|snapshot| map_snapshot_view(&self.conn, snapshot))
            .transpose()
    }

    pub fn map_with_context(&self, map_id: MapId, chapter: i64) -> Result<MapWithContext, StoreError> {
        let snapshot = self.map_snapshot_at(map_id, chapter)?;
        let map = map_row(&self.conn, map_id)?;
        Ok(MapWithContext { map, snapshot })
    }
}

fn qualified(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|column| format!("{alias}.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
