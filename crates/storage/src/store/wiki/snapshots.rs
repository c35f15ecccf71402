#![forbid(unsafe_code)]

use super::super::support::{map_unique_violation, now_ms, writable_branch};
use super::super::*;
use super::{wiki_entry_row, wiki_snapshot_row, wiki_snapshots_of_entry};
use fl_core::ids::{WikiEntryId, WikiSnapshotId, validate_chapter};
use fl_core::model::ContributorType;
use rusqlite::params;

impl SqliteStore {
    /// One snapshot per chapter; a second one at the same chapter is rejected.
    /// SYSTEM snapshots carry no contributor.
    pub fn wiki_snapshot_add(
        &mut self,
        request: WikiSnapshotAddRequest,
    ) -> Result<WikiSnapshotRow, StoreError> {
        let chapter = validate_chapter(request.valid_from_chapter)?;
        let contributor = match request.contributor_type {
            ContributorType::System => None,
            ContributorType::User | ContributorType::Ai => Some(request.actor.as_str()),
        };

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let entry = wiki_entry_row(&tx, request.entry_id)?;
        writable_branch(&tx, entry.branch_id, &request.actor)?;

        tx.execute(
            "INSERT INTO wiki_snapshots(entry_id, valid_from_chapter, content, contributor, contributor_type, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                entry.id.get(),
                chapter,
                request.content,
                contributor,
                request.contributor_type.as_str(),
                now_ms
            ],
        )
        .map_err(|err| map_unique_violation(err, "snapshot already exists for this chapter"))?;
        let snapshot_id = WikiSnapshotId::new(tx.last_insert_rowid());
        let snapshot = wiki_snapshot_row(&tx, snapshot_id)?;
        tx.commit()?;

        tracing::info!(
            entry_id = %entry.id,
            snapshot_id = %snapshot.id,
            valid_from_chapter = chapter,
            "wiki snapshot added"
        );
        Ok(snapshot)
    }

    /// Rewrites content in place; chapter and attribution stay.
    pub fn wiki_snapshot_update(
        &mut self,
        request: WikiSnapshotUpdateRequest,
    ) -> Result<WikiSnapshotRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let current = wiki_snapshot_row(&tx, request.snapshot_id)?;
        let entry = wiki_entry_row(&tx, current.entry_id)?;
        writable_branch(&tx, entry.branch_id, &request.actor)?;

        if current.content == request.content {
            return Ok(current);
        }
        tx.execute(
            "UPDATE wiki_snapshots SET content=?2, updated_at_ms=?3 WHERE id=?1",
            params![current.id.get(), request.content, now_ms],
        )?;
        let snapshot = wiki_snapshot_row(&tx, current.id)?;
        tx.commit()?;

        tracing::info!(snapshot_id = %snapshot.id, "wiki snapshot updated");
        Ok(snapshot)
    }

    /// Oldest chapter first.
    pub fn wiki_snapshots_list(
        &self,
        entry_id: WikiEntryId,
    ) -> Result<Vec<WikiSnapshotRow>, StoreError> {
        wiki_entry_row(&self.conn, entry_id)?;
        wiki_snapshots_of_entry(&self.conn, entry_id)
    }
}
