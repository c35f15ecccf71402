#![forbid(unsafe_code)]

use super::super::support::{
    branch_row, map_unique_violation, non_empty_trimmed, now_ms, writable_branch,
};
use super::super::*;
use super::{
    WIKI_ENTRY_COLUMNS, entry_tag_ids, wiki_entries_of_branch, wiki_entry_from_row, wiki_entry_row,
};
use fl_core::ChangeTracker;
use fl_core::ids::{ActorId, BranchId, TagId, WikiEntryId, validate_chapter};
use fl_core::model::ContributorType;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

impl SqliteStore {
    /// Optional `initial_content` becomes a chapter-0 snapshot credited to
    /// the creator.
    pub fn wiki_entry_create(
        &mut self,
        request: WikiEntryCreateRequest,
    ) -> Result<WikiEntryRow, StoreError> {
        let name = non_empty_trimmed(&request.name, "name must not be empty")?;
        let first_appearance = request.first_appearance.map(validate_chapter).transpose()?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let branch = writable_branch(&tx, request.branch_id, &request.actor)?;

        tx.execute(
            "INSERT INTO wiki_entries(branch_id, source_entry_id, name, image_url, first_appearance, hidden_note, created_at_ms, updated_at_ms) \
             VALUES (?1, NULL, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                branch.id.get(),
                name,
                request.image_url,
                first_appearance,
                request.hidden_note,
                now_ms
            ],
        )
        .map_err(|err| map_unique_violation(err, "wiki entry name already exists in this branch"))?;
        let entry_id = WikiEntryId::new(tx.last_insert_rowid());

        if let Some(content) = request.initial_content {
            tx.execute(
                "INSERT INTO wiki_snapshots(entry_id, valid_from_chapter, content, contributor, contributor_type, created_at_ms, updated_at_ms) \
                 VALUES (?1, 0, ?2, ?3, ?4, ?5, ?5)",
                params![
                    entry_id.get(),
                    content,
                    request.actor.as_str(),
                    ContributorType::User.as_str(),
                    now_ms
                ],
            )?;
        }

        let entry = wiki_entry_row(&tx, entry_id)?;
        tx.commit()?;

        tracing::info!(branch_id = %branch.id, entry_id = %entry.id, "wiki entry created");
        Ok(entry)
    }

    pub fn wiki_entry_get(&self, entry_id: WikiEntryId) -> Result<WikiEntryRow, StoreError> {
        wiki_entry_row(&self.conn, entry_id)
    }

    /// Ordered by name. With `tag_id` only entries carrying that tag.
    pub fn wiki_entries_list(
        &self,
        request: WikiEntriesListRequest,
    ) -> Result<Vec<WikiEntryRow>, StoreError> {
        branch_row(&self.conn, request.branch_id)?;

        let Some(tag_id) = request.tag_id else {
            return wiki_entries_of_branch(&self.conn, request.branch_id);
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WIKI_ENTRY_COLUMNS} FROM wiki_entries \
             WHERE branch_id=?1 AND id IN (SELECT entry_id FROM wiki_entry_tags WHERE tag_id=?2) \
             ORDER BY name ASC, id ASC"
        ))?;
        let rows = stmt.query_map(
            params![request.branch_id.get(), tag_id.get()],
            wiki_entry_from_row,
        )?;

        let mut out = Vec::new();
        for row in rows {
            let mut entry = row?;
            entry.tag_ids = entry_tag_ids(&self.conn, entry.id)?;
            out.push(entry);
        }
        Ok(out)
    }

    /// Entries carry no version; concurrent edits are last-writer-wins.
    pub fn wiki_entry_update(
        &mut self,
        request: WikiEntryUpdateRequest,
    ) -> Result<WikiEntryRow, StoreError> {
        let WikiEntryUpdateRequest {
            entry_id,
            actor,
            patch,
        } = request;
        if patch.name.is_none()
            && patch.image_url.is_none()
            && patch.first_appearance.is_none()
            && patch.hidden_note.is_none()
        {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }
        let name = patch
            .name
            .map(|name| non_empty_trimmed(&name, "name must not be empty"))
            .transpose()?;
        if let Some(Some(chapter)) = patch.first_appearance {
            validate_chapter(chapter)?;
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let current = wiki_entry_row(&tx, entry_id)?;
        writable_branch(&tx, current.branch_id, &actor)?;

        let mut changes = ChangeTracker::new();
        let name = changes.apply("name", current.name.clone(), name);
        let image_url = changes.apply("image_url", current.image_url.clone(), patch.image_url);
        let first_appearance =
            changes.apply("first_appearance", current.first_appearance, patch.first_appearance);
        let hidden_note = changes.apply("hidden_note", current.hidden_note.clone(), patch.hidden_note);
        if !changes.has_changes() {
            return Ok(current);
        }

        tx.execute(
            "UPDATE wiki_entries SET name=?2, image_url=?3, first_appearance=?4, hidden_note=?5, updated_at_ms=?6 WHERE id=?1",
            params![entry_id.get(), name, image_url, first_appearance, hidden_note, now_ms],
        )
        .map_err(|err| map_unique_violation(err, "wiki entry name already exists in this branch"))?;

        let entry = wiki_entry_row(&tx, entry_id)?;
        tx.commit()?;

        tracing::info!(entry_id = %entry_id, fields = ?changes.changed_fields(), "wiki entry updated");
        Ok(entry)
    }

    /// Drops the entry and its snapshots. Copies forked from it keep their
    /// content and their `source_entry_id`, which is a plain back-reference.
    pub fn wiki_entry_delete(&mut self, entry_id: WikiEntryId, actor: &ActorId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let entry = wiki_entry_row(&tx, entry_id)?;
        writable_branch(&tx, entry.branch_id, actor)?;
        tx.execute("DELETE FROM wiki_entries WHERE id=?1", params![entry_id.get()])?;
        tx.commit()?;

        tracing::info!(branch_id = %entry.branch_id, entry_id = %entry_id, "wiki entry deleted");
        Ok(())
    }

    /// Replaces the tag set. Every tag must be defined on the entry's branch.
    pub fn wiki_entry_set_tags(
        &mut self,
        entry_id: WikiEntryId,
        actor: &ActorId,
        tag_ids: &[TagId],
    ) -> Result<WikiEntryRow, StoreError> {
        let tx = self.conn.transaction()?;
        let entry = wiki_entry_row(&tx, entry_id)?;
        writable_branch(&tx, entry.branch_id, actor)?;

        let wanted = tag_ids.iter().copied().collect::<BTreeSet<_>>();
        for tag_id in &wanted {
            ensure_tag_in_branch(&tx, *tag_id, entry.branch_id)?;
        }

        tx.execute(
            "DELETE FROM wiki_entry_tags WHERE entry_id=?1",
            params![entry_id.get()],
        )?;
        for tag_id in &wanted {
            tx.execute(
                "INSERT INTO wiki_entry_tags(entry_id, tag_id) VALUES (?1, ?2)",
                params![entry_id.get(), tag_id.get()],
            )?;
        }

        let entry = wiki_entry_row(&tx, entry_id)?;
        tx.commit()?;

        tracing::debug!(entry_id = %entry_id, tags = entry.tag_ids.len(), "wiki entry tags replaced");
        Ok(entry)
    }
}

fn ensure_tag_in_branch(
    conn: &Connection,
    tag_id: TagId,
    branch_id: BranchId,
) -> Result<(), StoreError> {
    let owner = conn
        .query_row(
            "SELECT branch_id FROM wiki_tags WHERE id=?1",
            params![tag_id.get()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .ok_or(StoreError::NotFound(Entity::Tag))?;
    if owner != branch_id.get() {
        return Err(StoreError::InvalidInput("tag belongs to another branch"));
    }
    Ok(())
}
