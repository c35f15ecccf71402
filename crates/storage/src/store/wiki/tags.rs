#![forbid(unsafe_code)]

use super::super::support::{
    branch_row, map_unique_violation, non_empty_trimmed, now_ms, writable_branch,
};
use super::super::*;
use super::{TAG_COLUMNS, tag_from_row, tags_of_branch};
use fl_core::ids::{ActorId, BranchId, TagId};
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    pub fn wiki_tag_create(&mut self, request: TagCreateRequest) -> Result<TagRow, StoreError> {
        let name = non_empty_trimmed(&request.name, "tag name must not be empty")?;
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let branch = writable_branch(&tx, request.branch_id, &request.actor)?;

        tx.execute(
            "INSERT INTO wiki_tags(branch_id, name, color, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![branch.id.get(), name, request.color, now_ms],
        )
        .map_err(|err| map_unique_violation(err, "tag name already exists in this branch"))?;
        let tag_id = TagId::new(tx.last_insert_rowid());

        let tag = tx
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM wiki_tags WHERE id=?1"),
                params![tag_id.get()],
                tag_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(Entity::Tag))?;
        tx.commit()?;

        tracing::info!(branch_id = %branch.id, tag_id = %tag.id, "wiki tag created");
        Ok(tag)
    }

    pub fn wiki_tags_list(&self, branch_id: BranchId) -> Result<Vec<TagRow>, StoreError> {
        branch_row(&self.conn, branch_id)?;
        tags_of_branch(&self.conn, branch_id)
    }

    /// Also detaches the tag from every entry carrying it.
    pub fn wiki_tag_delete(&mut self, tag_id: TagId, actor: &ActorId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let branch_id = tx
            .query_row(
                "SELECT branch_id FROM wiki_tags WHERE id=?1",
                params![tag_id.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map(BranchId::new)
            .ok_or(StoreError::NotFound(Entity::Tag))?;
        writable_branch(&tx, branch_id, actor)?;

        tx.execute("DELETE FROM wiki_tags WHERE id=?1", params![tag_id.get()])?;
        tx.commit()?;

        tracing::info!(branch_id = %branch_id, tag_id = %tag_id, "wiki tag deleted");
        Ok(())
    }
}
