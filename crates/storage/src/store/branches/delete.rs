#![forbid(unsafe_code)]

use super::super::support::{
    StoryCounter, adjust_story_counter, branch_row, ensure_branch_author, now_ms,
};
use super::super::*;
use fl_core::ids::{ActorId, BranchId};
use fl_core::model::Visibility;
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    /// Removes a leaf branch together with its votes, link requests and
    /// wiki/map content.
    pub fn branch_delete(&mut self, branch_id: BranchId, actor: &ActorId) -> Result<(), StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let branch = branch_row(&tx, branch_id)?;
        ensure_branch_author(&branch, actor, "only the branch author may delete the branch")?;

        if branch.is_main {
            return Err(StoreError::InvalidInput("main branch cannot be deleted"));
        }

        let has_children = tx
            .query_row(
                "SELECT 1 FROM branches WHERE parent_branch_id=?1 LIMIT 1",
                params![branch_id.get()],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if has_children {
            return Err(StoreError::InvalidInput(
                "branch has child branches; delete them first",
            ));
        }

        tx.execute("DELETE FROM branches WHERE id=?1", params![branch_id.get()])?;

        adjust_story_counter(&tx, branch.story_id, StoryCounter::Branches, -1, now_ms)?;
        if branch.visibility == Visibility::Linked {
            adjust_story_counter(&tx, branch.story_id, StoryCounter::LinkedBranches, -1, now_ms)?;
        }
        tx.commit()?;

        tracing::info!(story_id = %branch.story_id, branch_id = %branch_id, "branch deleted");
        Ok(())
    }
}
