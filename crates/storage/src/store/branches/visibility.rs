#![forbid(unsafe_code)]

use super::super::support::{
    StoryCounter, adjust_story_counter, branch_row, ensure_branch_author, now_ms,
};
use super::super::*;
use fl_core::model::linked_count_delta;
use fl_core::{ChangeTracker, check_version};
use rusqlite::params;

impl SqliteStore {
    pub fn branch_update_visibility(
        &mut self,
        request: UpdateVisibilityRequest,
    ) -> Result<BranchRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let current = branch_row(&tx, request.branch_id)?;
        ensure_branch_author(
            &current,
            &request.actor,
            "only the branch author may change visibility",
        )?;
        if current.is_main {
            return Err(StoreError::InvalidInput("main branch visibility is immutable"));
        }

        if let Err(mismatch) = check_version(request.expected_version, current.version) {
            tracing::warn!(
                branch_id = %current.id,
                expected = mismatch.expected,
                actual = mismatch.actual,
                "visibility change rejected on stale version"
            );
            return Err(mismatch.into());
        }

        let mut changes = ChangeTracker::new();
        let visibility = changes.apply("visibility", current.visibility, Some(request.visibility));
        if !changes.has_changes() {
            return Ok(current);
        }

        let next_version = changes.next_version(current.version);
        let updated = tx.execute(
            "UPDATE branches SET visibility=?3, version=?4, updated_at_ms=?5 WHERE id=?1 AND version=?2",
            params![
                current.id.get(),
                current.version,
                visibility.as_str(),
                next_version,
                now_ms
            ],
        )?;
        if updated == 0 {
            let actual = branch_row(&tx, current.id)?.version;
            return Err(StoreError::VersionMismatch {
                expected: current.version,
                actual,
            });
        }

        adjust_story_counter(
            &tx,
            current.story_id,
            StoryCounter::LinkedBranches,
            linked_count_delta(current.visibility, visibility),
            now_ms,
        )?;

        let branch = branch_row(&tx, current.id)?;
        tx.commit()?;

        tracing::info!(
            branch_id = %branch.id,
            from = %current.visibility,
            to = %branch.visibility,
            version = branch.version,
            "branch visibility changed"
        );
        Ok(branch)
    }
}
