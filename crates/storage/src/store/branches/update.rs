#![forbid(unsafe_code)]

use super::super::support::{branch_row, ensure_branch_author, non_empty_trimmed, now_ms};
use super::super::*;
use fl_core::model::BranchType;
use fl_core::{ChangeTracker, check_version};
use rusqlite::params;

impl SqliteStore {
    /// Applies the present patch fields. The version moves only when at
    /// least one field actually differs from the stored value.
    pub fn branch_update(&mut self, request: UpdateBranchRequest) -> Result<BranchRow, StoreError> {
        let UpdateBranchRequest {
            branch_id,
            actor,
            expected_version,
            patch,
        } = request;

        if patch.is_empty() {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }
        let name = patch
            .name
            .map(|name| non_empty_trimmed(&name, "name must not be empty"))
            .transpose()?;
        if let Some(threshold) = patch.vote_threshold
            && threshold < 0
        {
            return Err(StoreError::InvalidInput("vote_threshold must be >= 0"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let current = branch_row(&tx, branch_id)?;
        ensure_branch_author(&current, &actor, "only the branch author may edit the branch")?;

        if let Err(mismatch) = check_version(expected_version, current.version) {
            tracing::warn!(
                branch_id = %branch_id,
                expected = mismatch.expected,
                actual = mismatch.actual,
                "branch update rejected on stale version"
            );
            return Err(mismatch.into());
        }

        if let Some(branch_type) = patch.branch_type
            && (branch_type == BranchType::Main) != current.is_main
        {
            return Err(StoreError::InvalidInput(
                "branch type MAIN is reserved for the main branch",
            ));
        }

        let mut changes = ChangeTracker::new();
        let name = changes.apply("name", current.name.clone(), name);
        let description = changes.apply("description", current.description.clone(), patch.description);
        let cover_image_url =
            changes.apply("cover_image_url", current.cover_image_url.clone(), patch.cover_image_url);
        let branch_type = changes.apply("branch_type", current.branch_type, patch.branch_type);
        let vote_threshold = changes.apply("vote_threshold", current.vote_threshold, patch.vote_threshold);

        if !changes.has_changes() {
            tracing::debug!(branch_id = %branch_id, "branch update was a no-op");
            return Ok(current);
        }

        let next_version = changes.next_version(current.version);
        let updated = tx.execute(
            "UPDATE branches SET name=?3, description=?4, cover_image_url=?5, branch_type=?6, \
               vote_threshold=?7, version=?8, updated_at_ms=?9 \
             WHERE id=?1 AND version=?2",
            params![
                branch_id.get(),
                current.version,
                name,
                description,
                cover_image_url,
                branch_type.as_str(),
                vote_threshold,
                next_version,
                now_ms
            ],
        )?;
        if updated == 0 {
            let actual = branch_row(&tx, branch_id)?.version;
            return Err(StoreError::VersionMismatch {
                expected: current.version,
                actual,
            });
        }

        let branch = branch_row(&tx, branch_id)?;
        tx.commit()?;

        tracing::info!(
            branch_id = %branch.id,
            version = branch.version,
            fields = ?changes.changed_fields(),
            "branch updated"
        );
        Ok(branch)
    }
}
