#![forbid(unsafe_code)]

use super::super::replicate::replicate_subtree_tx;
use super::super::support::{
    StoryCounter, adjust_story_counter, branch_row, non_empty_trimmed, now_ms, story_row,
};
use super::super::*;
use super::lineage::branch_depth;
use fl_core::ids::{BranchId, validate_chapter};
use fl_core::model::{BranchType, CanonStatus, Visibility};
use fl_core::{INITIAL_VERSION, check_version};
use rusqlite::params;

impl SqliteStore {
    /// Creates a private, non-canon child of `parent_branch_id`. With
    /// `replicate_content` the parent's wiki and map subtree is copied in the
    /// same transaction, so a failed copy leaves no branch behind.
    pub fn branch_fork(&mut self, request: ForkBranchRequest) -> Result<ForkedBranch, StoreError> {
        let max_depth = self.config.max_branch_depth;
        let vote_threshold = self.config.default_vote_threshold;
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let story = story_row(&tx, request.story_id)?;
        if !story.allow_branching {
            return Err(StoreError::PermissionDenied("story does not allow branching"));
        }

        let name = non_empty_trimmed(&request.name, "name must not be empty")?;

        let parent = branch_row(&tx, request.parent_branch_id)?;
        if parent.story_id != story.id {
            return Err(StoreError::InvalidInput(
                "parent branch belongs to another story",
            ));
        }

        if let Err(mismatch) = check_version(request.expected_parent_version, parent.version) {
            tracing::warn!(
                parent_branch_id = %parent.id,
                expected = mismatch.expected,
                actual = mismatch.actual,
                "fork rejected on stale parent version"
            );
            return Err(mismatch.into());
        }

        let fork_point = match request.fork_point {
            Some(chapter) => {
                if chapter.branch_id != parent.id {
                    return Err(StoreError::InvalidInput(
                        "fork point must reference a chapter of the parent branch",
                    ));
                }
                Some(validate_chapter(chapter.chapter_number)?)
            }
            None => None,
        };

        let branch_type = request.branch_type.unwrap_or(BranchType::FanFic);
        if branch_type == BranchType::Main {
            return Err(StoreError::InvalidInput(
                "branch type MAIN is reserved for the main branch",
            ));
        }

        if branch_depth(&tx, parent.id, max_depth)? + 1 > max_depth {
            return Err(StoreError::InvalidInput("branch depth exceeded"));
        }

        tx.execute(
            "INSERT INTO branches(story_id, author, is_main, parent_branch_id, fork_point, name, description, cover_image_url, \
               branch_type, visibility, canon_status, version, vote_count, vote_threshold, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?13, ?13)",
            params![
                story.id.get(),
                request.actor.as_str(),
                parent.id.get(),
                fork_point,
                name,
                request.description,
                request.cover_image_url,
                branch_type.as_str(),
                Visibility::Private.as_str(),
                CanonStatus::NonCanon.as_str(),
                INITIAL_VERSION,
                vote_threshold,
                now_ms
            ],
        )?;
        let branch_id = BranchId::new(tx.last_insert_rowid());

        adjust_story_counter(&tx, story.id, StoryCounter::Branches, 1, now_ms)?;

        let replication = if request.replicate_content {
            Some(replicate_subtree_tx(&tx, parent.id, branch_id, now_ms)?)
        } else {
            None
        };

        let branch = branch_row(&tx, branch_id)?;
        tx.commit()?;

        tracing::info!(
            story_id = %story.id,
            parent_branch_id = %parent.id,
            branch_id = %branch.id,
            replicated = replication.is_some(),
            "branch forked"
        );
        Ok(ForkedBranch {
            branch,
            replication,
        })
    }
}
