#![forbid(unsafe_code)]

use super::super::support::{BRANCH_COLUMNS, branch_from_row, branch_row, story_row};
use super::super::*;
use fl_core::ids::{BranchId, StoryId};
use fl_core::model::BranchSort;
use rusqlite::params;

impl SqliteStore {
    pub fn branch_get(&self, branch_id: BranchId) -> Result<BranchRow, StoreError> {
        branch_row(&self.conn, branch_id)
    }

    pub fn branches_list(&self, request: ListBranchesRequest) -> Result<Vec<BranchRow>, StoreError> {
        story_row(&self.conn, request.story_id)?;

        let order = match request.sort {
            BranchSort::Latest => "created_at_ms DESC, id DESC",
            BranchSort::Votes => "vote_count DESC, id DESC",
        };
        let visibility = request.visibility.map(|value| value.as_str());

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches \
             WHERE story_id=?1 AND (?2 IS NULL OR visibility=?2) \
             ORDER BY {order}"
        ))?;
        let rows = stmt.query_map(
            params![request.story_id.get(), visibility],
            branch_from_row,
        )?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        tracing::debug!(story_id = %request.story_id, count = out.len(), "branches listed");
        Ok(out)
    }

    /// Non-main branches whose votes reached their threshold, most votes first.
    pub fn canon_candidates(&self, story_id: StoryId) -> Result<Vec<BranchRow>, StoreError> {
        story_row(&self.conn, story_id)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches \
             WHERE story_id=?1 AND is_main=0 AND vote_count >= vote_threshold \
             ORDER BY vote_count DESC, id ASC"
        ))?;
        let rows = stmt.query_map(params![story_id.get()], branch_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
