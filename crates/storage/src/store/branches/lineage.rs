#![forbid(unsafe_code)]

use super::super::support::branch_row;
use super::super::*;
use fl_core::ids::BranchId;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

impl SqliteStore {
    /// `branch_id` first, then each ancestor up to the main branch.
    pub fn branch_lineage(&self, branch_id: BranchId) -> Result<Vec<BranchRow>, StoreError> {
        let max_depth = self.config.max_branch_depth;
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = Some(branch_id);

        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(StoreError::InvalidState("branch parent cycle"));
            }
            if out.len() > max_depth {
                return Err(StoreError::InvalidInput("branch depth exceeded"));
            }
            let branch = branch_row(&self.conn, id)?;
            current = branch.parent_branch_id;
            out.push(branch);
        }

        Ok(out)
    }
}

/// Number of parent hops from `branch_id` to the root.
pub(super) fn branch_depth(
    conn: &Connection,
    branch_id: BranchId,
    max_depth: usize,
) -> Result<usize, StoreError> {
    let mut current = Some(branch_id);
    let mut depth = 0usize;
    let mut seen = BTreeSet::new();

    while let Some(branch) = current {
        if !seen.insert(branch) {
            return Err(StoreError::InvalidState("branch parent cycle"));
        }

        let parent = conn
            .query_row(
                "SELECT parent_branch_id FROM branches WHERE id=?1",
                params![branch.get()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound(Entity::Branch))?;

        current = parent.map(BranchId::new);
        if current.is_some() {
            depth = depth.saturating_add(1);
            if depth > max_depth {
                return Err(StoreError::InvalidInput("branch depth exceeded"));
            }
        }
    }

    Ok(depth)
}
