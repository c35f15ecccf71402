#![forbid(unsafe_code)]

use super::super::support::{branch_row, map_unique_violation, now_ms};
use super::super::*;
use fl_core::ids::{ActorId, BranchId};
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    /// Records one vote and returns the new tally. The branch version is
    /// never consulted.
    pub fn branch_vote(&mut self, branch_id: BranchId, actor: &ActorId) -> Result<i64, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        branch_row(&tx, branch_id)?;

        tx.execute(
            "INSERT INTO branch_votes(branch_id, actor, created_at_ms) VALUES (?1, ?2, ?3)",
            params![branch_id.get(), actor.as_str(), now_ms],
        )
        .map_err(|err| map_unique_violation(err, "actor already voted for this branch"))?;
        tx.execute(
            "UPDATE branches SET vote_count = vote_count + 1 WHERE id=?1",
            params![branch_id.get()],
        )?;

        let vote_count = vote_count_tx(&tx, branch_id)?;
        tx.commit()?;

        tracing::debug!(branch_id = %branch_id, vote_count, "vote recorded");
        Ok(vote_count)
    }

    /// Returns `false` when the actor had no vote on the branch.
    pub fn branch_unvote(&mut self, branch_id: BranchId, actor: &ActorId) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        branch_row(&tx, branch_id)?;

        let removed = tx.execute(
            "DELETE FROM branch_votes WHERE branch_id=?1 AND actor=?2",
            params![branch_id.get(), actor.as_str()],
        )?;
        if removed == 0 {
            return Ok(false);
        }
        tx.execute(
            "UPDATE branches SET vote_count = vote_count - 1 WHERE id=?1 AND vote_count > 0",
            params![branch_id.get()],
        )?;
        tx.commit()?;

        tracing::debug!(branch_id = %branch_id, "vote withdrawn");
        Ok(true)
    }

    pub fn has_voted(&self, branch_id: BranchId, actor: &ActorId) -> Result<bool, StoreError> {
        branch_row(&self.conn, branch_id)?;
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM branch_votes WHERE branch_id=?1 AND actor=?2",
                params![branch_id.get(), actor.as_str()],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false))
    }
}

fn vote_count_tx(conn: &rusqlite::Connection, branch_id: BranchId) -> Result<i64, StoreError> {
    conn.query_row(
        "SELECT vote_count FROM branches WHERE id=?1",
        params![branch_id.get()],
        |row| row.get::<_, i64>(0),
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::Branch))
}
