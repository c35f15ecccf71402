#![forbid(unsafe_code)]

//! Deep copy of a branch's wiki and map content into another branch.
//!
//! Tags go first so entry tag links can be remapped, then wiki entries
//! (each with its snapshots, oldest chapter first), then maps (snapshots,
//! layers by z-index, objects). Every copy records its source through
//! `source_entry_id`. Map object wiki links are copied as stored and keep
//! pointing at the source branch's entries.

mod maps;
mod wiki;

use super::support::{branch_row, now_ms, writable_branch};
use super::*;
use fl_core::ids::{ActorId, BranchId};
use rusqlite::Connection;

impl SqliteStore {
    /// Copies `source`'s content into `target` in one transaction. `actor`
    /// must author the target branch.
    pub fn fork_subtree(
        &mut self,
        source: BranchId,
        target: BranchId,
        actor: &ActorId,
    ) -> Result<ForkReplication, StoreError> {
        if source == target {
            return Err(StoreError::InvalidInput(
                "source and target branch must differ",
            ));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let source_branch = branch_row(&tx, source)?;
        let target_branch = writable_branch(&tx, target, actor)?;
        if source_branch.story_id != target_branch.story_id {
            return Err(StoreError::InvalidInput(
                "source and target branch belong to different stories",
            ));
        }

        let replication = replicate_subtree_tx(&tx, source, target, now_ms)?;
        tx.commit()?;

        tracing::info!(
            source_branch_id = %source,
            target_branch_id = %target,
            wiki_entries = replication.wiki_entries.len(),
            maps = replication.maps.len(),
            "branch content replicated"
        );
        Ok(replication)
    }
}

/// Runs inside the caller's transaction; any error leaves the caller to
/// drop it, which discards every row copied so far.
pub(super) fn replicate_subtree_tx(
    conn: &Connection,
    source: BranchId,
    target: BranchId,
    now_ms: i64,
) -> Result<ForkReplication, StoreError> {
    let mut out = ForkReplication {
        tag_map: wiki::copy_tags(conn, source, target, now_ms)?,
        ..ForkReplication::default()
    };
    wiki::copy_entries(conn, source, target, now_ms, &mut out)?;
    maps::copy_maps(conn, source, target, now_ms, &mut out)?;

    tracing::debug!(
        source_branch_id = %source,
        target_branch_id = %target,
        tags = out.tag_map.len(),
        wiki_snapshots = out.wiki_snapshots_copied,
        map_snapshots = out.map_snapshots_copied,
        layers = out.layers_copied,
        objects = out.objects_copied,
        "subtree copied"
    );
    Ok(out)
}
