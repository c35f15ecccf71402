#![forbid(unsafe_code)]

use super::support::{
    StoryCounter, adjust_story_counter, branch_row, map_unique_violation, non_empty_trimmed,
    now_ms, story_row,
};
use super::*;
use fl_core::INITIAL_VERSION;
use fl_core::ids::{ActorId, BranchId, StoryId};
use fl_core::model::{BranchType, CanonStatus, Visibility};
use rusqlite::{Connection, OptionalExtension, params};

impl SqliteStore {
    /// Creates the story and its main branch in one transaction.
    pub fn story_create(
        &mut self,
        request: CreateStoryRequest,
    ) -> Result<(StoryRow, BranchRow), StoreError> {
        let title = non_empty_trimmed(&request.title, "title must not be empty")?;
        let main_name = match request.main_branch_name.trim() {
            "" => title.clone(),
            name => name.to_string(),
        };

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO stories(author, title, allow_branching, branch_count, linked_branch_count, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, ?3, 0, 0, ?4, ?4)",
            params![
                request.author.as_str(),
                title,
                request.allow_branching,
                now_ms
            ],
        )?;
        let story_id = StoryId::new(tx.last_insert_rowid());

        let main_id = insert_main_branch_tx(
            &tx,
            story_id,
            &request.author,
            &main_name,
            self.config.default_vote_threshold,
            now_ms,
        )?;

        let story = story_row(&tx, story_id)?;
        let main = branch_row(&tx, main_id)?;
        tx.commit()?;

        tracing::info!(story_id = %story.id, main_branch_id = %main.id, "story created");
        Ok((story, main))
    }

    pub fn story_get(&self, story_id: StoryId) -> Result<StoryRow, StoreError> {
        story_row(&self.conn, story_id)
    }

    /// createMain for a story that has none yet. Fails once one exists.
    pub fn create_main_branch(
        &mut self,
        story_id: StoryId,
        actor: &ActorId,
        name: &str,
    ) -> Result<BranchRow, StoreError> {
        let name = non_empty_trimmed(name, "name must not be empty")?;
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let story = story_row(&tx, story_id)?;
        if &story.author != actor {
            return Err(StoreError::PermissionDenied(
                "only the story author may create the main branch",
            ));
        }
        let main_id = insert_main_branch_tx(
            &tx,
            story_id,
            actor,
            &name,
            self.config.default_vote_threshold,
            now_ms,
        )?;
        let main = branch_row(&tx, main_id)?;
        tx.commit()?;
        tracing::info!(story_id = %story_id, branch_id = %main.id, "main branch created");
        Ok(main)
    }

    pub fn story_set_allow_branching(
        &mut self,
        story_id: StoryId,
        actor: &ActorId,
        allow_branching: bool,
    ) -> Result<StoryRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let story = story_row(&tx, story_id)?;
        if &story.author != actor {
            return Err(StoreError::PermissionDenied(
                "only the story author may change branching policy",
            ));
        }
        tx.execute(
            "UPDATE stories SET allow_branching=?2, updated_at_ms=?3 WHERE id=?1",
            params![story_id.get(), allow_branching, now_ms],
        )?;
        let story = story_row(&tx, story_id)?;
        tx.commit()?;
        tracing::info!(story_id = %story_id, allow_branching, "branching policy changed");
        Ok(story)
    }

    /// Hard delete; every branch and piece of branch content goes with it.
    pub fn story_delete(&mut self, story_id: StoryId, actor: &ActorId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let story = story_row(&tx, story_id)?;
        if &story.author != actor {
            return Err(StoreError::PermissionDenied(
                "only the story author may delete the story",
            ));
        }
        tx.execute("DELETE FROM stories WHERE id=?1", params![story_id.get()])?;
        tx.commit()?;
        tracing::info!(story_id = %story_id, "story deleted");
        Ok(())
    }

    pub fn main_branch_get(&self, story_id: StoryId) -> Result<BranchRow, StoreError> {
        let main_id = self
            .conn
            .query_row(
                "SELECT id FROM branches WHERE story_id=?1 AND is_main=1",
                params![story_id.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound(Entity::Branch))?;
        branch_row(&self.conn, BranchId::new(main_id))
    }
}

fn insert_main_branch_tx(
    conn: &Connection,
    story_id: StoryId,
    author: &ActorId,
    name: &str,
    vote_threshold: i64,
    now_ms: i64,
) -> Result<BranchId, StoreError> {
    let existing = conn
        .query_row(
            "SELECT 1 FROM branches WHERE story_id=?1 AND is_main=1",
            params![story_id.get()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(StoreError::InvalidInput("story already has a main branch"));
    }

    conn.execute(
        "INSERT INTO branches(story_id, author, is_main, parent_branch_id, fork_point, name, description, cover_image_url, \
           branch_type, visibility, canon_status, version, vote_count, vote_threshold, created_at_ms, updated_at_ms) \
         VALUES (?1, ?2, 1, NULL, NULL, ?3, '', NULL, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?9)",
        params![
            story_id.get(),
            author.as_str(),
            name,
            BranchType::Main.as_str(),
            Visibility::Public.as_str(),
            CanonStatus::NonCanon.as_str(),
            INITIAL_VERSION,
            vote_threshold,
            now_ms
        ],
    )
    .map_err(|err| map_unique_violation(err, "story already has a main branch"))?;
    let branch_id = BranchId::new(conn.last_insert_rowid());

    adjust_story_counter(conn, story_id, StoryCounter::Branches, 1, now_ms)?;
    Ok(branch_id)
}
