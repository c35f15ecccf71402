#![forbid(unsafe_code)]

use super::{BranchRow, Entity, StoreError, StoryRow};
use fl_core::ids::{ActorId, BranchId, StoryId};
use fl_core::model::{BranchType, CanonStatus, Visibility};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ffi, params};

pub(super) const STORY_COLUMNS: &str =
    "id, author, title, allow_branching, branch_count, linked_branch_count, created_at_ms, updated_at_ms";

pub(super) const BRANCH_COLUMNS: &str = "id, story_id, author, is_main, parent_branch_id, fork_point, name, description, \
     cover_image_url, branch_type, visibility, canon_status, version, vote_count, vote_threshold, \
     created_at_ms, updated_at_ms";

#[derive(Clone, Copy, Debug)]
pub(super) enum StoryCounter {
    Branches,
    LinkedBranches,
}

impl StoryCounter {
    fn column(self) -> &'static str {
        match self {
            Self::Branches => "branch_count",
            Self::LinkedBranches => "linked_branch_count",
        }
    }
}

pub(super) fn story_from_row(row: &Row<'_>) -> rusqlite::Result<StoryRow> {
    Ok(StoryRow {
        id: StoryId::new(row.get(0)?),
        author: decode_actor(1, row.get(1)?)?,
        title: row.get(2)?,
        allow_branching: row.get(3)?,
        branch_count: row.get(4)?,
        linked_branch_count: row.get(5)?,
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
    })
}

pub(super) fn branch_from_row(row: &Row<'_>) -> rusqlite::Result<BranchRow> {
    Ok(BranchRow {
        id: BranchId::new(row.get(0)?),
        story_id: StoryId::new(row.get(1)?),
        author: decode_actor(2, row.get(2)?)?,
        is_main: row.get(3)?,
        parent_branch_id: row.get::<_, Option<i64>>(4)?.map(BranchId::new),
        fork_point: row.get(5)?,
        name: row.get(6)?,
        description: row.get(7)?,
        cover_image_url: row.get(8)?,
        branch_type: decode_enum(9, row.get(9)?, BranchType::parse)?,
        visibility: decode_enum(10, row.get(10)?, Visibility::parse)?,
        canon_status: decode_enum(11, row.get(11)?, CanonStatus::parse)?,
        version: row.get(12)?,
        vote_count: row.get(13)?,
        vote_threshold: row.get(14)?,
        created_at_ms: row.get(15)?,
        updated_at_ms: row.get(16)?,
    })
}

pub(super) fn story_row(conn: &Connection, story_id: StoryId) -> Result<StoryRow, StoreError> {
    conn.query_row(
        &format!("SELECT {STORY_COLUMNS} FROM stories WHERE id=?1"),
        params![story_id.get()],
        story_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::Story))
}

pub(super) fn branch_row(conn: &Connection, branch_id: BranchId) -> Result<BranchRow, StoreError> {
    conn.query_row(
        &format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE id=?1"),
        params![branch_id.get()],
        branch_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::Branch))
}

pub(super) fn ensure_branch_author(
    branch: &BranchRow,
    actor: &ActorId,
    message: &'static str,
) -> Result<(), StoreError> {
    if &branch.author != actor {
        return Err(StoreError::PermissionDenied(message));
    }
    Ok(())
}

/// Loads the branch that owns a piece of content and checks `actor` may write to it.
pub(super) fn writable_branch(
    conn: &Connection,
    branch_id: BranchId,
    actor: &ActorId,
) -> Result<BranchRow, StoreError> {
    let branch = branch_row(conn, branch_id)?;
    ensure_branch_author(&branch, actor, "only the branch author may edit branch content")?;
    Ok(branch)
}

/// Atomic `col = col + delta` on a story aggregate; never read-then-write.
pub(super) fn adjust_story_counter(
    conn: &Connection,
    story_id: StoryId,
    counter: StoryCounter,
    delta: i64,
    now_ms: i64,
) -> Result<(), StoreError> {
    if delta == 0 {
        return Ok(());
    }
    let column = counter.column();
    let updated = conn.execute(
        &format!("UPDATE stories SET {column} = {column} + ?2, updated_at_ms=?3 WHERE id=?1"),
        params![story_id.get(), delta, now_ms],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound(Entity::Story));
    }
    Ok(())
}

pub(super) fn non_empty_trimmed(value: &str, message: &'static str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput(message));
    }
    Ok(trimmed.to_string())
}

pub(super) fn decode_enum<T>(
    index: usize,
    raw: String,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unknown stored value: {raw}").into(),
        )
    })
}

pub(super) fn decode_actor(index: usize, raw: String) -> rusqlite::Result<ActorId> {
    ActorId::try_new(raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, err.message().into())
    })
}

pub(super) fn decode_optional_actor(
    index: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<ActorId>> {
    raw.map(|raw| decode_actor(index, raw)).transpose()
}

/// Unique-key collisions surface as validation failures with `message`.
pub(super) fn map_unique_violation(err: rusqlite::Error, message: &'static str) -> StoreError {
    if is_constraint_violation(&err) {
        return StoreError::InvalidInput(message);
    }
    StoreError::Sql(err)
}

/// Only UNIQUE and PRIMARY KEY failures; FK, CHECK and NOT NULL stay `Sql`.
pub(super) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => {
            code.code == ErrorCode::ConstraintViolation
                && matches!(
                    code.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

pub(super) fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
