#![forbid(unsafe_code)]

use super::support::{
    StoryCounter, adjust_story_counter, branch_row, decode_enum, decode_optional_actor,
    ensure_branch_author, is_constraint_violation, now_ms, story_row,
};
use super::*;
use fl_core::ids::{ActorId, BranchId, LinkRequestId};
use fl_core::model::{LinkRequestStatus, Visibility};
use rusqlite::{Connection, OptionalExtension, Row, params};

const LINK_REQUEST_COLUMNS: &str =
    "id, branch_id, status, request_message, reviewer, review_comment, reviewed_at_ms, created_at_ms";

impl SqliteStore {
    /// Opens a PENDING request asking the story author to link the branch.
    pub fn link_request_create(
        &mut self,
        request: CreateLinkRequest,
    ) -> Result<LinkRequestRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let branch = branch_row(&tx, request.branch_id)?;

        if branch.is_main {
            return Err(StoreError::InvalidInput(
                "main branch cannot request a link",
            ));
        }
        ensure_branch_author(
            &branch,
            &request.requester,
            "only the branch author may request a link",
        )?;
        if branch.visibility == Visibility::Linked {
            return Err(StoreError::InvalidState("branch is already linked"));
        }
        if pending_request_id(&tx, branch.id)?.is_some() {
            return Err(StoreError::InvalidState(
                "branch already has a pending link request",
            ));
        }

        tx.execute(
            "INSERT INTO link_requests(branch_id, status, request_message, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![
                branch.id.get(),
                LinkRequestStatus::Pending.as_str(),
                request.message,
                now_ms
            ],
        )
        .map_err(|err| {
            if is_constraint_violation(&err) {
                StoreError::InvalidState("branch already has a pending link request")
            } else {
                StoreError::Sql(err)
            }
        })?;
        let request_id = LinkRequestId::new(tx.last_insert_rowid());
        let row = link_request_row(&tx, request_id)?;
        tx.commit()?;

        tracing::info!(branch_id = %branch.id, request_id = %request_id, "link request opened");
        Ok(row)
    }

    /// PENDING -> APPROVED. Links the branch and bumps its version.
    pub fn link_request_approve(
        &mut self,
        request: ReviewLinkRequest,
    ) -> Result<LinkRequestRow, StoreError> {
        self.review_link_request(request, LinkRequestStatus::Approved)
    }

    /// PENDING -> REJECTED. The branch is left as it is.
    pub fn link_request_reject(
        &mut self,
        request: ReviewLinkRequest,
    ) -> Result<LinkRequestRow, StoreError> {
        self.review_link_request(request, LinkRequestStatus::Rejected)
    }

    pub fn link_request_get(&self, request_id: LinkRequestId) -> Result<LinkRequestRow, StoreError> {
        link_request_row(&self.conn, request_id)
    }

    /// Newest first; ties on creation time fall back to id.
    pub fn link_requests_list(
        &self,
        request: ListLinkRequestsRequest,
    ) -> Result<Vec<LinkRequestRow>, StoreError> {
        branch_row(&self.conn, request.branch_id)?;

        let status = request.status.map(|value| value.as_str());
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LINK_REQUEST_COLUMNS} FROM link_requests \
             WHERE branch_id=?1 AND (?2 IS NULL OR status=?2) \
             ORDER BY created_at_ms DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![request.branch_id.get(), status], link_request_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn review_link_request(
        &mut self,
        request: ReviewLinkRequest,
        outcome: LinkRequestStatus,
    ) -> Result<LinkRequestRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let current = link_request_row(&tx, request.request_id)?;
        let branch = branch_row(&tx, current.branch_id)?;
        let story = story_row(&tx, branch.story_id)?;

        ensure_reviewer(&story, &request.reviewer)?;
        if current.status.is_terminal() {
            return Err(StoreError::InvalidState("link request is already resolved"));
        }
        if outcome == LinkRequestStatus::Approved && branch.visibility == Visibility::Linked {
            return Err(StoreError::InvalidState("branch is already linked"));
        }

        let updated = tx.execute(
            "UPDATE link_requests SET status=?2, reviewer=?3, review_comment=?4, reviewed_at_ms=?5 \
             WHERE id=?1 AND status=?6",
            params![
                current.id.get(),
                outcome.as_str(),
                request.reviewer.as_str(),
                request.comment,
                now_ms,
                LinkRequestStatus::Pending.as_str()
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::InvalidState("link request is already resolved"));
        }

        if outcome == LinkRequestStatus::Approved {
            tx.execute(
                "UPDATE branches SET visibility=?2, version = version + 1, updated_at_ms=?3 WHERE id=?1",
                params![branch.id.get(), Visibility::Linked.as_str(), now_ms],
            )?;
            adjust_story_counter(&tx, story.id, StoryCounter::LinkedBranches, 1, now_ms)?;
        }

        let row = link_request_row(&tx, current.id)?;
        tx.commit()?;

        tracing::info!(
            request_id = %row.id,
            branch_id = %branch.id,
            status = %row.status,
            "link request reviewed"
        );
        Ok(row)
    }
}

fn ensure_reviewer(story: &StoryRow, reviewer: &ActorId) -> Result<(), StoreError> {
    if &story.author != reviewer {
        return Err(StoreError::PermissionDenied(
            "only the story author may review link requests",
        ));
    }
    Ok(())
}

fn pending_request_id(
    conn: &Connection,
    branch_id: BranchId,
) -> Result<Option<LinkRequestId>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id FROM link_requests WHERE branch_id=?1 AND status=?2",
            params![branch_id.get(), LinkRequestStatus::Pending.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .map(LinkRequestId::new))
}

fn link_request_row(
    conn: &Connection,
    request_id: LinkRequestId,
) -> Result<LinkRequestRow, StoreError> {
    conn.query_row(
        &format!("SELECT {LINK_REQUEST_COLUMNS} FROM link_requests WHERE id=?1"),
        params![request_id.get()],
        link_request_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(Entity::LinkRequest))
}

fn link_request_from_row(row: &Row<'_>) -> rusqlite::Result<LinkRequestRow> {
    Ok(LinkRequestRow {
        id: LinkRequestId::new(row.get(0)?),
        branch_id: BranchId::new(row.get(1)?),
        status: decode_enum(2, row.get(2)?, LinkRequestStatus::parse)?,
        request_message: row.get(3)?,
        reviewer: decode_optional_actor(4, row.get(4)?)?,
        review_comment: row.get(5)?,
        reviewed_at_ms: row.get(6)?,
        created_at_ms: row.get(7)?,
    })
}
