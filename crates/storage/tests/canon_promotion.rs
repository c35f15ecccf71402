#![forbid(unsafe_code)]

mod common;

use common::{actor, create_story, fork, open_store};
use fl_core::ids::{ActorId, BranchId, LinkRequestId};
use fl_core::model::{CanonStatus, LinkRequestStatus, Visibility};
use fl_storage::{
    CreateLinkRequest, ListLinkRequestsRequest, ReviewLinkRequest, StoreError,
    UpdateVisibilityRequest,
};

fn link_request(branch_id: BranchId, requester: &ActorId) -> CreateLinkRequest {
    CreateLinkRequest {
        branch_id,
        requester: requester.clone(),
        message: "please link my branch".to_string(),
    }
}

#[test]
fn request_link_guards() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let writer = actor("writer");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let branch = fork(&mut store, story.id, &main, &writer, "side");

    let err = store
        .link_request_create(link_request(main.id, &author))
        .expect_err("main branch");
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let err = store
        .link_request_create(link_request(branch.id, &author))
        .expect_err("story author is not the branch author");
    assert!(matches!(err, StoreError::PermissionDenied(_)));

    let pending = store
        .link_request_create(link_request(branch.id, &writer))
        .expect("first request");
    assert_eq!(pending.status, LinkRequestStatus::Pending);
    assert_eq!(pending.reviewer, None);
    assert_eq!(pending.reviewed_at_ms, None);

    let err = store
        .link_request_create(link_request(branch.id, &writer))
        .expect_err("second pending request");
    assert!(matches!(err, StoreError::InvalidState(_)));
}

#[test]
fn approve_links_branch_and_counts_once() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let writer = actor("writer");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let branch = fork(&mut store, story.id, &main, &writer, "side");
    let request = store
        .link_request_create(link_request(branch.id, &writer))
        .expect("request");

    let err = store
        .link_request_approve(ReviewLinkRequest {
            request_id: request.id,
            reviewer: writer.clone(),
            comment: "self approval".to_string(),
        })
        .expect_err("branch author cannot review");
    assert!(matches!(err, StoreError::PermissionDenied(_)));

    let approved = store
        .link_request_approve(ReviewLinkRequest {
            request_id: request.id,
            reviewer: author.clone(),
            comment: "welcome".to_string(),
        })
        .expect("approve");
    assert_eq!(approved.status, LinkRequestStatus::Approved);
    assert_eq!(approved.reviewer.as_ref(), Some(&author));
    assert_eq!(approved.review_comment.as_deref(), Some("welcome"));
    assert!(approved.reviewed_at_ms.is_some());

    let linked = store.branch_get(branch.id).expect("branch");
    assert_eq!(linked.visibility, Visibility::Linked);
    assert_eq!(linked.canon_status, CanonStatus::NonCanon);
    assert_eq!(linked.version, branch.version + 1);
    assert_eq!(store.story_get(story.id).expect("story").linked_branch_count, 1);

    for review in [
        store.link_request_approve(ReviewLinkRequest {
            request_id: request.id,
            reviewer: author.clone(),
            comment: "again".to_string(),
        }),
        store.link_request_reject(ReviewLinkRequest {
            request_id: request.id,
            reviewer: author.clone(),
            comment: "changed my mind".to_string(),
        }),
    ] {
        let err = review.expect_err("resolved request is immutable");
        assert_eq!(err.code(), "STATE");
    }

    let stored = store.link_request_get(request.id).expect("request");
    assert_eq!(stored, approved);
    assert_eq!(store.story_get(story.id).expect("story").linked_branch_count, 1);

    let err = store
        .link_request_create(link_request(branch.id, &writer))
        .expect_err("already linked");
    assert!(matches!(err, StoreError::InvalidState(_)));
}

#[test]
fn reject_leaves_branch_untouched_and_allows_a_new_request() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let writer = actor("writer");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let branch = fork(&mut store, story.id, &main, &writer, "side");
    store
        .branch_update_visibility(UpdateVisibilityRequest {
            branch_id: branch.id,
            actor: writer.clone(),
            visibility: Visibility::Public,
            expected_version: None,
        })
        .expect("publish");
    let before = store.branch_get(branch.id).expect("branch");

    let request = store
        .link_request_create(link_request(branch.id, &writer))
        .expect("request");
    let rejected = store
        .link_request_reject(ReviewLinkRequest {
            request_id: request.id,
            reviewer: author.clone(),
            comment: "not yet".to_string(),
        })
        .expect("reject");
    assert_eq!(rejected.status, LinkRequestStatus::Rejected);

    assert_eq!(store.branch_get(branch.id).expect("branch"), before);
    assert_eq!(store.story_get(story.id).expect("story").linked_branch_count, 0);

    let retry = store
        .link_request_create(link_request(branch.id, &writer))
        .expect("new request after rejection");

    let all = store
        .link_requests_list(ListLinkRequestsRequest {
            branch_id: branch.id,
            status: None,
        })
        .expect("list");
    let ids = all.iter().map(|row| row.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![retry.id, request.id]);

    let pending = store
        .link_requests_list(ListLinkRequestsRequest {
            branch_id: branch.id,
            status: Some(LinkRequestStatus::Pending),
        })
        .expect("list pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, retry.id);
}

#[test]
fn unknown_request_is_not_found() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let (_story, _main) = create_story(&mut store, &author, "Saga");

    let err = store
        .link_request_approve(ReviewLinkRequest {
            request_id: LinkRequestId::new(404),
            reviewer: author,
            comment: String::new(),
        })
        .expect_err("missing request");
    assert_eq!(err.code(), "NOT_FOUND");
}
