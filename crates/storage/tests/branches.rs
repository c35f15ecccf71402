#![forbid(unsafe_code)]

mod common;

use common::{actor, create_story, fork, open_store, open_store_with};
use fl_core::ids::ChapterRef;
use fl_core::model::{BranchSort, BranchType, CanonStatus, Visibility};
use fl_storage::{
    BranchPatch, CreateStoryRequest, ForkBranchRequest, ListBranchesRequest, StoreConfig,
    StoreError, UpdateBranchRequest, UpdateVisibilityRequest,
};

#[test]
fn story_create_makes_one_public_main_branch() {
    let (_dir, mut store) = open_store();
    let author = actor("author");

    let (story, main) = store
        .story_create(CreateStoryRequest {
            author: author.clone(),
            title: "  The Long Road  ".to_string(),
            allow_branching: true,
            main_branch_name: String::new(),
        })
        .expect("create story");

    assert_eq!(story.title, "The Long Road");
    assert_eq!(story.branch_count, 1);
    assert_eq!(story.linked_branch_count, 0);
    assert!(main.is_main);
    assert_eq!(main.name, "The Long Road");
    assert_eq!(main.parent_branch_id, None);
    assert_eq!(main.branch_type, BranchType::Main);
    assert_eq!(main.visibility, Visibility::Public);
    assert_eq!(main.version, 1);

    let err = store
        .create_main_branch(story.id, &author, "second main")
        .expect_err("second main branch must fail");
    assert!(matches!(err, StoreError::InvalidInput(_)));
    assert_eq!(store.main_branch_get(story.id).expect("main").id, main.id);
}

#[test]
fn fork_creates_private_non_canon_child_and_counts_it() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let reader = actor("reader");
    let (story, main) = create_story(&mut store, &author, "Saga");

    let mut request = ForkBranchRequest::new(story.id, main.id, reader.clone(), "  What if  ");
    request.fork_point = Some(ChapterRef::try_new(main.id, 3).expect("chapter ref"));
    request.expected_parent_version = Some(main.version);
    let forked = store.branch_fork(request).expect("fork");

    let branch = forked.branch;
    assert!(forked.replication.is_none());
    assert_eq!(branch.name, "What if");
    assert_eq!(branch.author, reader);
    assert_eq!(branch.parent_branch_id, Some(main.id));
    assert_eq!(branch.fork_point, Some(3));
    assert!(!branch.is_main);
    assert_eq!(branch.visibility, Visibility::Private);
    assert_eq!(branch.canon_status, CanonStatus::NonCanon);
    assert_eq!(branch.branch_type, BranchType::FanFic);
    assert_eq!(branch.version, 1);
    assert_eq!(branch.vote_threshold, 1_000);

    assert_eq!(store.story_get(story.id).expect("story").branch_count, 2);
}

#[test]
fn fork_rejections_leave_no_branch_behind() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let reader = actor("reader");
    let (story, main) = create_story(&mut store, &author, "Saga");

    let err = store
        .branch_fork(ForkBranchRequest::new(story.id, main.id, reader.clone(), "   "))
        .expect_err("blank name");
    assert_eq!(err.code(), "VALIDATION");

    let mut stale = ForkBranchRequest::new(story.id, main.id, reader.clone(), "stale");
    stale.expected_parent_version = Some(main.version + 1);
    let err = store.branch_fork(stale).expect_err("stale parent version");
    assert!(matches!(
        err,
        StoreError::VersionMismatch {
            expected: 2,
            actual: 1
        }
    ));

    let other = fork(&mut store, story.id, &main, &reader, "other");
    let mut foreign_point = ForkBranchRequest::new(story.id, main.id, reader.clone(), "foreign");
    foreign_point.fork_point = Some(ChapterRef::try_new(other.id, 1).expect("chapter ref"));
    let err = store.branch_fork(foreign_point).expect_err("fork point on another branch");
    assert!(matches!(err, StoreError::InvalidInput(_)));

    store
        .story_set_allow_branching(story.id, &author, false)
        .expect("disable branching");
    let err = store
        .branch_fork(ForkBranchRequest::new(story.id, main.id, reader.clone(), "blocked"))
        .expect_err("branching disabled");
    assert_eq!(err.code(), "PERMISSION_DENIED");

    assert_eq!(store.story_get(story.id).expect("story").branch_count, 2);
}

#[test]
fn fork_depth_is_bounded_by_config() {
    let config = StoreConfig {
        max_branch_depth: 2,
        ..StoreConfig::default()
    };
    let (_dir, mut store) = open_store_with(config);
    let author = actor("author");
    let (story, main) = create_story(&mut store, &author, "Deep");

    let first = fork(&mut store, story.id, &main, &author, "first");
    let second = fork(&mut store, story.id, &first, &author, "second");
    let err = store
        .branch_fork(ForkBranchRequest::new(story.id, second.id, author.clone(), "third"))
        .expect_err("depth exceeded");
    assert!(matches!(err, StoreError::InvalidInput("branch depth exceeded")));

    let lineage = store.branch_lineage(second.id).expect("lineage");
    let ids = lineage.iter().map(|branch| branch.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![second.id, first.id, main.id]);
}

#[test]
fn update_applies_present_fields_and_bumps_once() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let mut request = ForkBranchRequest::new(story.id, main.id, author.clone(), "draft");
    request.cover_image_url = Some("https://img/cover.png".to_string());
    let branch = store.branch_fork(request).expect("fork").branch;

    let updated = store
        .branch_update(UpdateBranchRequest {
            branch_id: branch.id,
            actor: author.clone(),
            expected_version: Some(1),
            patch: BranchPatch {
                name: Some("final".to_string()),
                cover_image_url: Some(None),
                ..BranchPatch::default()
            },
        })
        .expect("update");
    assert_eq!(updated.version, 2);
    assert_eq!(updated.name, "final");
    assert_eq!(updated.cover_image_url, None);
    assert_eq!(updated.description, branch.description);

    let same = store
        .branch_update(UpdateBranchRequest {
            branch_id: branch.id,
            actor: author.clone(),
            expected_version: None,
            patch: BranchPatch {
                name: Some("final".to_string()),
                branch_type: Some(BranchType::FanFic),
                ..BranchPatch::default()
            },
        })
        .expect("no-op update");
    assert_eq!(same.version, 2);

    let err = store
        .branch_update(UpdateBranchRequest {
            branch_id: branch.id,
            actor: author.clone(),
            expected_version: None,
            patch: BranchPatch::default(),
        })
        .expect_err("empty patch");
    assert!(matches!(err, StoreError::InvalidInput("no fields to edit")));
}

#[test]
fn stale_update_is_a_conflict_and_writes_nothing() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let branch = fork(&mut store, story.id, &main, &author, "draft");

    let first = UpdateBranchRequest {
        branch_id: branch.id,
        actor: author.clone(),
        expected_version: Some(1),
        patch: BranchPatch {
            description: Some("first writer".to_string()),
            ..BranchPatch::default()
        },
    };
    let mut second = first.clone();
    second.patch.description = Some("second writer".to_string());

    store.branch_update(first).expect("first writer wins");
    let err = store.branch_update(second).expect_err("second writer is stale");
    assert_eq!(err.code(), "CONFLICT");

    let current = store.branch_get(branch.id).expect("branch");
    assert_eq!(current.description, "first writer");
    assert_eq!(current.version, 2);
}

#[test]
fn only_the_author_may_update() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let stranger = actor("stranger");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let branch = fork(&mut store, story.id, &main, &author, "draft");

    let err = store
        .branch_update(UpdateBranchRequest {
            branch_id: branch.id,
            actor: stranger.clone(),
            expected_version: None,
            patch: BranchPatch {
                name: Some("hijack".to_string()),
                ..BranchPatch::default()
            },
        })
        .expect_err("not the author");
    assert!(matches!(err, StoreError::PermissionDenied(_)));

    let err = store
        .branch_update_visibility(UpdateVisibilityRequest {
            branch_id: branch.id,
            actor: stranger,
            visibility: Visibility::Public,
            expected_version: None,
        })
        .expect_err("not the author");
    assert!(matches!(err, StoreError::PermissionDenied(_)));
    assert_eq!(store.branch_get(branch.id).expect("branch").version, 1);
}

#[test]
fn visibility_transitions_track_linked_count() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let branch = fork(&mut store, story.id, &main, &author, "draft");

    let err = store
        .branch_update_visibility(UpdateVisibilityRequest {
            branch_id: main.id,
            actor: author.clone(),
            visibility: Visibility::Private,
            expected_version: None,
        })
        .expect_err("main visibility is immutable");
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let linked = store
        .branch_update_visibility(UpdateVisibilityRequest {
            branch_id: branch.id,
            actor: author.clone(),
            visibility: Visibility::Linked,
            expected_version: Some(1),
        })
        .expect("to linked");
    assert_eq!(linked.version, 2);
    assert_eq!(store.story_get(story.id).expect("story").linked_branch_count, 1);

    let unchanged = store
        .branch_update_visibility(UpdateVisibilityRequest {
            branch_id: branch.id,
            actor: author.clone(),
            visibility: Visibility::Linked,
            expected_version: None,
        })
        .expect("same visibility");
    assert_eq!(unchanged.version, 2);
    assert_eq!(store.story_get(story.id).expect("story").linked_branch_count, 1);

    let public = store
        .branch_update_visibility(UpdateVisibilityRequest {
            branch_id: branch.id,
            actor: author.clone(),
            visibility: Visibility::Public,
            expected_version: Some(2),
        })
        .expect("back to public");
    assert_eq!(public.version, 3);
    assert_eq!(store.story_get(story.id).expect("story").linked_branch_count, 0);
}

#[test]
fn votes_are_counted_without_touching_version() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let alice = actor("alice");
    let bob = actor("bob");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let branch = fork(&mut store, story.id, &main, &author, "draft");

    assert_eq!(store.branch_vote(branch.id, &alice).expect("vote"), 1);
    assert_eq!(store.branch_vote(branch.id, &bob).expect("vote"), 2);
    assert!(store.has_voted(branch.id, &alice).expect("has voted"));

    let err = store.branch_vote(branch.id, &alice).expect_err("double vote");
    assert!(matches!(err, StoreError::InvalidInput(_)));

    assert!(store.branch_unvote(branch.id, &alice).expect("unvote"));
    assert!(!store.branch_unvote(branch.id, &alice).expect("second unvote"));
    assert!(!store.has_voted(branch.id, &alice).expect("has voted"));

    let current = store.branch_get(branch.id).expect("branch");
    assert_eq!(current.vote_count, 1);
    assert_eq!(current.version, 1);

    assert!(store.branch_unvote(branch.id, &bob).expect("unvote"));
    assert!(!store.branch_unvote(branch.id, &bob).expect("unvote again"));
    assert_eq!(store.branch_get(branch.id).expect("branch").vote_count, 0);
}

#[test]
fn canon_candidates_are_branches_over_threshold() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let popular = fork(&mut store, story.id, &main, &author, "popular");
    let quiet = fork(&mut store, story.id, &main, &author, "quiet");

    store
        .branch_update(UpdateBranchRequest {
            branch_id: popular.id,
            actor: author.clone(),
            expected_version: None,
            patch: BranchPatch {
                vote_threshold: Some(2),
                ..BranchPatch::default()
            },
        })
        .expect("lower threshold");
    for voter in ["a", "b"] {
        store.branch_vote(popular.id, &actor(voter)).expect("vote");
    }
    store.branch_vote(quiet.id, &actor("a")).expect("vote");

    let candidates = store.canon_candidates(story.id).expect("candidates");
    let ids = candidates.iter().map(|branch| branch.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![popular.id]);

    let by_votes = store
        .branches_list(ListBranchesRequest {
            story_id: story.id,
            visibility: Some(Visibility::Private),
            sort: BranchSort::Votes,
        })
        .expect("list");
    let ids = by_votes.iter().map(|branch| branch.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![popular.id, quiet.id]);

    let latest = store
        .branches_list(ListBranchesRequest {
            story_id: story.id,
            visibility: None,
            sort: BranchSort::Latest,
        })
        .expect("list");
    assert_eq!(latest.len(), 3);
    assert_eq!(latest[0].id, quiet.id);
}

#[test]
fn branch_delete_rules() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let stranger = actor("stranger");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let parent = fork(&mut store, story.id, &main, &author, "parent");
    let child = fork(&mut store, story.id, &parent, &author, "child");

    let err = store.branch_delete(main.id, &author).expect_err("main");
    assert!(matches!(err, StoreError::InvalidInput(_)));
    let err = store.branch_delete(parent.id, &author).expect_err("has child");
    assert!(matches!(err, StoreError::InvalidInput(_)));
    let err = store.branch_delete(child.id, &stranger).expect_err("not author");
    assert!(matches!(err, StoreError::PermissionDenied(_)));

    store
        .branch_update_visibility(UpdateVisibilityRequest {
            branch_id: child.id,
            actor: author.clone(),
            visibility: Visibility::Linked,
            expected_version: None,
        })
        .expect("link child");
    store.branch_vote(child.id, &stranger).expect("vote");

    store.branch_delete(child.id, &author).expect("delete child");
    store.branch_delete(parent.id, &author).expect("delete parent");

    let story = store.story_get(story.id).expect("story");
    assert_eq!(story.branch_count, 1);
    assert_eq!(story.linked_branch_count, 0);
    assert!(matches!(
        store.branch_get(child.id),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn story_delete_is_author_only_and_cascades() {
    let (_dir, mut store) = open_store();
    let author = actor("author");
    let (story, main) = create_story(&mut store, &author, "Saga");
    let branch = fork(&mut store, story.id, &main, &author, "draft");

    let err = store
        .story_delete(story.id, &actor("stranger"))
        .expect_err("not the author");
    assert_eq!(err.code(), "PERMISSION_DENIED");

    store.story_delete(story.id, &author).expect("delete story");
    assert!(matches!(
        store.story_get(story.id),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.branch_get(branch.id),
        Err(StoreError::NotFound(_))
    ));
}
