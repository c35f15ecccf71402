#![forbid(unsafe_code)]
#![allow(dead_code)]

use fl_core::ids::{ActorId, StoryId};
use fl_storage::{
    BranchRow, CreateStoryRequest, ForkBranchRequest, SqliteStore, StoreConfig, StoryRow,
};
use tempfile::TempDir;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The directory must outlive the store.
pub fn open_store() -> (TempDir, SqliteStore) {
    open_store_with(StoreConfig::default())
}

pub fn open_store_with(config: StoreConfig) -> (TempDir, SqliteStore) {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open_with_config(dir.path(), config).expect("open store");
    (dir, store)
}

pub fn actor(name: &str) -> ActorId {
    ActorId::try_new(name).expect("actor id")
}

pub fn create_story(store: &mut SqliteStore, author: &ActorId, title: &str) -> (StoryRow, BranchRow) {
    store
        .story_create(CreateStoryRequest {
            author: author.clone(),
            title: title.to_string(),
            allow_branching: true,
            main_branch_name: String::new(),
        })
        .expect("create story")
}

pub fn fork(
    store: &mut SqliteStore,
    story_id: StoryId,
    parent: &BranchRow,
    author: &ActorId,
    name: &str,
) -> BranchRow {
    store
        .branch_fork(ForkBranchRequest::new(
            story_id,
            parent.id,
            author.clone(),
            name,
        ))
        .expect("fork branch")
        .branch
}
