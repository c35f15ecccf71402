#![forbid(unsafe_code)]

use fl_core::ids::{
    ActorId, BranchId, ChapterRef, LayerId, LinkRequestId, MapId, MapSnapshotId, StoryId, TagId,
    WikiEntryId, WikiSnapshotId,
};
use fl_core::model::{
    BranchSort, BranchType, ContributorType, LayerType, LinkRequestStatus, MapObjectType,
    Visibility,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateStoryRequest {
    pub author: ActorId,
    pub title: String,
    pub allow_branching: bool,
    pub main_branch_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkBranchRequest {
    pub story_id: StoryId,
    pub parent_branch_id: BranchId,
    pub actor: ActorId,
    pub name: String,
    pub description: String,
    pub cover_image_url: Option<String>,
    pub branch_type: Option<BranchType>,
    pub fork_point: Option<ChapterRef>,
    pub expected_parent_version: Option<i64>,
    pub replicate_content: bool,
}

impl ForkBranchRequest {
    pub fn new(
        story_id: StoryId,
        parent_branch_id: BranchId,
        actor: ActorId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            story_id,
            parent_branch_id,
            actor,
            name: name.into(),
            description: String::new(),
            cover_image_url: None,
            branch_type: None,
            fork_point: None,
            expected_parent_version: None,
            replicate_content: false,
        }
    }
}

/// Field present = `Some`. Nullable columns use `Some(None)` to clear.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BranchPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image_url: Option<Option<String>>,
    pub branch_type: Option<BranchType>,
    pub vote_threshold: Option<i64>,
}

impl BranchPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.cover_image_url.is_none()
            && self.branch_type.is_none()
            && self.vote_threshold.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateBranchRequest {
    pub branch_id: BranchId,
    pub actor: ActorId,
    pub expected_version: Option<i64>,
    pub patch: BranchPatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateVisibilityRequest {
    pub branch_id: BranchId,
    pub actor: ActorId,
    pub visibility: Visibility,
    pub expected_version: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListBranchesRequest {
    pub story_id: StoryId,
    pub visibility: Option<Visibility>,
    pub sort: BranchSort,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateLinkRequest {
    pub branch_id: BranchId,
    pub requester: ActorId,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewLinkRequest {
    pub request_id: LinkRequestId,
    pub reviewer: ActorId,
    pub comment: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListLinkRequestsRequest {
    pub branch_id: BranchId,
    pub status: Option<LinkRequestStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WikiEntryCreateRequest {
    pub branch_id: BranchId,
    pub actor: ActorId,
    pub name: String,
    pub image_url: Option<String>,
    pub first_appearance: Option<i64>,
    pub hidden_note: String,
    pub initial_content: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WikiEntryPatch {
    pub name: Option<String>,
    pub image_url: Option<Option<String>>,
    pub first_appearance: Option<Option<i64>>,
    pub hidden_note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WikiEntryUpdateRequest {
    pub entry_id: WikiEntryId,
    pub actor: ActorId,
    pub patch: WikiEntryPatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WikiEntriesListRequest {
    pub branch_id: BranchId,
    pub tag_id: Option<TagId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WikiSnapshotAddRequest {
    pub entry_id: WikiEntryId,
    pub actor: ActorId,
    pub valid_from_chapter: i64,
    pub content: String,
    pub contributor_type: ContributorType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WikiSnapshotUpdateRequest {
    pub snapshot_id: WikiSnapshotId,
    pub actor: ActorId,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagCreateRequest {
    pub branch_id: BranchId,
    pub actor: ActorId,
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapCreateRequest {
    pub branch_id: BranchId,
    pub actor: ActorId,
    pub name: String,
    pub description: String,
    pub width: i64,
    pub height: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapSnapshotCreateRequest {
    pub map_id: MapId,
    pub actor: ActorId,
    pub valid_from_chapter: i64,
    pub base_image_url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayerAddRequest {
    pub snapshot_id: MapSnapshotId,
    pub actor: ActorId,
    pub name: String,
    pub layer_type: LayerType,
    pub z_index: i64,
    pub is_visible: bool,
    pub style_json: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapObjectAddRequest {
    pub layer_id: LayerId,
    pub actor: ActorId,
    pub object_type: MapObjectType,
    pub coordinates: serde_json::Value,
    pub label: String,
    pub description: String,
    pub wiki_entry_id: Option<WikiEntryId>,
    pub style_json: Option<serde_json::Value>,
}

/// `style_json: Some(None)` clears the style.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerPatch {
    pub name: Option<String>,
    pub layer_type: Option<LayerType>,
    pub z_index: Option<i64>,
    pub is_visible: Option<bool>,
    pub style_json: Option<Option<serde_json::Value>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapObjectPatch {
    pub object_type: Option<MapObjectType>,
    pub coordinates: Option<serde_json::Value>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub wiki_entry_id: Option<Option<WikiEntryId>>,
    pub style_json: Option<Option<serde_json::Value>>,
}
