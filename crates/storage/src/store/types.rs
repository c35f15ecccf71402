#![forbid(unsafe_code)]

use fl_core::Chronological;
use fl_core::ids::{
    ActorId, BranchId, LayerId, LinkRequestId, MapId, MapObjectId, MapSnapshotId, StoryId, TagId,
    WikiEntryId, WikiSnapshotId,
};
use fl_core::model::{
    BranchType, CanonStatus, ContributorType, LayerType, LinkRequestStatus, MapObjectType,
    Visibility,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoryRow {
    pub id: StoryId,
    pub author: ActorId,
    pub title: String,
    pub allow_branching: bool,
    pub branch_count: i64,
    pub linked_branch_count: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BranchRow {
    pub id: BranchId,
    pub story_id: StoryId,
    pub author: ActorId,
    pub is_main: bool,
    pub parent_branch_id: Option<BranchId>,
    pub fork_point: Option<i64>,
    pub name: String,
    pub description: String,
    pub cover_image_url: Option<String>,
    pub branch_type: BranchType,
    pub visibility: Visibility,
    pub canon_status: CanonStatus,
    pub version: i64,
    pub vote_count: i64,
    pub vote_threshold: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForkedBranch {
    pub branch: BranchRow,
    pub replication: Option<ForkReplication>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LinkRequestRow {
    pub id: LinkRequestId,
    pub branch_id: BranchId,
    pub status: LinkRequestStatus,
    pub request_message: String,
    pub reviewer: Option<ActorId>,
    pub review_comment: Option<String>,
    pub reviewed_at_ms: Option<i64>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagRow {
    pub id: TagId,
    pub branch_id: BranchId,
    pub name: String,
    pub color: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WikiEntryRow {
    pub id: WikiEntryId,
    pub branch_id: BranchId,
    pub source_entry_id: Option<WikiEntryId>,
    pub name: String,
    pub image_url: Option<String>,
    pub first_appearance: Option<i64>,
    pub hidden_note: String,
    pub tag_ids: Vec<TagId>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WikiSnapshotRow {
    pub id: WikiSnapshotId,
    pub entry_id: WikiEntryId,
    pub valid_from_chapter: i64,
    pub content: String,
    pub contributor: Option<ActorId>,
    pub contributor_type: ContributorType,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Chronological for WikiSnapshotRow {
    fn valid_from_chapter(&self) -> i64 {
        self.valid_from_chapter
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WikiEntryWithContext {
    pub entry: WikiEntryRow,
    pub snapshot: Option<WikiSnapshotRow>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MapRow {
    pub id: MapId,
    pub branch_id: BranchId,
    pub source_entry_id: Option<MapId>,
    pub name: String,
    pub description: String,
    pub width: i64,
    pub height: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MapSnapshotRow {
    pub id: MapSnapshotId,
    pub map_id: MapId,
    pub valid_from_chapter: i64,
    pub base_image_url: String,
    pub created_at_ms: i64,
}

impl Chronological for MapSnapshotRow {
    fn valid_from_chapter(&self) -> i64 {
        self.valid_from_chapter
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapLayerRow {
    pub id: LayerId,
    pub snapshot_id: MapSnapshotId,
    pub name: String,
    pub layer_type: LayerType,
    pub z_index: i64,
    pub is_visible: bool,
    pub style_json: Option<serde_json::Value>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapObjectRow {
    pub id: MapObjectId,
    pub layer_id: LayerId,
    pub object_type: MapObjectType,
    pub coordinates: serde_json::Value,
    pub label: String,
    pub description: String,
    pub wiki_entry_id: Option<WikiEntryId>,
    pub style_json: Option<serde_json::Value>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapLayerView {
    pub layer: MapLayerRow,
    pub objects: Vec<MapObjectRow>,
}

/// A map snapshot with its full layer/object tree, layers by z-index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapSnapshotView {
    pub snapshot: MapSnapshotRow,
    pub layers: Vec<MapLayerView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapWithContext {
    pub map: MapRow,
    pub snapshot: Option<MapSnapshotView>,
}

/// Everything one replication pass created in the target branch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ForkReplication {
    pub tag_map: BTreeMap<TagId, TagId>,
    pub wiki_entries: Vec<WikiEntryRow>,
    pub maps: Vec<MapRow>,
    pub wiki_snapshots_copied: usize,
    pub map_snapshots_copied: usize,
    pub layers_copied: usize,
    pub objects_copied: usize,
}
