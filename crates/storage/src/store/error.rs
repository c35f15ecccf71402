#![forbid(unsafe_code)]

use fl_core::ids::ChapterError;
use fl_core::VersionMismatch;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Story,
    Branch,
    LinkRequest,
    WikiEntry,
    WikiSnapshot,
    Tag,
    Map,
    MapSnapshot,
    Layer,
    MapObject,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Branch => "branch",
            Self::LinkRequest => "link request",
            Self::WikiEntry => "wiki entry",
            Self::WikiSnapshot => "wiki snapshot",
            Self::Tag => "tag",
            Self::Map => "map",
            Self::MapSnapshot => "map snapshot",
            Self::Layer => "map layer",
            Self::MapObject => "map object",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("config: {0}")]
    Config(String),
    #[error("unknown {0}")]
    NotFound(Entity),
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("version mismatch (expected={expected}, actual={actual})")]
    VersionMismatch { expected: i64, actual: i64 },
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("reset required: {0}")]
    ResetRequired(&'static str),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::Sql(_) => "INFRA",
            Self::Config(_) => "CONFIG",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::InvalidInput(_) => "VALIDATION",
            Self::VersionMismatch { .. } => "CONFLICT",
            Self::InvalidState(_) => "STATE",
            Self::ResetRequired(_) => "RESET_REQUIRED",
        }
    }
}

impl From<VersionMismatch> for StoreError {
    fn from(value: VersionMismatch) -> Self {
        Self::VersionMismatch {
            expected: value.expected,
            actual: value.actual,
        }
    }
}

impl From<ChapterError> for StoreError {
    fn from(value: ChapterError) -> Self {
        Self::InvalidInput(value.message())
    }
}
