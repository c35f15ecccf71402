#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(i64);

            impl $name {
                pub const fn new(value: i64) -> Self {
                    Self(value)
                }

                pub const fn get(self) -> i64 {
                    self.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

row_id!(
    StoryId,
    BranchId,
    LinkRequestId,
    WikiEntryId,
    WikiSnapshotId,
    TagId,
    MapId,
    MapSnapshotId,
    LayerId,
    MapObjectId,
);

/// Opaque caller identity. Only ever compared for equality against stored
/// author and reviewer columns.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, ActorIdError> {
        let value = value.into();
        validate_actor_id(&value)?;
        Ok(Self(value))
    }
}

impl TryFrom<String> for ActorId {
    type Error = ActorIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<ActorId> for String {
    fn from(value: ActorId) -> Self {
        value.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActorIdError {
    Empty,
    TooLong,
    ContainsControl,
}

impl ActorIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "actor id must not be empty",
            Self::TooLong => "actor id is too long",
            Self::ContainsControl => "actor id contains control characters",
        }
    }
}

impl std::fmt::Display for ActorIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

fn validate_actor_id(value: &str) -> Result<(), ActorIdError> {
    if value.trim().is_empty() {
        return Err(ActorIdError::Empty);
    }
    if value.len() > 128 {
        return Err(ActorIdError::TooLong);
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(ActorIdError::ContainsControl);
    }
    Ok(())
}

/// Chronological key owned by the chapter lifecycle. Only the pair is read
/// here; chapter state transitions live elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub branch_id: BranchId,
    pub chapter_number: i64,
}

impl ChapterRef {
    pub fn try_new(branch_id: BranchId, chapter_number: i64) -> Result<Self, ChapterError> {
        validate_chapter(chapter_number)?;
        Ok(Self {
            branch_id,
            chapter_number,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChapterError {
    Negative,
}

impl ChapterError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Negative => "chapter number must be >= 0",
        }
    }
}

pub fn validate_chapter(chapter_number: i64) -> Result<i64, ChapterError> {
    if chapter_number < 0 {
        return Err(ChapterError::Negative);
    }
    Ok(chapter_number)
}
