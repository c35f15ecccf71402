#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

macro_rules! stored_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

stored_enum! {
    pub enum Visibility {
        Private => "PRIVATE",
        Public => "PUBLIC",
        Linked => "LINKED",
    }
}

stored_enum! {
    pub enum CanonStatus {
        NonCanon => "NON_CANON",
        Candidate => "CANDIDATE",
        Merged => "MERGED",
    }
}

stored_enum! {
    pub enum BranchType {
        Main => "MAIN",
        SideStory => "SIDE_STORY",
        FanFic => "FAN_FIC",
        IfStory => "IF_STORY",
    }
}

stored_enum! {
    /// `Pending` is the only non-terminal state.
    pub enum LinkRequestStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

stored_enum! {
    pub enum ContributorType {
        User => "USER",
        Ai => "AI",
        System => "SYSTEM",
    }
}

stored_enum! {
    pub enum LayerType {
        Base => "BASE",
        Overlay => "OVERLAY",
        Marker => "MARKER",
        Path => "PATH",
        Region => "REGION",
    }
}

stored_enum! {
    pub enum MapObjectType {
        Point => "POINT",
        Line => "LINE",
        Polygon => "POLYGON",
        Circle => "CIRCLE",
        Icon => "ICON",
    }
}

impl LinkRequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchSort {
    #[default]
    Latest,
    Votes,
}

/// Outcome of a visibility transition as seen by the story's
/// `linked_branch_count` aggregate.
pub fn linked_count_delta(from: Visibility, to: Visibility) -> i64 {
    match (from == Visibility::Linked, to == Visibility::Linked) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    }
}
