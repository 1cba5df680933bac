//! Member permission levels inside a group.

use serde::{Deserialize, Serialize};

/// Permission of a member within one group.
///
/// Totally ordered: `Member < Administrator < Owner`. The derived `Ord`
/// follows declaration order and agrees with [`MemberPermission::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberPermission {
    #[default]
    Member,
    Administrator,
    Owner,
}

impl MemberPermission {
    pub const ALL: [MemberPermission; 3] = [Self::Member, Self::Administrator, Self::Owner];

    pub fn rank(self) -> u8 {
        match self {
            Self::Member => 0,
            Self::Administrator => 1,
            Self::Owner => 2,
        }
    }

    /// Strictly higher. Never true for equal permissions.
    pub fn higher_than(self, other: MemberPermission) -> bool {
        self.rank() > other.rank()
    }

    /// Map a raw transport role tag. Unknown tags are plain members.
    pub fn from_role_tag(tag: &str) -> Self {
        match tag {
            "owner" => Self::Owner,
            "admin" => Self::Administrator,
            _ => Self::Member,
        }
    }

    /// The canonical role tag used on the wire.
    pub fn role_tag(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Administrator => "admin",
            Self::Member => "member",
        }
    }

    pub fn is_operator(self) -> bool {
        self >= Self::Administrator
    }
}

impl std::fmt::Display for MemberPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Owner => "owner",
            Self::Administrator => "administrator",
            Self::Member => "member",
        };
        f.write_str(label)
    }
}
