//! Transport-independent member summary.

use serde::{Deserialize, Serialize};

use crate::permission::MemberPermission;
use crate::transport::GroupMemberInfo;

/// A serialisable summary of one group member, detached from any live
/// member object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub uin: i64,
    pub nick: String,
    pub name_card: String,
    pub permission: MemberPermission,
    pub special_title: String,
    pub join_timestamp: i64,
    pub last_speak_timestamp: i64,
    /// Absolute mute expiry, unix seconds; 0 when not muted.
    pub mute_timestamp: i64,
    /// The bot's friend remark for this user, empty when not a friend.
    pub remark: String,
}

impl MemberInfo {
    pub fn from_raw(raw: &GroupMemberInfo, remark: impl Into<String>) -> Self {
        Self {
            uin: raw.user_id,
            nick: raw.nickname.clone(),
            name_card: raw.card.clone(),
            permission: MemberPermission::from_role_tag(&raw.role),
            special_title: raw.title.clone(),
            join_timestamp: raw.join_time,
            last_speak_timestamp: raw.last_sent_time,
            mute_timestamp: raw.shut_up_timestamp,
            remark: remark.into(),
        }
    }

    /// The name to show: card if set, nickname otherwise.
    pub fn display_name(&self) -> &str {
        if self.name_card.is_empty() {
            &self.nick
        } else {
            &self.name_card
        }
    }
}

/// Activity standing of a member in its group.
///
/// Both fields come straight from the member record; transports that do not
/// report them leave the view empty. Anonymous members always get an empty
/// view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberActive {
    /// Group level as the transport reports it.
    pub level: Option<String>,
    /// Unix time the special title expires; `None` when permanent or unknown.
    pub title_expire_time: Option<i64>,
}

impl MemberActive {
    pub fn from_raw(raw: &GroupMemberInfo) -> Self {
        Self {
            level: raw.level.clone().filter(|level| !level.is_empty()),
            title_expire_time: (raw.title_expire_time > 0).then_some(raw.title_expire_time),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.title_expire_time.is_none()
    }
}
