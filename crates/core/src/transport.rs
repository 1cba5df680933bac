//! Transport trait: the abstraction over the OneBot-style protocol client.
//!
//! A transport issues request/response actions against the chat platform and
//! returns the remote envelope untouched. Interpreting a non-ok envelope as a
//! failure is the caller's job, via [`ActionResponse::check`], so the caller
//! can attach a description of what it was trying to do.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// The envelope every transport action answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse<T> {
    /// `"ok"`, `"async"`, or `"failed"`.
    pub status: String,

    #[serde(default)]
    pub retcode: i64,

    #[serde(default)]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wording: Option<String>,
}

impl<T> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "ok".into(),
            retcode: 0,
            data: Some(data),
            message: None,
            wording: None,
        }
    }

    pub fn failed(retcode: i64, message: impl Into<String>) -> Self {
        Self {
            status: "failed".into(),
            retcode,
            data: None,
            message: Some(message.into()),
            wording: None,
        }
    }

    /// Whether the remote side accepted the action. Asynchronously queued
    /// actions count as accepted whatever their retcode (OneBot answers them
    /// with 1).
    pub fn is_success(&self) -> bool {
        (self.status == "ok" && self.retcode == 0) || self.status == "async"
    }

    /// Turn a non-ok envelope into a [`TransportError::Rejected`] carrying
    /// `context`. Returns the payload, if any, on success.
    pub fn check(self, context: &str) -> Result<Option<T>, TransportError> {
        if self.is_success() {
            return Ok(self.data);
        }
        let message = self
            .wording
            .filter(|w| !w.is_empty())
            .or(self.message)
            .unwrap_or_default();
        Err(TransportError::Rejected {
            context: context.to_string(),
            status: self.status,
            retcode: self.retcode,
            message,
        })
    }

    /// Like [`check`](Self::check) but a missing payload is also an error.
    pub fn check_data(self, context: &str) -> Result<T, TransportError> {
        self.check(context)?.ok_or_else(|| TransportError::Request {
            context: context.to_string(),
            reason: "response carried no data".into(),
        })
    }
}

/// Raw member record as reported by `get_group_member_info` /
/// `get_group_member_list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMemberInfo {
    pub group_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    /// Group display card. Empty when the member never set one.
    #[serde(default)]
    pub card: String,
    /// `"owner"`, `"admin"`, or `"member"`.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub join_time: i64,
    #[serde(default)]
    pub last_sent_time: i64,
    /// Absolute unix time the current mute expires; 0 when not muted.
    #[serde(default)]
    pub shut_up_timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default)]
    pub unfriendly: bool,
    #[serde(default)]
    pub title_expire_time: i64,
    #[serde(default)]
    pub card_changeable: bool,
}

/// The anonymous-sender block attached to a group message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousInfo {
    /// Transport-assigned id; 0 when absent.
    #[serde(default)]
    pub id: i64,
    pub name: String,
    /// Opaque token identifying this anonymous sender for moderation actions.
    pub flag: String,
}

/// Payload of the send actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageIdData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,

    /// Some implementations report one id per segment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message_ids: Vec<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_id: Option<String>,
}

impl MessageIdData {
    pub fn single(id: i64) -> Self {
        Self {
            message_id: Some(id),
            ..Self::default()
        }
    }

    /// All reported ids; a lone `message_id` becomes a one-element list.
    pub fn ids(&self) -> Vec<i64> {
        if !self.message_ids.is_empty() {
            return self.message_ids.clone();
        }
        self.message_id.into_iter().collect()
    }
}

/// The protocol client the adapter is built on.
///
/// Implementations own connection management, request correlation and
/// timeouts. Each method maps to one OneBot action.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_group_member_info(
        &self,
        group_id: i64,
        user_id: i64,
        no_cache: bool,
    ) -> Result<ActionResponse<GroupMemberInfo>, TransportError>;

    async fn get_group_member_list(
        &self,
        group_id: i64,
    ) -> Result<ActionResponse<Vec<GroupMemberInfo>>, TransportError>;

    async fn set_group_card(
        &self,
        group_id: i64,
        user_id: i64,
        card: &str,
    ) -> Result<ActionResponse<()>, TransportError>;

    /// `duration` in seconds; -1 keeps the title permanently.
    async fn set_group_special_title(
        &self,
        group_id: i64,
        user_id: i64,
        title: &str,
        duration: i64,
    ) -> Result<ActionResponse<()>, TransportError>;

    async fn set_group_admin(
        &self,
        group_id: i64,
        user_id: i64,
        enable: bool,
    ) -> Result<ActionResponse<()>, TransportError>;

    /// A `duration` of 0 lifts the mute.
    async fn set_group_ban(
        &self,
        group_id: i64,
        user_id: i64,
        duration: i32,
    ) -> Result<ActionResponse<()>, TransportError>;

    async fn set_group_anonymous_ban(
        &self,
        group_id: i64,
        flag: &str,
        duration: i32,
    ) -> Result<ActionResponse<()>, TransportError>;

    async fn set_group_kick(
        &self,
        group_id: i64,
        user_id: i64,
        reject_add_request: bool,
    ) -> Result<ActionResponse<()>, TransportError>;

    /// Nudge (poke) a member. Nothing is sent into the chat log.
    async fn group_poke(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> Result<ActionResponse<()>, TransportError>;

    async fn send_private_msg(
        &self,
        user_id: i64,
        message: serde_json::Value,
        auto_escape: bool,
    ) -> Result<ActionResponse<MessageIdData>, TransportError>;

    async fn send_private_forward_msg(
        &self,
        user_id: i64,
        messages: serde_json::Value,
    ) -> Result<ActionResponse<MessageIdData>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_info_parses_minimal_payload() {
        let json = r#"{"group_id": 1, "user_id": 2, "nickname": "bob", "role": "admin"}"#;
        let info: GroupMemberInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.user_id, 2);
        assert_eq!(info.role, "admin");
        assert_eq!(info.card, "");
        assert_eq!(info.shut_up_timestamp, 0);
    }

    #[test]
    fn check_passes_ok_responses() {
        let resp = ActionResponse::ok(5);
        assert_eq!(resp.check("noop").unwrap(), Some(5));
    }

    #[test]
    fn check_accepts_queued_envelope() {
        let resp: ActionResponse<()> =
            serde_json::from_str(r#"{"status":"async","retcode":1,"data":null}"#).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.check("set card").unwrap(), None);
    }

    #[test]
    fn check_rejects_ok_status_with_nonzero_retcode() {
        let resp: ActionResponse<()> =
            serde_json::from_str(r#"{"status":"ok","retcode":102,"data":null}"#).unwrap();
        assert!(matches!(
            resp.check("kick"),
            Err(TransportError::Rejected { retcode: 102, .. })
        ));
    }

    #[test]
    fn check_prefers_wording_over_message() {
        let mut resp: ActionResponse<()> = ActionResponse::failed(100, "raw");
        resp.wording = Some("friendly".into());
        match resp.check("set card") {
            Err(TransportError::Rejected { context, message, retcode, .. }) => {
                assert_eq!(context, "set card");
                assert_eq!(message, "friendly");
                assert_eq!(retcode, 100);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn check_data_requires_payload() {
        let resp: ActionResponse<GroupMemberInfo> = ActionResponse {
            status: "ok".into(),
            retcode: 0,
            data: None,
            message: None,
            wording: None,
        };
        assert!(matches!(
            resp.check_data("fetch"),
            Err(TransportError::Request { .. })
        ));
    }

    #[test]
    fn message_ids_prefers_list() {
        let data = MessageIdData {
            message_id: Some(1),
            message_ids: vec![2, 3],
            forward_id: None,
        };
        assert_eq!(data.ids(), vec![2, 3]);
        assert_eq!(MessageIdData::single(9).ids(), vec![9]);
        assert!(MessageIdData::default().ids().is_empty());
    }
}
