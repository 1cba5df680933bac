//! Anonymous senders.

use groupwire_core::error::{Error, Result};
use groupwire_core::info::{MemberActive, MemberInfo};
use groupwire_core::message::{MessageChain, MessageElement, MessageReceipt};
use groupwire_core::permission::MemberPermission;
use groupwire_core::transport::AnonymousInfo;
use groupwire_core::upload::ExternalResource;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

use crate::bot::{Bot, WeakBot};
use crate::commands::check_permission_higher_than;
use crate::group::Group;

/// An anonymous participant, built from the anonymous block of one incoming
/// message. Never stored in the roster.
#[derive(Clone)]
pub struct AnonymousMember {
    id: i64,
    group_id: i64,
    bot_id: i64,
    bot: WeakBot,
    info: AnonymousInfo,
}

impl AnonymousMember {
    pub(crate) fn new(group_id: i64, bot_id: i64, bot: WeakBot, info: AnonymousInfo) -> Self {
        let id = if info.id != 0 {
            info.id
        } else {
            synthetic_id(&info.flag)
        };
        Self {
            id,
            group_id,
            bot_id,
            bot,
            info,
        }
    }

    /// The transport id, or one derived from the flag when the transport sent 0.
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn bot_id(&self) -> i64 {
        self.bot_id
    }

    pub fn bot(&self) -> Result<Bot> {
        self.bot.upgrade()
    }

    pub fn group(&self) -> Result<Arc<Group>> {
        self.bot()?.group(self.group_id).ok_or_else(|| {
            Error::InvalidArgument(format!("group {} is not known to the bot", self.group_id))
        })
    }

    /// The opaque token identifying this anonymous session.
    pub fn flag(&self) -> &str {
        &self.info.flag
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn permission(&self) -> MemberPermission {
        MemberPermission::Member
    }

    pub fn info(&self) -> MemberInfo {
        MemberInfo {
            uin: self.id,
            nick: self.info.name.clone(),
            name_card: self.info.name.clone(),
            ..MemberInfo::default()
        }
    }

    /// Always empty: the transport reports no activity for anonymous senders.
    pub fn active(&self) -> MemberActive {
        MemberActive::default()
    }

    /// Mute this anonymous session, then reload the roster.
    pub async fn mute(&self, duration_seconds: i32) -> Result<()> {
        let group = self.group()?;
        check_permission_higher_than(&group, self.id, self.permission(), "mute")?;

        let bot = self.bot()?;
        let context = format!("mute anonymous member {} of group {}", self.id, group.id());
        bot.transport()
            .set_group_anonymous_ban(group.id(), &self.info.flag, duration_seconds)
            .await?
            .check(&context)?;

        info!(
            group_id = group.id(),
            anonymous = %self.info.name,
            duration_seconds,
            "Anonymous member muted"
        );
        group.refresh_members().await
    }

    /// Anonymous senders cannot be reached by a temporary session.
    pub async fn send_message(&self, _message: impl Into<MessageChain>) -> Result<MessageReceipt> {
        Err(Error::UnsupportedOperation(format!(
            "cannot send a temp message to anonymous member {}",
            self.info.name
        )))
    }

    pub async fn nudge(&self) -> Result<()> {
        Err(Error::UnsupportedOperation(format!(
            "cannot nudge anonymous member {}",
            self.info.name
        )))
    }

    pub async fn upload_image(&self, resource: &ExternalResource) -> Result<MessageElement> {
        crate::send::upload_image(&self.bot()?, resource).await
    }

    pub async fn upload_short_video(
        &self,
        _thumbnail: &ExternalResource,
        _video: &ExternalResource,
    ) -> Result<MessageElement> {
        Err(Error::UnsupportedOperation(
            "cannot upload short video to an anonymous member".into(),
        ))
    }
}

/// Positive id derived from the flag: first 8 bytes of its SHA-256 digest.
fn synthetic_id(flag: &str) -> i64 {
    let digest = Sha256::digest(flag.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes) & i64::MAX
}

impl std::fmt::Display for AnonymousMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AnonymousMember({}, {})", self.info.name, self.info.flag)
    }
}

impl std::fmt::Debug for AnonymousMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnonymousMember")
            .field("id", &self.id)
            .field("group_id", &self.group_id)
            .field("name", &self.info.name)
            .finish()
    }
}
