//! Registered group members backed by a cached snapshot.

use chrono::Utc;
use groupwire_core::error::{Error, Result};
use groupwire_core::event::MemberEvent;
use groupwire_core::info::{MemberActive, MemberInfo};
use groupwire_core::permission::MemberPermission;
use groupwire_core::transport::GroupMemberInfo;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::bot::{Bot, WeakBot};
use crate::group::Group;
use crate::snapshot::MemberSnapshot;

/// A registered member of a group.
///
/// Identity and state are read from the cached snapshot. Privileged commands
/// live in [`crate::commands`], messaging in [`crate::send`].
pub struct NormalMember {
    id: i64,
    group_id: i64,
    bot_id: i64,
    pub(crate) bot: WeakBot,
    snapshot: MemberSnapshot,
    /// FIFO lane: operations on this member run one at a time, in call order.
    pub(crate) lane: Mutex<()>,
}

impl NormalMember {
    pub(crate) fn new(group_id: i64, bot_id: i64, bot: WeakBot, raw: GroupMemberInfo) -> Self {
        Self {
            id: raw.user_id,
            group_id,
            bot_id,
            bot,
            snapshot: MemberSnapshot::new(raw),
            lane: Mutex::new(()),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn bot(&self) -> Result<Bot> {
        self.bot.upgrade()
    }

    /// The owning group, looked up by id in the bot arena.
    pub fn group(&self) -> Result<Arc<Group>> {
        self.bot()?.group(self.group_id).ok_or_else(|| {
            Error::InvalidArgument(format!("group {} is not known to the bot", self.group_id))
        })
    }

    /// Whether this member is the bot itself.
    pub fn is_bot(&self) -> bool {
        self.id == self.bot_id
    }

    /// The cached raw record.
    pub fn raw(&self) -> Arc<GroupMemberInfo> {
        self.snapshot.load()
    }

    pub fn nick(&self) -> String {
        self.snapshot.load().nickname.clone()
    }

    pub fn name_card(&self) -> String {
        self.snapshot.load().card.clone()
    }

    pub fn special_title(&self) -> String {
        self.snapshot.load().title.clone()
    }

    pub fn permission(&self) -> MemberPermission {
        MemberPermission::from_role_tag(&self.snapshot.load().role)
    }

    pub fn join_timestamp(&self) -> i64 {
        self.snapshot.load().join_time
    }

    pub fn last_speak_timestamp(&self) -> i64 {
        self.snapshot.load().last_sent_time
    }

    /// Seconds left on the current mute; 0 when not muted.
    pub fn mute_time_remaining(&self) -> i64 {
        self.snapshot
            .load()
            .shut_up_timestamp
            .saturating_sub(Utc::now().timestamp())
            .max(0)
    }

    pub fn is_muted(&self) -> bool {
        self.mute_time_remaining() > 0
    }

    /// The bot's friend remark for this member; empty if not a friend.
    pub fn remark(&self) -> String {
        self.bot()
            .map(|bot| bot.friend_remark(self.id))
            .unwrap_or_default()
    }

    /// Card if set, nickname otherwise.
    pub fn display_name(&self) -> String {
        let raw = self.snapshot.load();
        if raw.card.is_empty() {
            raw.nickname.clone()
        } else {
            raw.card.clone()
        }
    }

    pub fn info(&self) -> MemberInfo {
        MemberInfo::from_raw(&self.snapshot.load(), self.remark())
    }

    /// Level and title expiry from the cached record.
    pub fn active(&self) -> MemberActive {
        MemberActive::from_raw(&self.snapshot.load())
    }

    /// Replace the cached record, raising `CardChanged` first when the card
    /// differs from the previous record.
    ///
    /// Synchronous listeners may read this member while `CardChanged` is
    /// raised and see the previous record. Updating the same member from such
    /// a listener (directly or through [`Group::observe`]) fails with
    /// [`Error::InvalidArgument`]; async subscribers are not affected.
    pub fn apply_update(&self, raw: GroupMemberInfo) -> Result<()> {
        if raw.user_id != self.id {
            return Err(Error::InvalidArgument(format!(
                "record for user {} cannot update member {}",
                raw.user_id, self.id
            )));
        }

        let events = self.bot().ok().map(|bot| bot.events().clone());
        let changed = self.snapshot.apply_update(raw, |previous, incoming| {
            if let Some(events) = &events {
                events.broadcast(MemberEvent::CardChanged {
                    group_id: self.group_id,
                    member_id: self.id,
                    old: previous.card.clone(),
                    new: incoming.card.clone(),
                });
            }
        })?;
        debug!(
            group_id = self.group_id,
            member_id = self.id,
            card_changed = changed,
            "Member snapshot updated"
        );
        Ok(())
    }

    pub(crate) fn modify_raw<F>(&self, f: F)
    where
        F: FnOnce(&mut GroupMemberInfo),
    {
        self.snapshot.modify(f);
    }

    /// Fetch the latest record from the transport and apply it.
    pub async fn refresh(&self) -> Result<()> {
        let _lane = self.lane.lock().await;
        self.refresh_locked().await
    }

    /// Refresh for callers already holding the lane.
    pub(crate) async fn refresh_locked(&self) -> Result<()> {
        let bot = self.bot()?;
        let context = format!("fetch member {} of group {}", self.id, self.group_id);
        let raw = bot
            .transport()
            .get_group_member_info(self.group_id, self.id, bot.settings().refresh_no_cache)
            .await?
            .check_data(&context)?;
        self.apply_update(raw)
    }

    /// Change the group card.
    ///
    /// Renaming the bot itself is always allowed; anyone else needs the bot to
    /// be at least an administrator. The transport call is detached and the
    /// cache is left alone: the new card only shows up after a later refresh.
    pub fn set_name_card(&self, card: impl Into<String>) -> Result<()> {
        let card = card.into();
        if !self.is_bot() {
            let group = self.group()?;
            let bot_permission = group.bot_permission();
            if !bot_permission.is_operator() {
                return Err(Error::permission_denied(
                    "change name card",
                    format!(
                        "renaming member {} of group {} needs an administrator, but the bot is {bot_permission}",
                        self.id, self.group_id
                    ),
                ));
            }
        }

        let bot = self.bot()?;
        let transport = bot.transport().clone();
        let (group_id, member_id) = (self.group_id, self.id);
        spawn_detached(async move {
            let context = format!("set card of member {member_id} in group {group_id}");
            let result = match transport.set_group_card(group_id, member_id, &card).await {
                Ok(response) => response.check(&context).map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(group_id, member_id, error = %e, "Detached card change failed");
            }
        })
    }

    /// Change the special title. Same detached dispatch as
    /// [`set_name_card`](Self::set_name_card), without a permission check.
    pub fn set_special_title(&self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        let bot = self.bot()?;
        let transport = bot.transport().clone();
        let duration = bot.settings().special_title_duration;
        let (group_id, member_id) = (self.group_id, self.id);
        spawn_detached(async move {
            let context = format!("set special title of member {member_id} in group {group_id}");
            let result = match transport
                .set_group_special_title(group_id, member_id, &title, duration)
                .await
            {
                Ok(response) => response.check(&context).map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(group_id, member_id, error = %e, "Detached special title change failed");
            }
        })
    }
}

/// Spawn a fire-and-forget task on the current runtime.
fn spawn_detached<F>(task: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|_| Error::Internal("no tokio runtime to dispatch on".into()))?;
    handle.spawn(task);
    Ok(())
}

impl std::fmt::Display for NormalMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NormalMember({})", self.id)
    }
}

impl std::fmt::Debug for NormalMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalMember")
            .field("id", &self.id)
            .field("group_id", &self.group_id)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}
