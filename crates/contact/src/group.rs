//! Group roster: the live collection of known members of one group.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use groupwire_core::error::Result;
use groupwire_core::permission::MemberPermission;
use groupwire_core::transport::{AnonymousInfo, GroupMemberInfo};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::anonymous::AnonymousMember;
use crate::bot::{Bot, WeakBot};
use crate::normal::NormalMember;

/// One group as seen by the bot.
pub struct Group {
    id: i64,
    bot_id: i64,
    bot: WeakBot,
    members: DashMap<i64, Arc<NormalMember>>,
    /// Serialises roster refreshes.
    lane: Mutex<()>,
}

impl Group {
    pub(crate) fn new(id: i64, bot_id: i64, bot: WeakBot) -> Self {
        Self {
            id,
            bot_id,
            bot,
            members: DashMap::new(),
            lane: Mutex::new(()),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn bot(&self) -> Result<Bot> {
        self.bot.upgrade()
    }

    /// Get a member by id.
    pub fn get(&self, member_id: i64) -> Option<Arc<NormalMember>> {
        self.members.get(&member_id).map(|m| m.value().clone())
    }

    pub fn contains(&self, member_id: i64) -> bool {
        self.members.contains_key(&member_id)
    }

    /// All cached members, in no particular order.
    pub fn members(&self) -> Vec<Arc<NormalMember>> {
        self.members.iter().map(|m| m.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The bot's own roster entry.
    pub fn bot_as_member(&self) -> Option<Arc<NormalMember>> {
        self.get(self.bot_id)
    }

    /// The bot's permission here, derived from its own roster entry.
    pub fn bot_permission(&self) -> MemberPermission {
        self.bot_as_member()
            .map(|m| m.permission())
            .unwrap_or(MemberPermission::Member)
    }

    /// Record a member observation: update the cached entry if there is one,
    /// insert a new member otherwise.
    ///
    /// Fails when called from a synchronous `CardChanged` listener for the
    /// member that listener is being notified about. See
    /// [`NormalMember::apply_update`].
    pub fn observe(&self, raw: GroupMemberInfo) -> Result<Arc<NormalMember>> {
        match self.members.entry(raw.user_id) {
            Entry::Occupied(entry) => {
                let member = entry.get().clone();
                // Release the shard before listeners run.
                drop(entry);
                member.apply_update(raw)?;
                Ok(member)
            }
            Entry::Vacant(entry) => {
                let member = Arc::new(NormalMember::new(self.id, self.bot_id, self.bot.clone(), raw));
                entry.insert(member.clone());
                debug!(group_id = self.id, member_id = member.id(), "Member added to roster");
                Ok(member)
            }
        }
    }

    /// Drop a member from the roster, e.g. after it left or was kicked.
    pub fn remove_member(&self, member_id: i64) -> Option<Arc<NormalMember>> {
        let removed = self.members.remove(&member_id).map(|(_, m)| m);
        if removed.is_some() {
            info!(group_id = self.id, member_id, "Member removed from roster");
        }
        removed
    }

    /// Fetch one member from the transport and record it.
    pub async fn update_member(&self, member_id: i64) -> Result<Arc<NormalMember>> {
        let bot = self.bot()?;
        let context = format!("fetch member {member_id} of group {}", self.id);
        let raw = bot
            .transport()
            .get_group_member_info(self.id, member_id, bot.settings().refresh_no_cache)
            .await?
            .check_data(&context)?;
        self.observe(raw)
    }

    /// Re-fetch the whole roster. Existing members are updated in place,
    /// new ones inserted, and members no longer listed dropped.
    ///
    /// Only members known before the fetch started can be dropped; anyone
    /// observed while it was in flight is kept.
    pub async fn refresh_members(&self) -> Result<()> {
        let _lane = self.lane.lock().await;
        let known: HashSet<i64> = self.members.iter().map(|m| *m.key()).collect();
        let bot = self.bot()?;
        let context = format!("fetch member list of group {}", self.id);
        let list = bot
            .transport()
            .get_group_member_list(self.id)
            .await?
            .check_data(&context)?;

        let mut seen = HashSet::with_capacity(list.len());
        for raw in list {
            seen.insert(raw.user_id);
            self.observe(raw)?;
        }

        let before = self.members.len();
        self.members.retain(|id, _| seen.contains(id) || !known.contains(id));
        info!(
            group_id = self.id,
            members = self.members.len(),
            dropped = before.saturating_sub(self.members.len()),
            "Roster refreshed"
        );
        Ok(())
    }

    /// Wrap the anonymous-sender block of an incoming message. The result is
    /// not cached.
    pub fn anonymous_member(&self, info: AnonymousInfo) -> AnonymousMember {
        AnonymousMember::new(self.id, self.bot_id, self.bot.clone(), info)
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("id", &self.id)
            .field("members", &self.members.len())
            .finish()
    }
}
