//! The bot arena: root of the group/member object graph.

use dashmap::DashMap;
use groupwire_config::{AdapterConfig, MemberSettings};
use groupwire_core::codec::{MessageCodec, OneBotCodec};
use groupwire_core::error::{Error, Result};
use groupwire_core::event::{EventBroadcaster, EventBus};
use groupwire_core::transport::Transport;
use groupwire_core::upload::UploadService;
use std::sync::{Arc, Weak};
use tracing::info;

use crate::group::Group;

pub(crate) struct BotInner {
    id: i64,
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventBroadcaster>,
    codec: Arc<dyn MessageCodec>,
    uploader: Option<Arc<dyn UploadService>>,
    settings: MemberSettings,
    groups: DashMap<i64, Arc<Group>>,
    friend_remarks: DashMap<i64, String>,
}

/// Handle to one logged-in bot account and everything it has cached.
///
/// Cloning is cheap; all clones share the same arena.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

/// Non-owning handle held by groups and members.
#[derive(Clone)]
pub struct WeakBot(Weak<BotInner>);

impl WeakBot {
    /// Upgrade to a live handle, failing once the bot has been dropped.
    pub fn upgrade(&self) -> Result<Bot> {
        self.0
            .upgrade()
            .map(|inner| Bot { inner })
            .ok_or_else(|| Error::Internal("bot has been dropped".into()))
    }
}

impl std::fmt::Debug for WeakBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WeakBot")
    }
}

impl Bot {
    pub fn builder(id: i64, transport: Arc<dyn Transport>) -> BotBuilder {
        BotBuilder {
            id,
            transport,
            events: None,
            codec: None,
            uploader: None,
            config: AdapterConfig::default(),
        }
    }

    pub fn id(&self) -> i64 {
        self.inner.id
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn events(&self) -> &Arc<dyn EventBroadcaster> {
        &self.inner.events
    }

    pub fn codec(&self) -> &Arc<dyn MessageCodec> {
        &self.inner.codec
    }

    pub fn uploader(&self) -> Option<&Arc<dyn UploadService>> {
        self.inner.uploader.as_ref()
    }

    pub fn settings(&self) -> &MemberSettings {
        &self.inner.settings
    }

    pub fn downgrade(&self) -> WeakBot {
        WeakBot(Arc::downgrade(&self.inner))
    }

    /// Get a group by id.
    pub fn group(&self, group_id: i64) -> Option<Arc<Group>> {
        self.inner.groups.get(&group_id).map(|g| g.value().clone())
    }

    /// Get a group, creating an empty one the first time it is seen.
    pub fn add_group(&self, group_id: i64) -> Arc<Group> {
        self.inner
            .groups
            .entry(group_id)
            .or_insert_with(|| {
                info!(group_id, bot_id = self.id(), "Registered group");
                Arc::new(Group::new(group_id, self.id(), self.downgrade()))
            })
            .value()
            .clone()
    }

    /// Forget a group, e.g. after the bot left it.
    pub fn remove_group(&self, group_id: i64) -> Option<Arc<Group>> {
        self.inner.groups.remove(&group_id).map(|(_, g)| g)
    }

    /// List all known group ids.
    pub fn group_ids(&self) -> Vec<i64> {
        self.inner.groups.iter().map(|g| *g.key()).collect()
    }

    pub fn set_friend_remark(&self, user_id: i64, remark: impl Into<String>) {
        self.inner.friend_remarks.insert(user_id, remark.into());
    }

    pub fn remove_friend(&self, user_id: i64) {
        self.inner.friend_remarks.remove(&user_id);
    }

    /// The remark the bot gave this user as a friend; empty if not a friend.
    pub fn friend_remark(&self, user_id: i64) -> String {
        self.inner
            .friend_remarks
            .get(&user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("id", &self.inner.id)
            .field("groups", &self.inner.groups.len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

/// Builder for [`Bot`]. Unset collaborators fall back to an [`EventBus`]
/// sized from the config and the [`OneBotCodec`].
pub struct BotBuilder {
    id: i64,
    transport: Arc<dyn Transport>,
    events: Option<Arc<dyn EventBroadcaster>>,
    codec: Option<Arc<dyn MessageCodec>>,
    uploader: Option<Arc<dyn UploadService>>,
    config: AdapterConfig,
}

impl BotBuilder {
    pub fn events(mut self, events: Arc<dyn EventBroadcaster>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn uploader(mut self, uploader: Arc<dyn UploadService>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Bot {
        let capacity = self.config.events.capacity;
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(EventBus::new(capacity)) as Arc<dyn EventBroadcaster>);
        Bot {
            inner: Arc::new(BotInner {
                id: self.id,
                transport: self.transport,
                events,
                codec: self
                    .codec
                    .unwrap_or_else(|| Arc::new(OneBotCodec) as Arc<dyn MessageCodec>),
                uploader: self.uploader,
                settings: self.config.members,
                groups: DashMap::new(),
                friend_remarks: DashMap::new(),
            }),
        }
    }
}
