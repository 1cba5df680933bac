//! Scripted collaborators shared by the unit tests.

use async_trait::async_trait;
use chrono::Utc;
use groupwire_config::AdapterConfig;
use groupwire_core::error::TransportError;
use groupwire_core::event::{EventBus, EventListener, ListenerAction, MemberEvent};
use groupwire_core::transport::{ActionResponse, GroupMemberInfo, MessageIdData, Transport};
use groupwire_core::upload::{ExternalResource, RemoteFile, UploadService};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::bot::Bot;
use crate::group::Group;
use crate::normal::NormalMember;

pub const GROUP: i64 = 100;
pub const BOT: i64 = 1;
pub const TARGET: i64 = 2;

pub fn member_raw(group_id: i64, user_id: i64, role: &str, card: &str) -> GroupMemberInfo {
    GroupMemberInfo {
        group_id,
        user_id,
        nickname: format!("user{user_id}"),
        card: card.into(),
        role: role.into(),
        join_time: 1_600_000_000,
        ..GroupMemberInfo::default()
    }
}

#[derive(Default)]
struct RemoteState {
    members: BTreeMap<(i64, i64), GroupMemberInfo>,
    calls: Vec<String>,
    failing: HashSet<&'static str>,
    queued: HashSet<&'static str>,
    sent: Vec<Value>,
    next_message_id: i64,
    list_gate: Option<Arc<Notify>>,
}

/// In-memory stand-in for the remote side. Records every call as
/// `"action arg arg..."` and applies successful mutations to its own roster.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<RemoteState>,
}

impl MockTransport {
    pub fn new() -> Self {
        let transport = Self::default();
        transport.lock().next_message_id = 1000;
        transport
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap()
    }

    pub fn set_member(&self, raw: GroupMemberInfo) {
        self.lock().members.insert((raw.group_id, raw.user_id), raw);
    }

    pub fn remove_remote_member(&self, group_id: i64, user_id: i64) {
        self.lock().members.remove(&(group_id, user_id));
    }

    /// Make every later call of `action` answer with a failed envelope.
    pub fn fail(&self, action: &'static str) {
        self.lock().failing.insert(action);
    }

    /// Make every later call of `action` answer like a OneBot server that
    /// queued the request: `status: "async"`, `retcode: 1`.
    pub fn queue(&self, action: &'static str) {
        self.lock().queued.insert(action);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn count(&self, action: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.split(' ').next() == Some(action))
            .count()
    }

    /// Make `get_group_member_list` wait for the returned gate after it has
    /// read the remote roster, so tests can act while a fetch is in flight.
    pub fn hold_member_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().list_gate = Some(gate.clone());
        gate
    }

    /// Wire payloads handed to the send actions.
    pub fn sent(&self) -> Vec<Value> {
        self.lock().sent.clone()
    }

    /// Record the call; `Some(state)` when the action should go through.
    fn record(&self, action: &'static str, call: String) -> Option<std::sync::MutexGuard<'_, RemoteState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.failing.contains(action) {
            None
        } else {
            Some(state)
        }
    }

    fn update<F>(&self, action: &'static str, call: String, key: (i64, i64), f: F) -> ActionResponse<()>
    where
        F: FnOnce(&mut BTreeMap<(i64, i64), GroupMemberInfo>, (i64, i64)),
    {
        match self.record(action, call) {
            Some(mut state) => {
                f(&mut state.members, key);
                if state.queued.contains(action) {
                    ActionResponse {
                        status: "async".into(),
                        retcode: 1,
                        data: None,
                        message: None,
                        wording: None,
                    }
                } else {
                    ActionResponse::ok(())
                }
            }
            None => rejected(),
        }
    }

    fn send(&self, action: &'static str, call: String, payload: Value) -> ActionResponse<MessageIdData> {
        match self.record(action, call) {
            Some(mut state) => {
                state.sent.push(payload);
                let id = state.next_message_id;
                state.next_message_id += 1;
                ActionResponse::ok(MessageIdData::single(id))
            }
            None => rejected(),
        }
    }
}

fn rejected<T>() -> ActionResponse<T> {
    ActionResponse::failed(100, "scripted failure")
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_group_member_info(
        &self,
        group_id: i64,
        user_id: i64,
        _no_cache: bool,
    ) -> Result<ActionResponse<GroupMemberInfo>, TransportError> {
        let call = format!("get_group_member_info {group_id} {user_id}");
        Ok(match self.record("get_group_member_info", call) {
            Some(state) => match state.members.get(&(group_id, user_id)) {
                Some(raw) => ActionResponse::ok(raw.clone()),
                None => ActionResponse::failed(100, "member not found"),
            },
            None => rejected(),
        })
    }

    async fn get_group_member_list(
        &self,
        group_id: i64,
    ) -> Result<ActionResponse<Vec<GroupMemberInfo>>, TransportError> {
        let call = format!("get_group_member_list {group_id}");
        let (response, gate) = match self.record("get_group_member_list", call) {
            Some(state) => {
                let list = state
                    .members
                    .values()
                    .filter(|m| m.group_id == group_id)
                    .cloned()
                    .collect();
                (ActionResponse::ok(list), state.list_gate.clone())
            }
            None => (rejected(), None),
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(response)
    }

    async fn set_group_card(
        &self,
        group_id: i64,
        user_id: i64,
        card: &str,
    ) -> Result<ActionResponse<()>, TransportError> {
        let call = format!("set_group_card {group_id} {user_id} {card}");
        Ok(self.update("set_group_card", call, (group_id, user_id), |members, key| {
            if let Some(m) = members.get_mut(&key) {
                m.card = card.to_string();
            }
        }))
    }

    async fn set_group_special_title(
        &self,
        group_id: i64,
        user_id: i64,
        title: &str,
        duration: i64,
    ) -> Result<ActionResponse<()>, TransportError> {
        let call = format!("set_group_special_title {group_id} {user_id} {title} {duration}");
        Ok(self.update("set_group_special_title", call, (group_id, user_id), |members, key| {
            if let Some(m) = members.get_mut(&key) {
                m.title = title.to_string();
            }
        }))
    }

    async fn set_group_admin(
        &self,
        group_id: i64,
        user_id: i64,
        enable: bool,
    ) -> Result<ActionResponse<()>, TransportError> {
        let call = format!("set_group_admin {group_id} {user_id} {enable}");
        Ok(self.update("set_group_admin", call, (group_id, user_id), |members, key| {
            if let Some(m) = members.get_mut(&key) {
                m.role = if enable { "admin" } else { "member" }.to_string();
            }
        }))
    }

    async fn set_group_ban(
        &self,
        group_id: i64,
        user_id: i64,
        duration: i32,
    ) -> Result<ActionResponse<()>, TransportError> {
        let call = format!("set_group_ban {group_id} {user_id} {duration}");
        Ok(self.update("set_group_ban", call, (group_id, user_id), |members, key| {
            if let Some(m) = members.get_mut(&key) {
                m.shut_up_timestamp = if duration > 0 {
                    Utc::now().timestamp() + i64::from(duration)
                } else {
                    0
                };
            }
        }))
    }

    async fn set_group_anonymous_ban(
        &self,
        group_id: i64,
        flag: &str,
        duration: i32,
    ) -> Result<ActionResponse<()>, TransportError> {
        let call = format!("set_group_anonymous_ban {group_id} {flag} {duration}");
        Ok(self.update("set_group_anonymous_ban", call, (group_id, 0), |_, _| {}))
    }

    async fn set_group_kick(
        &self,
        group_id: i64,
        user_id: i64,
        reject_add_request: bool,
    ) -> Result<ActionResponse<()>, TransportError> {
        let call = format!("set_group_kick {group_id} {user_id} {reject_add_request}");
        Ok(self.update("set_group_kick", call, (group_id, user_id), |members, key| {
            members.remove(&key);
        }))
    }

    async fn group_poke(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> Result<ActionResponse<()>, TransportError> {
        let call = format!("group_poke {group_id} {user_id}");
        Ok(self.update("group_poke", call, (group_id, user_id), |_, _| {}))
    }

    async fn send_private_msg(
        &self,
        user_id: i64,
        message: Value,
        auto_escape: bool,
    ) -> Result<ActionResponse<MessageIdData>, TransportError> {
        let call = format!("send_private_msg {user_id} {auto_escape}");
        Ok(self.send("send_private_msg", call, message))
    }

    async fn send_private_forward_msg(
        &self,
        user_id: i64,
        messages: Value,
    ) -> Result<ActionResponse<MessageIdData>, TransportError> {
        let call = format!("send_private_forward_msg {user_id}");
        Ok(self.send("send_private_forward_msg", call, messages))
    }
}

/// Records every event; can be told to veto pre-send events.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<MemberEvent>>,
    cancel_sends: AtomicBool,
}

impl RecordingListener {
    pub fn cancel_sends(&self, cancel: bool) {
        self.cancel_sends.store(cancel, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<MemberEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn card_changes(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MemberEvent::CardChanged { old, new, .. } => Some((old, new)),
                _ => None,
            })
            .collect()
    }

    pub fn post_sends(&self) -> Vec<MemberEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, MemberEvent::TempMessagePostSend { .. }))
            .collect()
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &MemberEvent) -> ListenerAction {
        self.events.lock().unwrap().push(event.clone());
        if event.is_cancellable() && self.cancel_sends.load(Ordering::SeqCst) {
            ListenerAction::Cancel
        } else {
            ListenerAction::Continue
        }
    }
}

/// Hands out `upload://<file name>` references.
#[derive(Default)]
pub struct MockUploader {
    calls: AtomicUsize,
}

impl MockUploader {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadService for MockUploader {
    async fn upload(&self, resource: &ExternalResource) -> Result<RemoteFile, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let name = resource
            .file_name
            .clone()
            .unwrap_or_else(|| format!("resource-{n}"));
        Ok(RemoteFile {
            file: format!("upload://{name}"),
            url: None,
        })
    }
}

pub struct Fixture {
    pub bot: Bot,
    pub transport: Arc<MockTransport>,
    pub listener: Arc<RecordingListener>,
    pub bus: Arc<EventBus>,
    pub uploader: Arc<MockUploader>,
    pub group: Arc<Group>,
    pub target: Arc<NormalMember>,
}

/// A bot in group [`GROUP`] with the bot (card `"bot"`) and [`TARGET`]
/// (card `"target"`) on both the local roster and the remote side.
pub fn fixture(bot_role: &str, target_role: &str) -> Fixture {
    build_fixture(bot_role, target_role, AdapterConfig::default(), true)
}

pub fn fixture_without_uploader(bot_role: &str, target_role: &str) -> Fixture {
    build_fixture(bot_role, target_role, AdapterConfig::default(), false)
}

pub fn build_fixture(
    bot_role: &str,
    target_role: &str,
    config: AdapterConfig,
    with_uploader: bool,
) -> Fixture {
    let transport = Arc::new(MockTransport::new());
    let bot_raw = member_raw(GROUP, BOT, bot_role, "bot");
    let target_raw = member_raw(GROUP, TARGET, target_role, "target");
    transport.set_member(bot_raw.clone());
    transport.set_member(target_raw.clone());

    let listener = Arc::new(RecordingListener::default());
    let bus = Arc::new(EventBus::new(config.events.capacity));
    bus.register(listener.clone());
    let uploader = Arc::new(MockUploader::default());

    let mut builder = Bot::builder(BOT, transport.clone())
        .events(bus.clone())
        .config(config);
    if with_uploader {
        builder = builder.uploader(uploader.clone());
    }
    let bot = builder.build();

    let group = bot.add_group(GROUP);
    group.observe(bot_raw).unwrap();
    let target = group.observe(target_raw).unwrap();

    Fixture {
        bot,
        transport,
        listener,
        bus,
        uploader,
        group,
        target,
    }
}

/// Yield until `cond` holds, for detached tasks to catch up.
pub async fn settle(mut cond: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
