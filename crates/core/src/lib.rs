//! # groupwire core
//!
//! Domain types, collaborator traits, and error definitions for the groupwire
//! member adapter. This crate knows nothing about bots, groups, or rosters: it
//! defines the vocabulary that `groupwire-contact` implements against.
//!
//! ## Collaborators
//!
//! Everything the adapter talks to is a trait here:
//! - [`Transport`]: the OneBot-style request/response client
//! - [`UploadService`]: turns binary resources into remote references
//! - [`EventBroadcaster`]: delivers [`MemberEvent`]s, reports cancellation
//! - [`MessageCodec`]: converts [`MessageChain`]s to and from wire JSON

pub mod codec;
pub mod error;
pub mod event;
pub mod info;
pub mod message;
pub mod permission;
pub mod transport;
pub mod upload;

// Re-export key types at crate root for ergonomics
pub use codec::{MessageCodec, OneBotCodec};
pub use error::{Error, Result, TransportError};
pub use event::{BroadcastResult, EventBroadcaster, EventBus, EventListener, ListenerAction, MemberEvent};
pub use info::{MemberActive, MemberInfo};
pub use message::{ForwardMessage, ForwardNode, MessageChain, MessageElement, MessageReceipt};
pub use permission::MemberPermission;
pub use transport::{ActionResponse, AnonymousInfo, GroupMemberInfo, MessageIdData, Transport};
pub use upload::{ExternalResource, RemoteFile, UploadService};
