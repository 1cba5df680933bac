//! Message chain and receipt domain types.
//!
//! A [`MessageChain`] is an ordered list of [`MessageElement`]s. Elements
//! serialize to OneBot segments (`{"type": ..., "data": {...}}`) directly, so
//! the chain's serde form is already the wire array for plain messages.

use serde::{Deserialize, Serialize};

/// One segment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MessageElement {
    Text {
        text: String,
    },
    At {
        #[serde(rename = "qq")]
        target: String,
    },
    Face {
        id: String,
    },
    Image {
        file: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Video {
        file: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Reply {
        id: String,
    },
    /// A forwarded-message bundle. Outbound bundles carry their nodes; inbound
    /// references usually only carry the remote id.
    Forward(ForwardMessage),
}

impl MessageElement {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn at(target: i64) -> Self {
        Self::At {
            target: target.to_string(),
        }
    }
}

impl std::fmt::Display for MessageElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text { text } => f.write_str(text),
            Self::At { target } => write!(f, "[at:{target}]"),
            Self::Face { id } => write!(f, "[face:{id}]"),
            Self::Image { file, .. } => write!(f, "[image:{file}]"),
            Self::Video { file, .. } => write!(f, "[video:{file}]"),
            Self::Reply { id } => write!(f, "[reply:{id}]"),
            Self::Forward(forward) => write!(f, "[forward:{} nodes]", forward.nodes.len()),
        }
    }
}

/// A bundle of forwarded messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<ForwardNode>,
}

/// A single entry of a forwarded bundle, attributed to its original sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardNode {
    pub user_id: i64,
    pub nickname: String,
    pub content: MessageChain,
    /// Unix seconds; 0 lets the remote side pick.
    #[serde(default)]
    pub time: i64,
}

/// An ordered list of message elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageChain(pub Vec<MessageElement>);

impl MessageChain {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, element: MessageElement) {
        self.0.push(element);
    }

    /// Builder-style append.
    pub fn with(mut self, element: MessageElement) -> Self {
        self.0.push(element);
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MessageElement> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenated text of all `Text` elements.
    pub fn plain_text(&self) -> String {
        self.0
            .iter()
            .filter_map(|e| match e {
                MessageElement::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl std::fmt::Display for MessageChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for element in &self.0 {
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

impl From<&str> for MessageChain {
    fn from(text: &str) -> Self {
        Self(vec![MessageElement::text(text)])
    }
}

impl From<String> for MessageChain {
    fn from(text: String) -> Self {
        Self(vec![MessageElement::Text { text }])
    }
}

impl From<MessageElement> for MessageChain {
    fn from(element: MessageElement) -> Self {
        Self(vec![element])
    }
}

impl FromIterator<MessageElement> for MessageChain {
    fn from_iter<I: IntoIterator<Item = MessageElement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MessageChain {
    type Item = &'a MessageElement;
    type IntoIter = std::slice::Iter<'a, MessageElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Confirmation of a successful temporary-message dispatch to a group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// Message ids as returned by the transport.
    pub ids: Vec<i64>,

    /// Ids used to reference the message in later transport calls. OneBot uses
    /// the same values for both.
    pub internal_ids: Vec<i64>,

    /// The chain that was sent.
    pub source: MessageChain,

    /// The bot's own id.
    pub sender_id: i64,

    pub group_id: i64,

    pub target_id: i64,

    /// Dispatch time, unix seconds.
    pub time: i64,
}

impl MessageReceipt {
    /// A reply element quoting the first segment of the sent message.
    pub fn quote(&self) -> Option<MessageElement> {
        self.ids.first().map(|id| MessageElement::Reply { id: id.to_string() })
    }
}
