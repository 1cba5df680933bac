//! Message codec: structured chains to and from transport wire JSON.

use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::message::{ForwardMessage, MessageChain, MessageElement};

/// Converts message chains to the transport's wire representation and back.
pub trait MessageCodec: Send + Sync {
    /// Serialize a chain for a plain send.
    fn to_wire(&self, chain: &MessageChain) -> Result<Value>;

    /// Parse a wire message (segment array or plain string).
    fn from_wire(&self, value: &Value) -> Result<MessageChain>;

    /// Find an embedded forward bundle that must go through the forward action.
    fn find_forward<'a>(&self, chain: &'a MessageChain) -> Option<&'a ForwardMessage>;

    /// Serialize a forward bundle into the node list of the forward action.
    fn forward_to_wire(&self, forward: &ForwardMessage) -> Result<Value>;
}

/// OneBot v11 array-format codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneBotCodec;

impl MessageCodec for OneBotCodec {
    fn to_wire(&self, chain: &MessageChain) -> Result<Value> {
        Ok(serde_json::to_value(chain)?)
    }

    fn from_wire(&self, value: &Value) -> Result<MessageChain> {
        match value {
            Value::String(text) => Ok(MessageChain::from(text.as_str())),
            Value::Array(segments) => {
                let mut chain = MessageChain::new();
                for segment in segments {
                    match serde_json::from_value::<MessageElement>(segment.clone()) {
                        Ok(element) => chain.push(element),
                        Err(e) => {
                            let kind = segment.get("type").and_then(Value::as_str).unwrap_or("?");
                            debug!(segment_type = %kind, error = %e, "Skipping unsupported segment");
                        }
                    }
                }
                Ok(chain)
            }
            other => Err(Error::InvalidArgument(format!(
                "wire message must be a string or a segment array, got {other}"
            ))),
        }
    }

    fn find_forward<'a>(&self, chain: &'a MessageChain) -> Option<&'a ForwardMessage> {
        chain.iter().find_map(|element| match element {
            MessageElement::Forward(forward) if !forward.nodes.is_empty() => Some(forward),
            _ => None,
        })
    }

    fn forward_to_wire(&self, forward: &ForwardMessage) -> Result<Value> {
        let nodes = forward
            .nodes
            .iter()
            .map(|node| -> Result<Value> {
                let content = self.to_wire(&node.content)?;
                let mut data = json!({
                    "user_id": node.user_id.to_string(),
                    "nickname": node.nickname,
                    "content": content,
                });
                if node.time > 0 {
                    data["time"] = json!(node.time);
                }
                Ok(json!({ "type": "node", "data": data }))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ForwardNode;

    fn forward_chain() -> MessageChain {
        MessageChain::from(MessageElement::Forward(ForwardMessage {
            id: None,
            nodes: vec![ForwardNode {
                user_id: 10,
                nickname: "alice".into(),
                content: MessageChain::from("first"),
                time: 0,
            }],
        }))
    }

    #[test]
    fn plain_chain_serializes_to_segment_array() {
        let chain = MessageChain::from("hi").with(MessageElement::at(5));
        let wire = OneBotCodec.to_wire(&chain).unwrap();
        assert_eq!(
            wire,
            json!([
                {"type": "text", "data": {"text": "hi"}},
                {"type": "at", "data": {"qq": "5"}}
            ])
        );
    }

    #[test]
    fn from_wire_skips_unknown_segments() {
        let wire = json!([
            {"type": "text", "data": {"text": "a"}},
            {"type": "mface", "data": {"emoji_id": "x"}},
            {"type": "face", "data": {"id": "14"}}
        ]);
        let chain = OneBotCodec.from_wire(&wire).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.to_string(), "a[face:14]");
    }

    #[test]
    fn from_wire_accepts_plain_string() {
        let chain = OneBotCodec.from_wire(&json!("hello")).unwrap();
        assert_eq!(chain.plain_text(), "hello");
    }

    #[test]
    fn from_wire_rejects_numbers() {
        assert!(OneBotCodec.from_wire(&json!(3)).is_err());
    }

    #[test]
    fn find_forward_detects_bundle_with_nodes() {
        let chain = forward_chain();
        assert!(OneBotCodec.find_forward(&chain).is_some());
        assert!(OneBotCodec.find_forward(&MessageChain::from("plain")).is_none());
    }

    #[test]
    fn find_forward_ignores_id_only_references() {
        let chain = MessageChain::from(MessageElement::Forward(ForwardMessage {
            id: Some("res-1".into()),
            nodes: vec![],
        }));
        assert!(OneBotCodec.find_forward(&chain).is_none());
    }

    #[test]
    fn forward_nodes_serialize_as_node_segments() {
        let chain = forward_chain();
        let forward = OneBotCodec.find_forward(&chain).unwrap();
        let wire = OneBotCodec.forward_to_wire(forward).unwrap();
        assert_eq!(wire[0]["type"], "node");
        assert_eq!(wire[0]["data"]["user_id"], "10");
        assert_eq!(wire[0]["data"]["content"][0]["data"]["text"], "first");
        assert!(wire[0]["data"].get("time").is_none());
    }
}
