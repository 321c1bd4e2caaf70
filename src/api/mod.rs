//! Wire payloads exchanged with Dify-style upstream services.
//!
//! Request bodies serialize exactly into the shapes the upstream expects;
//! response types keep every field the upstream sent, flattening unknown
//! keys into `extra` maps so nothing is silently dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User identifier used when the caller does not supply one.
pub const DEFAULT_USER_ID: &str = "abc-123";

/// The only attachment transfer method the upstream accepts from this crate.
pub const TRANSFER_METHOD_REMOTE_URL: &str = "remote_url";

/// Upstream response delivery mode for chat and completion calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Blocking,
    Streaming,
}

impl ResponseMode {
    pub fn is_streaming(self) -> bool {
        matches!(self, ResponseMode::Streaming)
    }
}

/// One attachment entry in a request's `files` list.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FileAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub transfer_method: String,
    pub url: String,
}

impl FileAttachment {
    /// Attachment referenced by URL, e.g. `FileAttachment::remote_url("image", url)`.
    pub fn remote_url(kind: impl Into<String>, url: impl Into<String>) -> Self {
        FileAttachment {
            kind: kind.into(),
            transfer_method: TRANSFER_METHOD_REMOTE_URL.to_string(),
            url: url.into(),
        }
    }
}

/// Body for `POST /chat-messages`.
#[derive(Serialize, Debug)]
pub struct ChatPayload {
    pub inputs: Map<String, Value>,
    pub query: String,
    pub response_mode: ResponseMode,
    pub conversation_id: String,
    pub user: String,
    pub files: Vec<FileAttachment>,
}

/// Body for `POST /completion-messages`.
#[derive(Serialize, Debug)]
pub struct CompletionPayload {
    pub inputs: Map<String, Value>,
    pub query: String,
    pub response_mode: ResponseMode,
    pub user: String,
    pub files: Vec<FileAttachment>,
}

/// Body for `POST /workflows/run`. Workflow runs are always issued blocking;
/// the upstream returns one structured payload, never an event stream.
#[derive(Serialize, Debug)]
pub struct WorkflowPayload {
    pub inputs: Map<String, Value>,
    pub response_mode: ResponseMode,
    pub user: String,
    pub files: Vec<FileAttachment>,
}

/// Blocking response envelope shared by chat and completion calls.
///
/// `conversation_id` is guaranteed present (empty string when the upstream
/// omitted it); everything beyond the known fields survives in `extra`.
#[derive(Deserialize, Clone, Debug)]
pub struct MessageEnvelope {
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub answer: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of conversation history from `GET /messages`.
#[derive(Deserialize, Debug)]
pub struct HistoryPage {
    #[serde(default)]
    pub data: Vec<HistoryMessage>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub limit: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One message record in a history page. Nested sub-records (files, agent
/// thoughts, retriever resources) are kept as raw JSON; call sites project
/// the subset they need.
#[derive(Deserialize, Debug)]
pub struct HistoryMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub message_files: Vec<Value>,
    #[serde(default)]
    pub agent_thoughts: Vec<Value>,
    #[serde(default)]
    pub feedback: Option<Value>,
    #[serde(default)]
    pub retriever_resources: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ResponseMode::Blocking).unwrap(),
            json!("blocking")
        );
        assert_eq!(
            serde_json::to_value(ResponseMode::Streaming).unwrap(),
            json!("streaming")
        );
    }

    #[test]
    fn chat_payload_matches_upstream_shape() {
        let payload = ChatPayload {
            inputs: Map::new(),
            query: "hello".to_string(),
            response_mode: ResponseMode::Streaming,
            conversation_id: String::new(),
            user: DEFAULT_USER_ID.to_string(),
            files: vec![FileAttachment::remote_url("image", "https://x/cat.png")],
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "inputs": {},
                "query": "hello",
                "response_mode": "streaming",
                "conversation_id": "",
                "user": "abc-123",
                "files": [{
                    "type": "image",
                    "transfer_method": "remote_url",
                    "url": "https://x/cat.png"
                }]
            })
        );
    }

    #[test]
    fn envelope_defaults_missing_conversation_id() {
        let envelope: MessageEnvelope = serde_json::from_value(json!({"answer": "hi"})).unwrap();
        assert_eq!(envelope.conversation_id, "");
        assert_eq!(envelope.answer, "hi");
    }

    #[test]
    fn envelope_keeps_passthrough_fields() {
        let envelope: MessageEnvelope = serde_json::from_value(json!({
            "answer": "hi",
            "conversation_id": "c1",
            "message_id": "m9",
            "metadata": {"usage": {"total_tokens": 12}}
        }))
        .unwrap();
        assert_eq!(envelope.conversation_id, "c1");
        assert_eq!(envelope.extra["message_id"], json!("m9"));
        assert_eq!(envelope.extra["metadata"]["usage"]["total_tokens"], json!(12));
    }

    #[test]
    fn history_page_preserves_unknown_message_fields() {
        let page: HistoryPage = serde_json::from_value(json!({
            "data": [{
                "id": "m1",
                "conversation_id": "c1",
                "query": "q",
                "answer": "a",
                "created_at": 1700000000,
                "agent_thoughts": [{"thought": "step 1"}],
                "status": "normal"
            }],
            "has_more": true,
            "limit": 20
        }))
        .unwrap();

        assert!(page.has_more);
        assert_eq!(page.limit, 20);
        let msg = &page.data[0];
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.agent_thoughts.len(), 1);
        assert_eq!(msg.extra["status"], json!("normal"));
    }
}
