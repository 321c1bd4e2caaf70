//! Chat adapter: translates logical chat requests into upstream
//! `/chat-messages` and `/messages` calls for one bound platform.

use reqwest::Client;
use serde_json::Map;

use crate::api::{
    ChatPayload, FileAttachment, HistoryPage, ResponseMode, DEFAULT_USER_ID,
};
use crate::core::error::GatewayError;
use crate::core::http;
use crate::core::platforms::{PlatformConfig, PlatformRegistry};
use crate::core::sse::{AnswerStream, SseDecoder};
use crate::core::MessageReply;

/// One adapter instance per (platform, user) binding. Holds no mutable
/// state; concurrent calls on the same instance are independent.
pub struct ChatAdapter {
    client: Client,
    platform: PlatformConfig,
    user_id: String,
}

impl ChatAdapter {
    pub fn new(client: Client, platform: PlatformConfig) -> Self {
        Self::with_user(client, platform, DEFAULT_USER_ID)
    }

    pub fn with_user(client: Client, platform: PlatformConfig, user_id: impl Into<String>) -> Self {
        ChatAdapter {
            client,
            platform,
            user_id: user_id.into(),
        }
    }

    /// Resolve `platform_id` against the registry and bind an adapter to it.
    /// Fails with `UnknownPlatform` before any network I/O.
    pub fn for_platform(
        client: Client,
        registry: &PlatformRegistry,
        platform_id: &str,
    ) -> Result<Self, GatewayError> {
        let platform = registry.resolve(platform_id)?.clone();
        Ok(Self::new(client, platform))
    }

    pub fn platform(&self) -> &PlatformConfig {
        &self.platform
    }

    /// Send one chat turn. An absent `conversation_id` starts a new
    /// conversation. Blocking mode returns the parsed envelope; streaming
    /// mode returns the lazy answer-fragment stream.
    pub async fn send_chat(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        mode: ResponseMode,
    ) -> Result<MessageReply, GatewayError> {
        self.send(message, conversation_id, mode, Vec::new()).await
    }

    /// Chat turn with a single URL-referenced attachment. Mode is a caller
    /// choice, symmetric with [`Self::send_chat`]; the historical call path
    /// always streamed, which is now only the CLI's default.
    pub async fn send_chat_with_attachment(
        &self,
        message: &str,
        attachment_url: &str,
        attachment_kind: &str,
        conversation_id: Option<&str>,
        mode: ResponseMode,
    ) -> Result<MessageReply, GatewayError> {
        let files = vec![FileAttachment::remote_url(attachment_kind, attachment_url)];
        self.send(message, conversation_id, mode, files).await
    }

    async fn send(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        mode: ResponseMode,
        files: Vec<FileAttachment>,
    ) -> Result<MessageReply, GatewayError> {
        let payload = self.chat_payload(message, conversation_id, mode, files);
        let response =
            http::post_json(&self.client, &self.platform, "chat-messages", &payload).await?;

        if mode.is_streaming() {
            let decoder = SseDecoder::new(http::into_chunk_stream(response));
            Ok(MessageReply::Stream(AnswerStream::new(decoder)))
        } else {
            Ok(MessageReply::Envelope(http::read_typed(response).await?))
        }
    }

    fn chat_payload(
        &self,
        message: &str,
        conversation_id: Option<&str>,
        mode: ResponseMode,
        files: Vec<FileAttachment>,
    ) -> ChatPayload {
        ChatPayload {
            inputs: Map::new(),
            query: message.to_string(),
            response_mode: mode,
            conversation_id: conversation_id.unwrap_or_default().to_string(),
            user: self.user_id.clone(),
            files,
        }
    }

    /// Fetch one page of conversation history. Every field the upstream
    /// returns per message is preserved; call sites project what they need.
    pub async fn fetch_history(
        &self,
        conversation_id: &str,
        first_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<HistoryPage, GatewayError> {
        let mut query = vec![
            ("conversation_id", conversation_id.to_string()),
            ("user", self.user_id.clone()),
        ];
        if let Some(first_id) = first_id {
            query.push(("first_id", first_id.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let response = http::get(&self.client, &self.platform, "messages", &query).await?;
        http::read_typed(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{json_response, platform_at, serve_once, sse_response};
    use serde_json::json;

    fn adapter_at(base_url: &str) -> ChatAdapter {
        ChatAdapter::new(Client::new(), platform_at(base_url))
    }

    #[test]
    fn payload_defaults_empty_conversation_and_inputs() {
        let adapter = adapter_at("http://127.0.0.1/v1");
        let payload = adapter.chat_payload("hi", None, ResponseMode::Blocking, Vec::new());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "inputs": {},
                "query": "hi",
                "response_mode": "blocking",
                "conversation_id": "",
                "user": "abc-123",
                "files": []
            })
        );
    }

    #[tokio::test]
    async fn blocking_chat_returns_envelope() {
        let base = serve_once(json_response(
            "200 OK",
            r#"{"answer":"hi","conversation_id":"c1","message_id":"m1"}"#,
        ))
        .await;
        let reply = adapter_at(&base)
            .send_chat("hello", None, ResponseMode::Blocking)
            .await
            .unwrap();

        let envelope = reply.into_envelope().unwrap();
        assert_eq!(envelope.answer, "hi");
        assert_eq!(envelope.conversation_id, "c1");
        assert_eq!(envelope.extra["message_id"], json!("m1"));
    }

    #[tokio::test]
    async fn blocking_chat_defaults_missing_conversation_id() {
        let base = serve_once(json_response("200 OK", r#"{"answer":"hi"}"#)).await;
        let reply = adapter_at(&base)
            .send_chat("hello", None, ResponseMode::Blocking)
            .await
            .unwrap();
        assert_eq!(reply.into_envelope().unwrap().conversation_id, "");
    }

    #[tokio::test]
    async fn streaming_chat_yields_fragments() {
        let base = serve_once(sse_response(concat!(
            "data: {\"answer\":\"Hel\",\"conversation_id\":\"c2\"}\n\n",
            "data: {bogus\n\n",
            "data: {\"answer\":\"lo\"}\n\n",
        )))
        .await;
        let reply = adapter_at(&base)
            .send_chat("hello", None, ResponseMode::Streaming)
            .await
            .unwrap();

        let mut stream = reply.into_stream().unwrap();
        assert_eq!(stream.next().await.as_deref(), Some("Hel"));
        assert_eq!(stream.next().await.as_deref(), Some("lo"));
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.conversation_id(), Some("c2"));
    }

    #[tokio::test]
    async fn upstream_error_is_captured_in_both_modes() {
        for mode in [ResponseMode::Blocking, ResponseMode::Streaming] {
            let base = serve_once(json_response(
                "500 Internal Server Error",
                r#"{"message":"boom"}"#,
            ))
            .await;
            let err = adapter_at(&base)
                .send_chat("hello", None, mode)
                .await
                .unwrap_err();
            match err {
                GatewayError::Upstream { status, body } => {
                    assert_eq!(status, 500);
                    assert!(body.contains("boom"));
                }
                other => panic!("expected Upstream, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn malformed_blocking_body_is_reported() {
        let base = serve_once(json_response("200 OK", "not json at all")).await;
        let err = adapter_at(&base)
            .send_chat("hello", None, ResponseMode::Blocking)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = adapter_at(&format!("http://{addr}"))
            .send_chat("hello", None, ResponseMode::Blocking)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[test]
    fn attachment_turn_sends_single_remote_url_file() {
        let adapter = adapter_at("http://127.0.0.1/v1");
        let payload = adapter.chat_payload(
            "what is this?",
            Some("c3"),
            ResponseMode::Streaming,
            vec![FileAttachment::remote_url("image", "https://x/cat.png")],
        );
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["conversation_id"], json!("c3"));
        assert_eq!(value["files"].as_array().unwrap().len(), 1);
        assert_eq!(value["files"][0]["transfer_method"], json!("remote_url"));
    }

    #[tokio::test]
    async fn fetch_history_parses_page() {
        let base = serve_once(json_response(
            "200 OK",
            r#"{"data":[{"id":"m1","conversation_id":"c1","query":"q","answer":"a","agent_thoughts":[{"thought":"t"}]}],"has_more":false,"limit":20}"#,
        ))
        .await;
        let page = adapter_at(&base)
            .fetch_history("c1", None, Some(20))
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].agent_thoughts.len(), 1);
        assert!(!page.has_more);
    }
}
