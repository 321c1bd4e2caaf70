//! Workflow/completion adapter: upstream `/completion-messages` and
//! `/workflows/run` calls for one bound platform.

use reqwest::Client;
use serde_json::{Map, Value};

use crate::api::{
    CompletionPayload, FileAttachment, ResponseMode, WorkflowPayload, DEFAULT_USER_ID,
};
use crate::core::error::GatewayError;
use crate::core::http;
use crate::core::platforms::{PlatformConfig, PlatformRegistry};
use crate::core::sse::{AnswerStream, SseDecoder};
use crate::core::MessageReply;

/// Output field `run_workflow` requires. This names a contract with one
/// specific deployed workflow (a title generator), not a general property
/// of workflow outputs; other workflows will fail shape validation here.
pub const WORKFLOW_TITLE_LIST_FIELD: &str = "title_list";

/// Default page size for `list_completion_messages`.
pub const DEFAULT_COMPLETION_PAGE_LIMIT: u32 = 20;

pub struct WorkflowAdapter {
    client: Client,
    platform: PlatformConfig,
    user_id: String,
}

impl WorkflowAdapter {
    pub fn new(client: Client, platform: PlatformConfig) -> Self {
        Self::with_user(client, platform, DEFAULT_USER_ID)
    }

    pub fn with_user(client: Client, platform: PlatformConfig, user_id: impl Into<String>) -> Self {
        WorkflowAdapter {
            client,
            platform,
            user_id: user_id.into(),
        }
    }

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

    /// Single-turn completion call. Same reply/failure semantics as the
    /// chat adapter's `send_chat`.
    pub async fn create_completion(
        &self,
        inputs: Map<String, Value>,
        query: &str,
        files: Vec<FileAttachment>,
        mode: ResponseMode,
    ) -> Result<MessageReply, GatewayError> {
        let payload = CompletionPayload {
            inputs,
            query: query.to_string(),
            response_mode: mode,
            user: self.user_id.clone(),
            files,
        };
        let response =
            http::post_json(&self.client, &self.platform, "completion-messages", &payload).await?;

        if mode.is_streaming() {
            let decoder = SseDecoder::new(http::into_chunk_stream(response));
            Ok(MessageReply::Stream(AnswerStream::new(decoder)))
        } else {
            Ok(MessageReply::Envelope(http::read_typed(response).await?))
        }
    }

    /// Convenience: map each URL to a remote_url attachment of
    /// `attachment_kind` and delegate to [`Self::create_completion`].
    pub async fn create_completion_with_attachments(
        &self,
        query: &str,
        attachment_urls: &[String],
        attachment_kind: &str,
        inputs: Map<String, Value>,
        mode: ResponseMode,
    ) -> Result<MessageReply, GatewayError> {
        let files = attachment_urls
            .iter()
            .map(|url| FileAttachment::remote_url(attachment_kind, url))
            .collect();
        self.create_completion(inputs, query, files, mode).await
    }

    /// Run the bound platform's workflow to completion and extract its
    /// title list. Always one blocking upstream call regardless of any
    /// caller preference; the upstream's single structured payload must
    /// carry `data.outputs.title_list` as a list of strings (see
    /// [`WORKFLOW_TITLE_LIST_FIELD`]) or the whole call fails with
    /// `UnexpectedResponseShape` rather than returning partial data.
    pub async fn run_workflow(
        &self,
        inputs: Map<String, Value>,
        files: Vec<FileAttachment>,
    ) -> Result<TitleLines, GatewayError> {
        let payload = WorkflowPayload {
            inputs,
            response_mode: ResponseMode::Blocking,
            user: self.user_id.clone(),
            files,
        };
        let response =
            http::post_json(&self.client, &self.platform, "workflows/run", &payload).await?;
        let value = http::read_json(response).await?;
        extract_title_lines(&value)
    }

    /// GET passthrough for one completion message; parsed JSON, verbatim.
    pub async fn get_completion_message(&self, message_id: &str) -> Result<Value, GatewayError> {
        let endpoint = format!("completion-messages/{message_id}");
        let query = [("user", self.user_id.clone())];
        let response = http::get(&self.client, &self.platform, &endpoint, &query).await?;
        http::read_json(response).await
    }

    /// GET passthrough for the paginated completion-message list.
    pub async fn list_completion_messages(
        &self,
        last_id: Option<&str>,
        limit: u32,
    ) -> Result<Value, GatewayError> {
        let mut query = vec![
            ("user", self.user_id.clone()),
            ("limit", limit.to_string()),
        ];
        if let Some(last_id) = last_id {
            query.push(("last_id", last_id.to_string()));
        }
        let response =
            http::get(&self.client, &self.platform, "completion-messages", &query).await?;
        http::read_json(response).await
    }
}

/// Validate the workflow-run payload shape and pull out the title list.
/// Split out of `run_workflow` so the structural contract is testable
/// without I/O.
pub fn extract_title_lines(value: &Value) -> Result<TitleLines, GatewayError> {
    let data = value
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| GatewayError::shape("missing 'data' object"))?;
    let outputs = data
        .get("outputs")
        .and_then(Value::as_object)
        .ok_or_else(|| GatewayError::shape("missing 'data.outputs' object"))?;
    let titles = outputs
        .get(WORKFLOW_TITLE_LIST_FIELD)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            GatewayError::shape(format!(
                "missing 'outputs.{WORKFLOW_TITLE_LIST_FIELD}' array"
            ))
        })?;

    let mut collected = Vec::with_capacity(titles.len());
    for title in titles {
        let text = title.as_str().ok_or_else(|| {
            GatewayError::shape(format!(
                "'{WORKFLOW_TITLE_LIST_FIELD}' contains a non-string entry"
            ))
        })?;
        collected.push(text.to_string());
    }
    Ok(TitleLines::new(collected))
}

/// Forward-only sequence of workflow titles, one line-terminated item per
/// title, in upstream list order.
#[derive(Debug)]
pub struct TitleLines {
    titles: std::vec::IntoIter<String>,
}

impl TitleLines {
    fn new(titles: Vec<String>) -> Self {
        TitleLines {
            titles: titles.into_iter(),
        }
    }
}

impl Iterator for TitleLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.titles.next().map(|title| format!("{title}\n"))
    }
}
