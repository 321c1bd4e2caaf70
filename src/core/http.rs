//! Shared request plumbing for the adapters: bearer auth, status mapping,
//! body parsing. Every upstream call funnels through here.

use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::error::GatewayError;
use crate::core::platforms::PlatformConfig;
use crate::core::sse::HttpChunkStream;
use crate::utils::url::join_endpoint;

pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    platform: &PlatformConfig,
    endpoint: &str,
    body: &T,
) -> Result<Response, GatewayError> {
    let url = join_endpoint(&platform.base_url, endpoint);
    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", platform.api_key))
        .json(body)
        .send()
        .await
        .map_err(GatewayError::Transport)?;
    check_status(response).await
}

pub(crate) async fn get(
    client: &Client,
    platform: &PlatformConfig,
    endpoint: &str,
    query: &[(&str, String)],
) -> Result<Response, GatewayError> {
    let url = join_endpoint(&platform.base_url, endpoint);
    let response = client
        .get(url)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", platform.api_key))
        .query(query)
        .send()
        .await
        .map_err(GatewayError::Transport)?;
    check_status(response).await
}

/// Map any non-success status to `Upstream`, capturing the error body
/// best-effort. Error bodies are documents, not streams, so reading them
/// eagerly here keeps blocking and streaming calls identical on failure.
async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Upstream {
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn read_json(response: Response) -> Result<Value, GatewayError> {
    read_typed(response).await
}

pub(crate) async fn read_typed<T: DeserializeOwned>(
    response: Response,
) -> Result<T, GatewayError> {
    let text = response.text().await.map_err(GatewayError::Transport)?;
    serde_json::from_str(&text).map_err(GatewayError::MalformedResponse)
}

pub(crate) fn into_chunk_stream(response: Response) -> HttpChunkStream {
    Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec())),
    )
}
