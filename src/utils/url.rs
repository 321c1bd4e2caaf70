//! URL utilities for consistent endpoint construction.
//!
//! Platform base URLs come from user-edited configuration, so trailing
//! slashes are normalized away before endpoint paths are appended.

/// Normalize a base URL by removing trailing slashes.
///
/// # Examples
///
/// ```
/// use dify_gateway::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://127.0.0.1/v1"), "http://127.0.0.1/v1");
/// assert_eq!(normalize_base_url("http://127.0.0.1/v1/"), "http://127.0.0.1/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a platform base URL and an endpoint path without double slashes.
///
/// # Examples
///
/// ```
/// use dify_gateway::utils::url::join_endpoint;
///
/// assert_eq!(
///     join_endpoint("http://127.0.0.1/v1/", "chat-messages"),
///     "http://127.0.0.1/v1/chat-messages"
/// );
/// ```
pub fn join_endpoint(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}
