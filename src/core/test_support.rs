//! Test helpers: a one-shot local listener that serves a canned HTTP
//! response, so adapter round-trips can run without a real upstream.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::core::platforms::PlatformConfig;

/// Serve `response` verbatim to the first connection, then close it.
/// Returns the base URL to point an adapter at.
pub async fn serve_once(response: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_full_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

/// Read headers plus any Content-Length body so the client is never cut off
/// mid-write.
async fn read_full_request(socket: &mut TcpStream) {
    let mut seen: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        if let Some(header_end) = find(&seen, b"\r\n\r\n") {
            let body_len = content_length(&seen[..header_end]);
            if seen.len() >= header_end + 4 + body_len {
                return;
            }
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => seen.extend_from_slice(&buf[..n]),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn content_length(headers: &[u8]) -> usize {
    let text = String::from_utf8_lossy(headers);
    text.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

pub fn json_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{body}"
    )
}

pub fn sse_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{body}"
    )
}

pub fn platform_at(base_url: &str) -> PlatformConfig {
    PlatformConfig {
        id: "test".to_string(),
        api_key: "app-test-key".to_string(),
        base_url: base_url.to_string(),
        description: "test platform".to_string(),
        schema: None,
    }
}
