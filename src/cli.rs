//! Command-line front-end: argument parsing and an interactive chat loop.
//!
//! This is deliberately a thin consumer of the adapter API; everything
//! upstream-shaped lives in [`crate::core`].

use std::error::Error;
use std::io::Write as _;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::api::ResponseMode;
use crate::core::chat::ChatAdapter;
use crate::core::platforms::PlatformRegistry;
use crate::core::MessageReply;

#[derive(Parser)]
#[command(name = "dify-gateway")]
#[command(about = "Interactive chat front-end for configured Dify-style platforms")]
#[command(
    long_about = "Chat interactively with one of the upstream platforms configured in the \
platform table (platforms.toml). Streaming answers are printed as they arrive and the \
conversation id is carried across turns.\n\n\
Commands inside the chat loop:\n\
  <message>              Send a chat turn\n\
  image <url> <message>  Send a chat turn with a remote image attachment\n\
  quit                   Exit"
)]
pub struct Args {
    /// Platform id to chat with (defaults to default_platform from the platform table)
    #[arg(short, long)]
    pub platform: Option<String>,

    /// Upstream user identifier
    #[arg(short, long)]
    pub user: Option<String>,

    /// Path to the platform table (defaults to the per-user config directory)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// List configured platforms and exit
    #[arg(short = 'l', long)]
    pub list_platforms: bool,
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let registry = match &args.config {
        Some(path) => PlatformRegistry::load_from_path(path)?,
        None => PlatformRegistry::load()?,
    };

    if args.list_platforms {
        for (id, description) in registry.list_available() {
            println!("{id}\t{description}");
        }
        return Ok(());
    }

    let platform_id = args
        .platform
        .or_else(|| registry.default_platform().map(str::to_string))
        .ok_or(
            "no platform selected; pass --platform or set default_platform in the platform table",
        )?;

    let adapter = {
        let platform = registry.resolve(&platform_id)?.clone();
        let client = reqwest::Client::new();
        match args.user {
            Some(user) => ChatAdapter::with_user(client, platform, user),
            None => ChatAdapter::new(client, platform),
        }
    };

    println!(
        "Chatting with '{platform_id}'. Type a message, 'image <url> <message>' for an \
attachment turn, or 'quit' to exit."
    );

    let mut conversation_id: Option<String> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }

        let reply = if let Some((url, message)) = parse_image_command(line) {
            adapter
                .send_chat_with_attachment(
                    message,
                    url,
                    "image",
                    conversation_id.as_deref(),
                    ResponseMode::Streaming,
                )
                .await
        } else {
            adapter
                .send_chat(line, conversation_id.as_deref(), ResponseMode::Streaming)
                .await
        };

        match reply {
            Ok(MessageReply::Stream(mut stream)) => {
                print!("ai: ");
                std::io::stdout().flush()?;
                while let Some(fragment) = stream.next().await {
                    print!("{fragment}");
                    std::io::stdout().flush()?;
                }
                println!();
                if let Some(id) = stream.conversation_id() {
                    conversation_id = Some(id.to_string());
                }
            }
            Ok(MessageReply::Envelope(envelope)) => {
                println!("ai: {}", envelope.answer);
                if !envelope.conversation_id.is_empty() {
                    conversation_id = Some(envelope.conversation_id);
                }
            }
            Err(err) => eprintln!("request failed: {err}"),
        }
    }

    Ok(())
}

/// `image <url> <message>` → (url, message). A missing message falls back
/// to a generic prompt.
fn parse_image_command(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("image ")?.trim();
    if rest.is_empty() {
        return None;
    }
    match rest.split_once(' ') {
        Some((url, message)) => Some((url, message.trim())),
        None => Some((rest, "What is in this image?")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_command_splits_url_and_message() {
        assert_eq!(
            parse_image_command("image https://x/cat.png what is this?"),
            Some(("https://x/cat.png", "what is this?"))
        );
        assert_eq!(
            parse_image_command("image https://x/cat.png"),
            Some(("https://x/cat.png", "What is in this image?"))
        );
        assert_eq!(parse_image_command("image "), None);
        assert_eq!(parse_image_command("hello there"), None);
    }
}
