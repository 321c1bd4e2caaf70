pub mod chat;
pub mod error;
pub(crate) mod http;
pub mod platforms;
pub mod sse;
pub mod workflow;

#[cfg(test)]
pub mod test_support;

use crate::api::MessageEnvelope;
use crate::core::sse::HttpAnswerStream;

/// Outcome of a chat or completion call: a parsed blocking envelope, or a
/// lazy answer-fragment stream, depending on the requested response mode.
pub enum MessageReply {
    Envelope(MessageEnvelope),
    Stream(HttpAnswerStream),
}

impl std::fmt::Debug for MessageReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageReply::Envelope(envelope) => {
                f.debug_tuple("Envelope").field(envelope).finish()
            }
            MessageReply::Stream(_) => f.debug_struct("Stream").finish_non_exhaustive(),
        }
    }
}

impl MessageReply {
    pub fn into_envelope(self) -> Option<MessageEnvelope> {
        match self {
            MessageReply::Envelope(envelope) => Some(envelope),
            MessageReply::Stream(_) => None,
        }
    }

    pub fn into_stream(self) -> Option<HttpAnswerStream> {
        match self {
            MessageReply::Envelope(_) => None,
            MessageReply::Stream(stream) => Some(stream),
        }
    }
}
