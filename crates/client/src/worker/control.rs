//! Control messages posted by pages, and the replies sent back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use super::notify::NowPlaying;

/// A message a page posts to the worker.
///
/// Unknown `type` values land in `Unknown` and are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    ClearCache,
    GetCacheSize,
    ShowNowPlaying(NowPlaying),
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Decode a posted value. Anything that is not a well-formed message is
    /// treated as `Unknown`.
    pub fn parse(data: &Value) -> Self {
        match ControlMessage::deserialize(data) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "malformed control message");
                ControlMessage::Unknown
            }
        }
    }
}

/// Answer sent on a message's reply channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    /// Command accepted; it has no result of its own.
    Ack,
    CacheCleared { success: bool },
    CacheSize { size: u64 },
    /// Message not understood.
    Ignored,
}

/// A posted message with its optional reply channel, consumed at most once.
#[derive(Debug)]
pub struct PendingMessage {
    pub data: Value,
    reply: Option<oneshot::Sender<Reply>>,
}

impl PendingMessage {
    /// A fire-and-forget message.
    pub fn new(data: Value) -> Self {
        Self { data, reply: None }
    }

    /// A message whose sender waits for exactly one reply.
    pub fn with_reply(data: Value) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        (Self { data, reply: Some(tx) }, rx)
    }

    /// Split into the decoded message and a responder.
    pub fn into_parts(self) -> (ControlMessage, Responder) {
        (ControlMessage::parse(&self.data), Responder(self.reply))
    }
}

/// Sends the single reply for a message, if anyone is listening.
#[derive(Debug)]
pub struct Responder(Option<oneshot::Sender<Reply>>);

impl Responder {
    pub fn send(self, reply: Reply) {
        if let Some(tx) = self.0
            && tx.send(reply).is_err()
        {
            tracing::debug!("reply channel closed before the reply was sent");
        }
    }
}
