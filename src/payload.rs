// ABOUTME: Pluggable character-set transcoding for outbound text payloads
// ABOUTME: Injected into the protocol engine rather than held as a global

use crate::client::error::{SsmiError, SsmiResult};

/// Transcodes message text before it is placed on the wire.
///
/// Applied to the free-text `message` field of SMS and USSD sends. Binary
/// sends carry caller-prepared hex and bypass it.
pub trait PayloadCodec: Send + Sync {
    fn encode(&self, text: &str) -> SsmiResult<String>;
}

/// Sends text unchanged
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl PayloadCodec for Passthrough {
    fn encode(&self, text: &str) -> SsmiResult<String> {
        Ok(text.to_owned())
    }
}

/// Rejects anything outside printable ASCII.
///
/// Useful against gateways that mangle multi-byte text.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictAscii;

impl PayloadCodec for StrictAscii {
    fn encode(&self, text: &str) -> SsmiResult<String> {
        match text.chars().find(|c| !(c.is_ascii_graphic() || *c == ' ')) {
            Some(c) => Err(SsmiError::Payload(format!(
                "character {c:?} cannot be sent as ASCII"
            ))),
            None => Ok(text.to_owned()),
        }
    }
}
