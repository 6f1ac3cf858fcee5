// ABOUTME: Outbound transport seam for the protocol engine
// ABOUTME: Writes are fire-and-forget; framing and socket I/O happen elsewhere

use crate::client::error::{SsmiError, SsmiResult};
use tokio::sync::mpsc;

/// Destination for encoded wire lines.
///
/// Implementations must not block: the state machine calls `write_line`
/// from its own dispatch loop. The line is unterminated; appending the
/// carriage return is the framing layer's job.
pub trait Transport {
    fn write_line(&mut self, line: &str) -> SsmiResult<()>;
}

/// In-memory recorder, handy for tests and dry runs
impl Transport for Vec<String> {
    fn write_line(&mut self, line: &str) -> SsmiResult<()> {
        self.push(line.to_owned());
        Ok(())
    }
}

/// Hands lines to a writer task
impl Transport for mpsc::UnboundedSender<String> {
    fn write_line(&mut self, line: &str) -> SsmiResult<()> {
        self.send(line.to_owned())
            .map_err(|_| SsmiError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_transport_reports_closed_writer() {
        let (mut sender, receiver) = mpsc::unbounded_channel::<String>();
        sender.write_line("SSMI,3").unwrap();
        drop(receiver);
        assert!(matches!(
            sender.write_line("SSMI,3"),
            Err(SsmiError::ConnectionClosed)
        ));
    }
}
