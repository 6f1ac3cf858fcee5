// ABOUTME: Client factory and configuration for opening ready-to-use SSMI sessions
// ABOUTME: Connects, optionally authenticates and starts link checks in a single call

use crate::client::error::{SsmiError, SsmiResult};
use crate::client::link_check::LinkCheckConfig;
use crate::client::session::SsmiClient;
use crate::payload::{Passthrough, PayloadCodec};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::info;

/// Session configuration consumed by [`ClientBuilder`]
#[derive(Clone)]
pub struct ClientConfig {
    pub link_check: LinkCheckConfig,

    /// Username and password; without them the session stays unauthenticated
    pub credentials: Option<(String, String)>,

    /// Transcoder for outbound text (default: pass-through)
    pub payload_codec: Arc<dyn PayloadCodec>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            link_check: LinkCheckConfig::default(),
            credentials: None,
            payload_codec: Arc::new(Passthrough),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("link_check", &self.link_check)
            .field("username", &self.credentials.as_ref().map(|(user, _)| user))
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn with_link_check(mut self, link_check: LinkCheckConfig) -> Self {
        self.link_check = link_check;
        self
    }

    pub fn with_payload_codec(mut self, codec: Arc<dyn PayloadCodec>) -> Self {
        self.payload_codec = codec;
        self
    }
}

/// Factory for SSMI sessions
///
/// With credentials configured the returned client is already
/// authenticated, and the link-check timer runs unless disabled.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Connect over TCP
    pub async fn connect<A: ToSocketAddrs>(self, addr: A) -> SsmiResult<SsmiClient> {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(true)?;
        self.establish(socket).await
    }

    /// Run the session over an existing stream
    pub async fn establish<S>(self, stream: S) -> SsmiResult<SsmiClient>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let client = SsmiClient::new(stream, &self.config);

        if let Some((username, password)) = &self.config.credentials {
            let outcome = client.authenticate(username, password).await?;
            if !outcome.authenticated {
                let reason = format!("{:?}", outcome.reply);
                // The rejection is what the caller needs; a close error adds nothing
                let _ = client.close().await;
                return Err(SsmiError::AuthenticationRejected(reason));
            }
            info!("Session authenticated as {}", username);
        }

        if self.config.link_check.enabled {
            client.start_link_check().await?;
        }

        Ok(client)
    }
}

/// Convenience functions for quick client creation
impl ClientBuilder {
    /// Connect and authenticate with default settings
    pub async fn quick<A: ToSocketAddrs>(
        addr: A,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SsmiResult<SsmiClient> {
        let config = ClientConfig::new().with_credentials(username, password);
        Self::new(config).connect(addr).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{LineReader, LineWriter};
    use tokio::io::duplex;

    #[test]
    fn test_config_debug_hides_password() {
        let config = ClientConfig::new().with_credentials("user", "hunter2");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_establish_authenticates() {
        let (client_side, server_side) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(server_side);

        let server = tokio::spawn(async move {
            let mut reader = LineReader::new(read_half);
            let mut writer = LineWriter::new(write_half);
            assert_eq!(reader.read_line().await.unwrap().unwrap(), "SSMI,1,user,secret");
            writer.write_line("SSMI,101,1").await.unwrap();
            (reader, writer)
        });

        let config = ClientConfig::new().with_credentials("user", "secret");
        let client = ClientBuilder::new(config)
            .establish(client_side)
            .await
            .unwrap();

        assert!(client.is_authenticated().await.unwrap());
        assert!(client.link_check_status().await.unwrap().running);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_establish_rejected() {
        let (client_side, server_side) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(server_side);

        let server = tokio::spawn(async move {
            let mut reader = LineReader::new(read_half);
            let mut writer = LineWriter::new(write_half);
            reader.read_line().await.unwrap();
            writer.write_line("SSMI,102,3").await.unwrap();
            (reader, writer)
        });

        let config = ClientConfig::new()
            .with_credentials("user", "bad")
            .with_link_check(LinkCheckConfig::disabled());
        let result = ClientBuilder::new(config).establish(client_side).await;
        assert!(matches!(result, Err(SsmiError::AuthenticationRejected(_))));
        server.await.unwrap();
    }
}
