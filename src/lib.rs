#[macro_use]
mod macros;

pub mod client;
pub mod clock;
pub mod codec;
pub mod commands;
pub mod connection;
pub mod correlation;
pub mod datatypes;
pub mod payload;
pub mod registry;
pub mod transport;


// Re-export codec types for direct access
pub use codec::{CodecError, Command, TypedCommand};
pub use correlation::PendingReply;
pub use registry::{CommandDescriptor, Direction, Registry};

// Re-export the main client API for easy access
pub use client::{
    BinaryMessage, ClientBuilder, ClientConfig, Event, SsmiClient, SsmiError, SsmiProtocol,
    SsmiResult,
};

/// Error returned by most application-level functions.
///
/// Library code returns [`SsmiError`]. Applications that mix it with other
/// error types (logging setup, CLI parsing) can use this boxed form instead.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for applications built on this crate.
///
/// # Examples
///
/// ## Sending an SMS
///
/// ```rust,no_run
/// use ssmi::client::ClientBuilder;
///
/// #[tokio::main]
/// async fn main() -> ssmi::Result<()> {
///     let client = ClientBuilder::quick("localhost:2020", "username", "password").await?;
///
///     let seq = client.send_message("27821234567", "Hello, World!", None).await?.await?;
///     println!("Message accepted with sequence {}", seq.sequence);
///
///     client.logout().await?;
///     client.close().await?;
///     Ok(())
/// }
/// ```
///
/// ## Working with raw commands
///
/// ```rust
/// use ssmi::{Command, Direction};
///
/// let command = Command::decode("SSMI,103,27821234567,12,hi, there", Direction::Response)?;
/// assert_eq!(command.name(), "MO");
/// assert_eq!(command.get_field("message")?, "hi, there");
/// # Ok::<(), ssmi::CodecError>(())
/// ```
pub type Result<T> = std::result::Result<T, Error>;
